//! Persisted learning: a small Q-value store carried across games.
//!
//! The book maps positions to previously searched (move, depth, score)
//! records. During the search it acts as a second-chance cache behind the
//! transposition table; between games, the moves actually played are folded
//! backward through a discounted update and appended to the file.
//!
//! The file is a flat little-endian stream of fixed-width records. Readers
//! stop at the first partial record (a crash mid-write costs at most the
//! tail); writers build a temp file and rename it into place, so the book
//! on disk is always one of the two complete versions.
//!
//! With learning off (the default) this module is never consulted and the
//! search behaves identically to a build without it.

use crate::evaluate::Score;
use crate::zobrist::ZHash;
use bytemuck::Pod;
use bytemuck::Zeroable;
use chess::moves::Move;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

/// Discount and blend factors of the backward fold.
const ALPHA: f64 = 0.5;
const GAMMA: f64 = 0.99;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LearningMode {
    #[default]
    Off,

    /// Use and update the book
    Standard,

    /// Also learn from the engine's own games
    SelfPlay,
}

impl LearningMode {
    pub fn is_on(self) -> bool {
        self != Self::Off
    }
}

impl FromStr for LearningMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Off" => Ok(Self::Off),
            "Standard" => Ok(Self::Standard),
            "Self" => Ok(Self::SelfPlay),
            _ => Err(format!("Unknown learning mode: {s}")),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// On-disk format
//
////////////////////////////////////////////////////////////////////////////////

/// One record as it sits in the file: 14 bytes, alignment-free so a record
/// slice can be cast straight out of the raw file bytes.
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
struct RawRecord {
    key: [u8; 8],
    score: [u8; 2],
    mv: [u8; 2],
    depth: u8,
    performance: u8,
}

const RECORD_SIZE: usize = std::mem::size_of::<RawRecord>();

impl RawRecord {
    fn pack(key: ZHash, entry: &LearningEntry) -> Self {
        Self {
            key: key.0.to_le_bytes(),
            score: (entry.score.clamp(i16::MIN as i32, i16::MAX as i32) as i16).to_le_bytes(),
            mv: entry.mv.raw().to_le_bytes(),
            depth: entry.depth,
            performance: entry.performance,
        }
    }

    fn unpack(&self) -> (ZHash, LearningEntry) {
        let entry = LearningEntry {
            mv: Move::from_raw(u16::from_le_bytes(self.mv)),
            depth: self.depth,
            score: i16::from_le_bytes(self.score) as Score,
            performance: self.performance,
        };

        (ZHash(u64::from_le_bytes(self.key)), entry)
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// The book
//
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LearningEntry {
    pub mv: Move,
    pub depth: u8,
    pub score: Score,
    pub performance: u8,
}

#[derive(Debug)]
pub struct LearningBook {
    mode: LearningMode,
    read_only: bool,
    path: PathBuf,
    entries: HashMap<u64, Vec<LearningEntry>>,

    /// The moves of the current game, oldest first
    trajectory: Vec<(ZHash, LearningEntry)>,
}

impl LearningBook {
    /// Open (or start) a book at `path`. A missing or truncated file is not
    /// an error; whatever complete records exist are used.
    pub fn open(path: impl Into<PathBuf>, mode: LearningMode, read_only: bool) -> Self {
        let path = path.into();
        let mut book = Self {
            mode,
            read_only,
            path,
            entries: HashMap::new(),
            trajectory: Vec::new(),
        };

        if book.mode.is_on() {
            if let Ok(bytes) = std::fs::read(&book.path) {
                book.load(&bytes);
            }
        }

        book
    }

    fn load(&mut self, bytes: &[u8]) {
        let whole_records = bytes.len() / RECORD_SIZE * RECORD_SIZE;
        let records: &[RawRecord] = bytemuck::cast_slice(&bytes[..whole_records]);

        for record in records {
            let (key, entry) = record.unpack();
            self.entries.entry(key.0).or_default().push(entry);
        }
    }

    pub fn mode(&self) -> LearningMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The deepest stored record for a position, if any.
    pub fn probe(&self, hash: ZHash) -> Option<&LearningEntry> {
        if !self.mode.is_on() {
            return None;
        }

        self.entries
            .get(&hash.0)?
            .iter()
            .max_by_key(|entry| entry.depth)
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Per-game trajectory
    //
    ////////////////////////////////////////////////////////////////////////////

    /// Append the move chosen at the root of a finished search.
    pub fn record(&mut self, hash: ZHash, mv: Move, depth: i32, score: Score) {
        if !self.mode.is_on() || mv == Move::NULL {
            return;
        }

        self.trajectory.push((
            hash,
            LearningEntry {
                mv,
                depth: depth.clamp(0, u8::MAX as i32) as u8,
                score,
                performance: 50,
            },
        ));
    }

    /// Fold the game's trajectory backward and absorb it into the book:
    /// each position's value is blended with the (discounted) value of the
    /// position that followed it.
    pub fn finish_game(&mut self) {
        if self.trajectory.is_empty() {
            return;
        }

        let mut next_q = self.trajectory.last().map(|(_, e)| e.score as f64).unwrap_or(0.0);

        for (_, entry) in self.trajectory.iter_mut().rev() {
            let q = entry.score as f64;
            let folded = (1.0 - ALPHA) * q + ALPHA * GAMMA * next_q;

            entry.score = folded as Score;
            // The sign flips every ply: my good position is their bad one.
            next_q = -folded;
        }

        let trajectory = std::mem::take(&mut self.trajectory);

        for (hash, entry) in trajectory {
            let entries = self.entries.entry(hash.0).or_default();

            // One record per (position, move); deeper knowledge wins
            match entries.iter_mut().find(|existing| existing.mv == entry.mv) {
                Some(existing) if existing.depth <= entry.depth => *existing = entry,
                Some(_) => {}
                None => entries.push(entry),
            }
        }

        self.persist();
    }

    /// Write the book out atomically: temp file first, then rename over.
    pub fn persist(&self) {
        if !self.mode.is_on() || self.read_only {
            return;
        }

        let mut bytes = Vec::with_capacity(self.len() * RECORD_SIZE);

        for (&key, entries) in &self.entries {
            for entry in entries {
                let raw = RawRecord::pack(ZHash(key), entry);
                bytes.extend_from_slice(bytemuck::bytes_of(&raw));
            }
        }

        let tmp = self.path.with_extension("tmp");

        if std::fs::write(&tmp, &bytes).is_ok() {
            let _ = std::fs::rename(&tmp, &self.path);
        }
    }
}

/// The conventional book location next to the engine binary.
pub fn default_book_path() -> PathBuf {
    Path::new("mallorn.lrn").to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::moves::MoveKind;
    use chess::square::Square::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mallorn-test-{name}-{}.lrn", std::process::id()))
    }

    #[test]
    fn roundtrips_through_the_file() {
        let path = temp_path("roundtrip");
        let mv = Move::new(E2, E4, MoveKind::DoublePush);

        let mut book = LearningBook::open(&path, LearningMode::Standard, false);
        book.record(ZHash(42), mv, 12, 80);
        book.finish_game();

        let reloaded = LearningBook::open(&path, LearningMode::Standard, false);
        let entry = reloaded.probe(ZHash(42)).expect("record was persisted");

        assert_eq!(entry.mv, mv);
        assert_eq!(entry.depth, 12);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncated_tails_are_tolerated() {
        let path = temp_path("truncated");
        let mv = Move::new(G1, F3, MoveKind::Quiet);

        let mut book = LearningBook::open(&path, LearningMode::Standard, false);
        book.record(ZHash(1), mv, 8, 20);
        book.record(ZHash(2), mv, 8, 20);
        book.finish_game();

        // Chop the file mid-record
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 5);
        std::fs::write(&path, &bytes).unwrap();

        let reloaded = LearningBook::open(&path, LearningMode::Standard, false);
        assert_eq!(reloaded.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn read_only_books_never_touch_disk() {
        let path = temp_path("readonly");

        let mut book = LearningBook::open(&path, LearningMode::Standard, true);
        book.record(ZHash(7), Move::new(D2, D4, MoveKind::DoublePush), 10, 50);
        book.finish_game();

        assert!(!path.exists());
    }

    #[test]
    fn disabled_books_probe_nothing() {
        let mut book = LearningBook::open(temp_path("off"), LearningMode::Off, false);
        book.record(ZHash(9), Move::new(E2, E4, MoveKind::DoublePush), 10, 50);

        assert!(book.probe(ZHash(9)).is_none());
        assert!(book.is_empty());
    }

    #[test]
    fn backward_fold_discounts_towards_the_end() {
        let path = temp_path("fold");
        let mv = Move::new(E2, E4, MoveKind::DoublePush);

        let mut book = LearningBook::open(&path, LearningMode::SelfPlay, true);
        book.record(ZHash(1), mv, 10, 0);
        book.record(ZHash(2), mv, 10, 0);
        book.record(ZHash(3), mv, 10, 900);
        book.finish_game();

        // The winning final score propagates back with alternating signs
        let last = book.probe(ZHash(3)).unwrap().score;
        let middle = book.probe(ZHash(2)).unwrap().score;
        let first = book.probe(ZHash(1)).unwrap().score;

        assert!(last > 0);
        assert!(middle < 0, "the side that allowed the win sees a negative value");
        assert!(first > 0);

        let _ = std::fs::remove_file(&path);
    }
}
