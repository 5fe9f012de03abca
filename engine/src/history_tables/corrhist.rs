//! Correction history: a statistical patch on top of the static eval.
//!
//! When search results keep disagreeing with the static eval in positions
//! sharing some structural feature, that systematic error is worth
//! remembering. Several parallel flavors track different features: the pawn
//! structure, the minor-piece configuration, each side's non-pawn material,
//! the bare material signature, and the move that led here. All flavors use
//! the same running-average update; their contributions are summed (with
//! weights) into one eval delta.

use super::history::boxed_zeroed;
use super::history::Correction;
use super::history::PieceTo;
use crate::evaluate::Score;
use crate::zobrist::ZHash;
use chess::piece::Color;

const SIZE: usize = 16_384;

/// One hash-indexed array of corrections per side to move.
#[derive(Debug)]
struct CorrectionTable {
    entries: [[Correction; SIZE]; Color::COUNT],
}

impl CorrectionTable {
    fn get(&self, side: Color, hash: ZHash) -> Correction {
        self.entries[side][hash.0 as usize % SIZE]
    }

    fn get_mut(&mut self, side: Color, hash: ZHash) -> &mut Correction {
        &mut self.entries[side][hash.0 as usize % SIZE]
    }
}

#[derive(Debug)]
pub struct CorrHistTable {
    pawn: CorrectionTable,
    minor: CorrectionTable,
    nonpawn: [CorrectionTable; Color::COUNT],
    material: CorrectionTable,

    /// Keyed by the previous move rather than a hash
    continuation: [[[Correction; 64]; 12]; Color::COUNT],
}

/// Everything the correction history needs to identify a position's
/// structural features.
#[derive(Debug, Copy, Clone)]
pub struct CorrHistKeys {
    pub side: Color,
    pub pawn: ZHash,
    pub minor: ZHash,
    pub nonpawn: [ZHash; 2],
    pub material: ZHash,
    pub prev_move: Option<PieceTo>,
}

impl CorrHistTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is nothing but i32s; all-zeroes is valid.
        unsafe { boxed_zeroed() }
    }

    /// The summed correction, in centipawns, to add to the static eval.
    pub fn correction(&self, keys: &CorrHistKeys) -> Score {
        let side = keys.side;

        let mut correction = self.pawn.get(side, keys.pawn).delta() * 2;
        correction += self.minor.get(side, keys.minor).delta();
        correction += self.material.get(side, keys.material).delta();

        correction += (self.nonpawn[Color::White].get(side, keys.nonpawn[Color::White]).delta()
            + self.nonpawn[Color::Black].get(side, keys.nonpawn[Color::Black]).delta())
            / 2;

        if let Some(prev) = keys.prev_move {
            correction += self.continuation[side][prev.piece as usize][prev.tgt as usize].delta();
        }

        // However unanimous the flavors, never drag the eval by more than
        // about a pawn.
        correction.clamp(-100, 100)
    }

    /// Record the (search result, static eval) discrepancy in every flavor.
    pub fn update(&mut self, keys: &CorrHistKeys, best_score: Score, eval: Score, depth: i32) {
        let side = keys.side;

        self.pawn.get_mut(side, keys.pawn).update(best_score, eval, depth);
        self.minor.get_mut(side, keys.minor).update(best_score, eval, depth);
        self.material.get_mut(side, keys.material).update(best_score, eval, depth);

        for color in [Color::White, Color::Black] {
            self.nonpawn[color]
                .get_mut(side, keys.nonpawn[color])
                .update(best_score, eval, depth);
        }

        if let Some(prev) = keys.prev_move {
            self.continuation[side][prev.piece as usize][prev.tgt as usize]
                .update(best_score, eval, depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use chess::board::Board;

    fn keys_for(pos: &Position) -> CorrHistKeys {
        CorrHistKeys {
            side: pos.board.current,
            pawn: pos.pawn_hash,
            minor: pos.minor_hash,
            nonpawn: pos.nonpawn_hashes,
            material: pos.material_hash,
            prev_move: None,
        }
    }

    #[test]
    fn corrections_accumulate_and_clamp() {
        let mut corrhist = CorrHistTable::boxed();
        let pos = Position::new(Board::default());
        let keys = keys_for(&pos);

        assert_eq!(corrhist.correction(&keys), 0);

        for _ in 0..100 {
            corrhist.update(&keys, 80, 0, 10);
        }

        let correction = corrhist.correction(&keys);
        assert!(correction > 0);
        assert!(correction <= 100);
    }

    #[test]
    fn sides_are_tracked_separately() {
        let mut corrhist = CorrHistTable::boxed();
        let pos = Position::new(Board::default());
        let keys = keys_for(&pos);

        corrhist.update(&keys, 100, 0, 12);

        let mut flipped = keys;
        flipped.side = !keys.side;

        assert!(corrhist.correction(&keys) > 0);
        assert_eq!(corrhist.correction(&flipped), 0);
    }
}
