//! The `info` line: everything the engine reports about an ongoing search.
//!
//! Every field is optional; whatever is present gets rendered, in the
//! customary order, as a single line.

use chess::moves::Move;
use std::fmt::Display;

#[derive(Debug, Clone, Default)]
pub struct SearchInfo {
    pub depth: Option<u8>,
    pub seldepth: Option<u8>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub time: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub hashfull: Option<u32>,
    pub tbhits: Option<u64>,

    /// Win/draw/loss estimate in permille, when UCI_ShowWDL is on
    pub wdl: Option<(u64, u64, u64)>,

    pub currmove: Option<Move>,
    pub currmovenumber: Option<u32>,
    pub pv: Vec<Move>,
}

/// A score as reported over UCI: either centipawns or moves-to-mate, with an
/// optional bound marker when an aspiration window failed high or low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub kind: ScoreKind,
    pub bound: Bound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    Cp(i32),
    Mate(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    #[default]
    Exact,
    Lower,
    Upper,
}

impl Score {
    pub fn cp(value: i32) -> Self {
        Self { kind: ScoreKind::Cp(value), bound: Bound::Exact }
    }

    pub fn mate(moves: i32) -> Self {
        Self { kind: ScoreKind::Mate(moves), bound: Bound::Exact }
    }

    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ScoreKind::Cp(value) => write!(f, "cp {value}")?,
            ScoreKind::Mate(moves) => write!(f, "mate {moves}")?,
        }

        match self.bound {
            Bound::Exact => Ok(()),
            Bound::Lower => write!(f, " lowerbound"),
            Bound::Upper => write!(f, " upperbound"),
        }
    }
}

impl Display for SearchInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(depth) = self.depth {
            write!(f, "depth {depth}")?;
        }

        if let Some(seldepth) = self.seldepth {
            write!(f, " seldepth {seldepth}")?;
        }

        if let Some(multipv) = self.multipv {
            write!(f, " multipv {multipv}")?;
        }

        if let Some(score) = self.score {
            write!(f, " score {score}")?;
        }

        if let Some((win, draw, loss)) = self.wdl {
            write!(f, " wdl {win} {draw} {loss}")?;
        }

        if let Some(nodes) = self.nodes {
            write!(f, " nodes {nodes}")?;
        }

        if let Some(nps) = self.nps {
            write!(f, " nps {nps}")?;
        }

        if let Some(hashfull) = self.hashfull {
            write!(f, " hashfull {hashfull}")?;
        }

        if let Some(tbhits) = self.tbhits {
            write!(f, " tbhits {tbhits}")?;
        }

        if let Some(time) = self.time {
            write!(f, " time {time}")?;
        }

        if let Some(currmove) = self.currmove {
            write!(f, " currmove {currmove}")?;
        }

        if let Some(currmovenumber) = self.currmovenumber {
            write!(f, " currmovenumber {currmovenumber}")?;
        }

        if !self.pv.is_empty() {
            write!(f, " pv")?;
            for mv in &self.pv {
                write!(f, " {mv}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::moves::MoveKind;
    use chess::square::Square::*;

    #[test]
    fn full_line_rendering() {
        let info = SearchInfo {
            depth: Some(12),
            seldepth: Some(18),
            multipv: Some(1),
            score: Some(Score::cp(35)),
            time: Some(1234),
            nodes: Some(1_000_000),
            nps: Some(810_372),
            hashfull: Some(417),
            tbhits: Some(0),
            pv: vec![
                Move::new(E2, E4, MoveKind::DoublePush),
                Move::new(E7, E5, MoveKind::DoublePush),
            ],
            ..Default::default()
        };

        assert_eq!(
            info.to_string(),
            "depth 12 seldepth 18 multipv 1 score cp 35 nodes 1000000 \
             nps 810372 hashfull 417 tbhits 0 time 1234 pv e2e4 e7e5"
        );
    }

    #[test]
    fn mate_scores_and_bounds() {
        assert_eq!(Score::mate(3).to_string(), "mate 3");
        assert_eq!(Score::mate(-2).to_string(), "mate -2");
        assert_eq!(
            Score::cp(120).with_bound(Bound::Lower).to_string(),
            "cp 120 lowerbound"
        );
        assert_eq!(
            Score::cp(-80).with_bound(Bound::Upper).to_string(),
            "cp -80 upperbound"
        );
    }

    #[test]
    fn wdl_sits_between_score_and_nodes() {
        let info = SearchInfo {
            depth: Some(1),
            score: Some(Score::cp(0)),
            wdl: Some((330, 340, 330)),
            nodes: Some(20),
            ..Default::default()
        };

        assert_eq!(info.to_string(), "depth 1 score cp 0 wdl 330 340 330 nodes 20");
    }
}
