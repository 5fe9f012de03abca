//! Continuation history: "given that this move was just played, how good
//! has that reply been?"
//!
//! One full (piece, to)-table of reply scores per (piece, to) of the
//! preceding move. The search consults the tables for the moves played one,
//! two and four plies ago, which picks up recurring maneuvers that plain
//! butterfly history is blind to.

use super::history::boxed_zeroed;
use super::history::HistoryScore;
use super::history::PieceTo;
use std::ops::Index;
use std::ops::IndexMut;

#[derive(Debug)]
pub struct ContinuationHistoryTable {
    table: [[[[HistoryScore; 64]; 12]; 64]; 12],
}

impl ContinuationHistoryTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is nothing but i16s; all-zeroes is valid.
        unsafe { boxed_zeroed() }
    }
}

impl Index<(PieceTo, PieceTo)> for ContinuationHistoryTable {
    type Output = HistoryScore;

    fn index(&self, (prev, current): (PieceTo, PieceTo)) -> &HistoryScore {
        &self.table[prev.piece as usize][prev.tgt as usize][current.piece as usize]
            [current.tgt as usize]
    }
}

impl IndexMut<(PieceTo, PieceTo)> for ContinuationHistoryTable {
    fn index_mut(&mut self, (prev, current): (PieceTo, PieceTo)) -> &mut HistoryScore {
        &mut self.table[prev.piece as usize][prev.tgt as usize][current.piece as usize]
            [current.tgt as usize]
    }
}
