//! Capture history: scores for captures, keyed by the moving piece, the
//! target square, and what got captured there.
//!
//! Butterfly-style histories don't work for captures (almost every capture
//! is tried at some point, good or bad); what matters is whether capturing
//! *this kind of piece, there, with this piece* has been paying off.

use super::history::boxed_zeroed;
use super::history::HistoryScore;
use super::history::PieceTo;
use chess::piece::PieceType;
use std::ops::Index;
use std::ops::IndexMut;

#[derive(Debug)]
pub struct CaptureHistoryTable {
    table: [[[HistoryScore; PieceType::COUNT]; 64]; 12],
}

impl CaptureHistoryTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is nothing but i16s; all-zeroes is valid.
        unsafe { boxed_zeroed() }
    }
}

impl Index<(PieceTo, PieceType)> for CaptureHistoryTable {
    type Output = HistoryScore;

    fn index(&self, (idx, victim): (PieceTo, PieceType)) -> &HistoryScore {
        &self.table[idx.piece as usize][idx.tgt as usize][victim]
    }
}

impl IndexMut<(PieceTo, PieceType)> for CaptureHistoryTable {
    fn index_mut(&mut self, (idx, victim): (PieceTo, PieceType)) -> &mut HistoryScore {
        &mut self.table[idx.piece as usize][idx.tgt as usize][victim]
    }
}
