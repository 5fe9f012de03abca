//! Pawn history: quiet-move scores conditioned on the pawn structure.
//!
//! The same quiet maneuver can be strong under one pawn skeleton and
//! pointless under another; indexing by a slice of the pawn hash separates
//! those worlds where the plain butterfly table would blur them.

use super::history::boxed_zeroed;
use super::history::HistoryScore;
use super::history::PieceTo;
use crate::zobrist::ZHash;
use std::ops::Index;
use std::ops::IndexMut;

const SIZE: usize = 512;

#[derive(Debug)]
pub struct PawnHistoryTable {
    table: [[[HistoryScore; 64]; 12]; SIZE],
}

impl PawnHistoryTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is nothing but i16s; all-zeroes is valid.
        unsafe { boxed_zeroed() }
    }

    fn bucket(hash: ZHash) -> usize {
        hash.0 as usize % SIZE
    }
}

impl Index<(ZHash, PieceTo)> for PawnHistoryTable {
    type Output = HistoryScore;

    fn index(&self, (hash, idx): (ZHash, PieceTo)) -> &HistoryScore {
        &self.table[Self::bucket(hash)][idx.piece as usize][idx.tgt as usize]
    }
}

impl IndexMut<(ZHash, PieceTo)> for PawnHistoryTable {
    fn index_mut(&mut self, (hash, idx): (ZHash, PieceTo)) -> &mut HistoryScore {
        &mut self.table[Self::bucket(hash)][idx.piece as usize][idx.tgt as usize]
    }
}
