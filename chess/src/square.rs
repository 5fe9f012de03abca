//! Squares identify a single board position.
//!
//! They double as indices into all of the square-indexed tables scattered
//! around the engine (attack tables, piece lists, history tables), so most
//! of the ergonomics in this module are about making `table[square]` read
//! naturally.

use crate::bitboard::Bitboard;
use crate::piece::Color;
use anyhow::anyhow;
use std::fmt::Display;
use std::ops::Index;
use std::ops::IndexMut;
use std::str::FromStr;
use Square::*;

/// A single square on the board, in little-endian rank-file order (A1 = 0,
/// H8 = 63).
#[rustfmt::skip]
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum Square {
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

impl Square {
    pub const COUNT: usize = 64;

    #[rustfmt::skip]
    pub const ALL: [Self; Self::COUNT] = [
        A1, B1, C1, D1, E1, F1, G1, H1,
        A2, B2, C2, D2, E2, F2, G2, H2,
        A3, B3, C3, D3, E3, F3, G3, H3,
        A4, B4, C4, D4, E4, F4, G4, H4,
        A5, B5, C5, D5, E5, F5, G5, H5,
        A6, B6, C6, D6, E6, F6, G6, H6,
        A7, B7, C7, D7, E7, F7, G7, H7,
        A8, B8, C8, D8, E8, F8, G8, H8,
    ];

    /// Build a square from a 0..64 index.
    ///
    /// Panics on out-of-range input, which would be a bug anyway.
    pub fn new(idx: usize) -> Self {
        Self::ALL[idx]
    }

    /// The rank of the square, 0..8
    pub const fn rank(self) -> usize {
        self as usize / 8
    }

    /// The file of the square, 0..8
    pub const fn file(self) -> usize {
        self as usize % 8
    }

    /// The rank from the point of view of the given side (so rank 0 is the
    /// back rank for both colors).
    pub const fn relative_rank(self, side: Color) -> usize {
        match side {
            Color::White => self.rank(),
            Color::Black => 7 - self.rank(),
        }
    }

    /// Mirror the square vertically (A1 <-> A8)
    pub const fn flip(self) -> Self {
        Self::ALL[self as usize ^ 56]
    }

    /// The square one rank ahead, from the perspective of `side`
    pub fn forward(self, side: Color) -> Option<Self> {
        match side {
            Color::White if self.rank() < 7 => Some(Self::new(self as usize + 8)),
            Color::Black if self.rank() > 0 => Some(Self::new(self as usize - 8)),
            _ => None,
        }
    }

    /// The square one rank back, from the perspective of `side`
    pub fn backward(self, side: Color) -> Option<Self> {
        self.forward(!side)
    }

    /// Chebyshev distance between two squares
    pub fn distance(self, other: Self) -> usize {
        usize::max(
            self.rank().abs_diff(other.rank()),
            self.file().abs_diff(other.file()),
        )
    }

    /// The bitboard holding just this square
    pub const fn bb(self) -> Bitboard {
        Bitboard(1u64 << self as u8)
    }
}

impl From<Square> for Bitboard {
    fn from(sq: Square) -> Self {
        sq.bb()
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = (b'a' + self.file() as u8) as char;
        let rank = (b'1' + self.rank() as u8) as char;
        write!(f, "{file}{rank}")
    }
}

impl FromStr for Square {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut chars = s.chars();
        let file = chars.next().ok_or(anyhow!("Invalid square: {s}"))?;
        let rank = chars.next().ok_or(anyhow!("Invalid square: {s}"))?;

        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return Err(anyhow!("Invalid square: {s}"));
        }

        let file = file as usize - 'a' as usize;
        let rank = rank as usize - '1' as usize;

        Ok(Square::new(8 * rank + file))
    }
}

impl<T> Index<Square> for [T; 64] {
    type Output = T;

    fn index(&self, sq: Square) -> &Self::Output {
        // SAFETY: every legal value of the Square type is in bounds.
        unsafe { self.get_unchecked(sq as usize) }
    }
}

impl<T> IndexMut<Square> for [T; 64] {
    fn index_mut(&mut self, sq: Square) -> &mut Self::Output {
        // SAFETY: every legal value of the Square type is in bounds.
        unsafe { self.get_unchecked_mut(sq as usize) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_and_files() {
        assert_eq!(A1.rank(), 0);
        assert_eq!(A1.file(), 0);
        assert_eq!(E4.rank(), 3);
        assert_eq!(E4.file(), 4);
        assert_eq!(H8.rank(), 7);
        assert_eq!(H8.file(), 7);
    }

    #[test]
    fn flipping() {
        assert_eq!(A1.flip(), A8);
        assert_eq!(E2.flip(), E7);
        assert_eq!(H8.flip(), H1);
    }

    #[test]
    fn parsing_roundtrips() {
        for sq in Square::ALL {
            assert_eq!(sq.to_string().parse::<Square>().unwrap(), sq);
        }
    }

    #[test]
    fn forward_depends_on_side() {
        assert_eq!(E2.forward(Color::White), Some(E3));
        assert_eq!(E2.forward(Color::Black), Some(E1));
        assert_eq!(H8.forward(Color::White), None);
        assert_eq!(A1.forward(Color::Black), None);
    }
}
