//! Castling rights and the fixed geometry of the four castling moves.

use crate::bitboard::Bitboard;
use crate::moves::Move;
use crate::moves::MoveKind;
use crate::piece::Color;
use crate::square::Square;
use anyhow::anyhow;
use std::fmt::Display;
use std::str::FromStr;

////////////////////////////////////////////////////////////////////////////////
//
// Castle types
//
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum CastleType {
    WhiteKingside,
    WhiteQueenside,
    BlackKingside,
    BlackQueenside,
}

impl CastleType {
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [
        Self::WhiteKingside,
        Self::WhiteQueenside,
        Self::BlackKingside,
        Self::BlackQueenside,
    ];

    pub const fn color(self) -> Color {
        match self {
            Self::WhiteKingside | Self::WhiteQueenside => Color::White,
            _ => Color::Black,
        }
    }

    /// The king's move for this castle
    pub fn king_move(self) -> Move {
        use Square::*;

        match self {
            Self::WhiteKingside => Move::new(E1, G1, MoveKind::CastleKingside),
            Self::WhiteQueenside => Move::new(E1, C1, MoveKind::CastleQueenside),
            Self::BlackKingside => Move::new(E8, G8, MoveKind::CastleKingside),
            Self::BlackQueenside => Move::new(E8, C8, MoveKind::CastleQueenside),
        }
    }

    /// The rook's (implied) move for this castle
    pub fn rook_move(self) -> (Square, Square) {
        use Square::*;

        match self {
            Self::WhiteKingside => (H1, F1),
            Self::WhiteQueenside => (A1, D1),
            Self::BlackKingside => (H8, F8),
            Self::BlackQueenside => (A8, D8),
        }
    }

    /// Squares that must be empty for the castle to be available
    pub fn vacant_squares(self) -> Bitboard {
        use Square::*;

        match self {
            Self::WhiteKingside => Bitboard(F1.bb().0 | G1.bb().0),
            Self::WhiteQueenside => Bitboard(B1.bb().0 | C1.bb().0 | D1.bb().0),
            Self::BlackKingside => Bitboard(F8.bb().0 | G8.bb().0),
            Self::BlackQueenside => Bitboard(B8.bb().0 | C8.bb().0 | D8.bb().0),
        }
    }

    /// Squares the king passes through, which may not be attacked (the king's
    /// own square is covered by the in-check test at generation time).
    pub fn king_path(self) -> Bitboard {
        use Square::*;

        match self {
            Self::WhiteKingside => Bitboard(F1.bb().0 | G1.bb().0),
            Self::WhiteQueenside => Bitboard(C1.bb().0 | D1.bb().0),
            Self::BlackKingside => Bitboard(F8.bb().0 | G8.bb().0),
            Self::BlackQueenside => Bitboard(C8.bb().0 | D8.bb().0),
        }
    }

    /// Recover the castle type from a castling move
    pub fn from_move(mv: Move) -> Option<Self> {
        Self::ALL.into_iter().find(|ct| ct.king_move() == mv)
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Castling rights
//
////////////////////////////////////////////////////////////////////////////////

/// A nibble of remaining castling rights, one bit per CastleType.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct CastlingRights(pub u8);

impl CastlingRights {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    /// Per-square masks: moving a piece off (or onto) one of these squares
    /// strips the associated rights. Identity everywhere else.
    #[rustfmt::skip]
    const SQUARE_MASKS: [u8; Square::COUNT] = {
        let mut masks = [0b1111u8; Square::COUNT];
        masks[Square::A1 as usize] = 0b1101;
        masks[Square::E1 as usize] = 0b1100;
        masks[Square::H1 as usize] = 0b1110;
        masks[Square::A8 as usize] = 0b0111;
        masks[Square::E8 as usize] = 0b0011;
        masks[Square::H8 as usize] = 0b1011;
        masks
    };

    pub fn is_available(self, ctype: CastleType) -> bool {
        self.0 & (1 << ctype as u8) != 0
    }

    pub fn add(&mut self, ctype: CastleType) {
        self.0 |= 1 << ctype as u8;
    }

    /// Strip any rights invalidated by a move between the two squares.
    pub fn update(self, src: Square, tgt: Square) -> Self {
        Self(self.0 & Self::SQUARE_MASKS[src] & Self::SQUARE_MASKS[tgt])
    }

    /// The castles available to one side
    pub fn for_side(self, side: Color) -> impl Iterator<Item = CastleType> {
        CastleType::ALL
            .into_iter()
            .filter(move |ct| ct.color() == side)
            .filter(move |&ct| self.is_available(ct))
    }
}

impl Display for CastlingRights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 == 0 {
            return write!(f, "-");
        }

        const LABELS: [&str; 4] = ["K", "Q", "k", "q"];

        for ctype in CastleType::ALL {
            if self.is_available(ctype) {
                write!(f, "{}", LABELS[ctype as usize])?;
            }
        }

        Ok(())
    }
}

impl FromStr for CastlingRights {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut rights = Self::NONE;

        if s == "-" {
            return Ok(rights);
        }

        for ch in s.chars() {
            match ch {
                'K' => rights.add(CastleType::WhiteKingside),
                'Q' => rights.add(CastleType::WhiteQueenside),
                'k' => rights.add(CastleType::BlackKingside),
                'q' => rights.add(CastleType::BlackQueenside),
                _ => return Err(anyhow!("Invalid castling rights: {s}")),
            }
        }

        Ok(rights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::Square::*;

    #[test]
    fn king_moves_strip_both_rights() {
        let rights = CastlingRights::ALL.update(E1, E2);
        assert!(!rights.is_available(CastleType::WhiteKingside));
        assert!(!rights.is_available(CastleType::WhiteQueenside));
        assert!(rights.is_available(CastleType::BlackKingside));
    }

    #[test]
    fn rook_capture_strips_rights() {
        // A capture landing on h8 removes black's kingside castle
        let rights = CastlingRights::ALL.update(B2, H8);
        assert!(!rights.is_available(CastleType::BlackKingside));
        assert!(rights.is_available(CastleType::BlackQueenside));
    }

    #[test]
    fn parsing_roundtrips() {
        for s in ["KQkq", "K", "Qk", "-"] {
            let rights: CastlingRights = s.parse().unwrap();
            assert_eq!(rights.to_string(), s);
        }
    }
}
