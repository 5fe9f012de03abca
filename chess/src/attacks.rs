//! Attack boards for every piece type.
//!
//! Leaper attacks (knight, king, pawn) are table lookups, built once at
//! compile time. Slider attacks use the classical ray-scan: take the full
//! attack ray, find the first blocker in ray direction, and mask off
//! everything behind it.

use crate::bitboard::Bitboard;
use crate::piece::Color;
use crate::piece::PieceType;
use crate::square::Square;

////////////////////////////////////////////////////////////////////////////////
//
// Compile-time table generation
//
////////////////////////////////////////////////////////////////////////////////

/// Walk from `sq` in steps of (file, rank) until we run off the board, and
/// collect the visited squares.
const fn ray(sq: usize, df: i32, dr: i32) -> u64 {
    let mut bb = 0u64;
    let mut file = (sq % 8) as i32 + df;
    let mut rank = (sq / 8) as i32 + dr;

    while 0 <= file && file < 8 && 0 <= rank && rank < 8 {
        bb |= 1u64 << (8 * rank + file);
        file += df;
        rank += dr;
    }

    bb
}

/// Collect single steps from `sq` for each (file, rank) offset that stays on
/// the board.
const fn steps<const N: usize>(sq: usize, offsets: [(i32, i32); N]) -> u64 {
    let mut bb = 0u64;
    let mut i = 0;

    while i < N {
        let (df, dr) = offsets[i];
        let file = (sq % 8) as i32 + df;
        let rank = (sq / 8) as i32 + dr;

        if 0 <= file && file < 8 && 0 <= rank && rank < 8 {
            bb |= 1u64 << (8 * rank + file);
        }

        i += 1;
    }

    bb
}

const fn leaper_table<const N: usize>(offsets: [(i32, i32); N]) -> [Bitboard; 64] {
    let mut table = [Bitboard::EMPTY; 64];
    let mut sq = 0;

    while sq < 64 {
        table[sq] = Bitboard(steps(sq, offsets));
        sq += 1;
    }

    table
}

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2),
];

const KING_OFFSETS: [(i32, i32); 8] = [
    (0, 1), (1, 1), (1, 0), (1, -1), (0, -1), (-1, -1), (-1, 0), (-1, 1),
];

pub const KNIGHT_ATTACKS: [Bitboard; 64] = leaper_table(KNIGHT_OFFSETS);
pub const KING_ATTACKS: [Bitboard; 64] = leaper_table(KING_OFFSETS);

pub const PAWN_ATTACKS: [[Bitboard; 64]; 2] = [
    leaper_table([(-1, 1), (1, 1)]),
    leaper_table([(-1, -1), (1, -1)]),
];

////////////////////////////////////////////////////////////////////////////////
//
// Rays
//
////////////////////////////////////////////////////////////////////////////////

/// Compass directions. The first four shift towards higher square indices
/// (scan for blockers from the LSB), the last four towards lower ones (scan
/// from the MSB).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(usize)]
enum Dir {
    North,
    NorthEast,
    East,
    NorthWest,
    South,
    SouthWest,
    West,
    SouthEast,
}

const DIR_OFFSETS: [(i32, i32); 8] = [
    (0, 1), (1, 1), (1, 0), (-1, 1), (0, -1), (-1, -1), (-1, 0), (1, -1),
];

const RAYS: [[Bitboard; 64]; 8] = {
    let mut rays = [[Bitboard::EMPTY; 64]; 8];
    let mut dir = 0;

    while dir < 8 {
        let (df, dr) = DIR_OFFSETS[dir];
        let mut sq = 0;

        while sq < 64 {
            rays[dir][sq] = Bitboard(ray(sq, df, dr));
            sq += 1;
        }

        dir += 1;
    }

    rays
};

/// The attack ray in one direction, cut off behind the first blocker.
fn blocked_ray(dir: Dir, sq: Square, occupied: Bitboard) -> Bitboard {
    let full = RAYS[dir as usize][sq as usize];
    let blockers = full & occupied;

    if blockers.is_empty() {
        return full;
    }

    // Directions that move towards higher indices meet their first blocker at
    // the LSB; the others at the MSB.
    let first = if (dir as usize) < 4 {
        blockers.lsb()
    } else {
        blockers.msb()
    };

    full ^ RAYS[dir as usize][first as usize]
}

////////////////////////////////////////////////////////////////////////////////
//
// Public attack queries
//
////////////////////////////////////////////////////////////////////////////////

pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    blocked_ray(Dir::NorthEast, sq, occupied)
        | blocked_ray(Dir::NorthWest, sq, occupied)
        | blocked_ray(Dir::SouthEast, sq, occupied)
        | blocked_ray(Dir::SouthWest, sq, occupied)
}

pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    blocked_ray(Dir::North, sq, occupied)
        | blocked_ray(Dir::East, sq, occupied)
        | blocked_ray(Dir::South, sq, occupied)
        | blocked_ray(Dir::West, sq, occupied)
}

pub fn queen_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupied) | rook_attacks(sq, occupied)
}

pub fn knight_attacks(sq: Square) -> Bitboard {
    KNIGHT_ATTACKS[sq]
}

pub fn king_attacks(sq: Square) -> Bitboard {
    KING_ATTACKS[sq]
}

/// The squares a pawn of `side` on `sq` attacks (not its pushes).
pub fn pawn_attacks(sq: Square, side: Color) -> Bitboard {
    PAWN_ATTACKS[side as usize][sq]
}

/// Attacks for any non-pawn piece type.
pub fn piece_attacks(ptype: PieceType, sq: Square, occupied: Bitboard) -> Bitboard {
    match ptype {
        PieceType::Knight => knight_attacks(sq),
        PieceType::Bishop => bishop_attacks(sq, occupied),
        PieceType::Rook => rook_attacks(sq, occupied),
        PieceType::Queen => queen_attacks(sq, occupied),
        PieceType::King => king_attacks(sq),
        PieceType::Pawn => unreachable!("pawn attacks depend on the side"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::Square::*;

    #[test]
    fn knight_attack_counts() {
        assert_eq!(knight_attacks(A1).count(), 2);
        assert_eq!(knight_attacks(B1).count(), 3);
        assert_eq!(knight_attacks(E4).count(), 8);
    }

    #[test]
    fn king_attack_counts() {
        assert_eq!(king_attacks(A1).count(), 3);
        assert_eq!(king_attacks(E1).count(), 5);
        assert_eq!(king_attacks(D5).count(), 8);
    }

    #[test]
    fn rook_on_empty_board() {
        assert_eq!(rook_attacks(A1, Bitboard::EMPTY).count(), 14);
        assert_eq!(rook_attacks(E4, Bitboard::EMPTY).count(), 14);
    }

    #[test]
    fn rook_stops_at_blockers() {
        let occupied = Bitboard::from(E6) | Bitboard::from(G4);
        let attacks = rook_attacks(E4, occupied);

        // Blockers themselves are attacked, squares behind them aren't
        assert!(attacks.contains(E6));
        assert!(!attacks.contains(E7));
        assert!(attacks.contains(G4));
        assert!(!attacks.contains(H4));
        assert!(attacks.contains(A4));
        assert!(attacks.contains(E1));
    }

    #[test]
    fn bishop_stops_at_blockers() {
        let occupied = Bitboard::from(G6);
        let attacks = bishop_attacks(E4, occupied);

        assert!(attacks.contains(G6));
        assert!(!attacks.contains(H7));
        assert!(attacks.contains(A8));
        assert!(attacks.contains(H1));
    }

    #[test]
    fn pawn_attacks_by_side() {
        assert_eq!(
            pawn_attacks(E4, Color::White),
            Bitboard::from(D5) | Bitboard::from(F5)
        );
        assert_eq!(
            pawn_attacks(E4, Color::Black),
            Bitboard::from(D3) | Bitboard::from(F3)
        );
        assert_eq!(pawn_attacks(A2, Color::White), Bitboard::from(B3));
    }
}
