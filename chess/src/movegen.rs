//! Move generation.
//!
//! Generation is pseudo-legal first: every move that respects how the pieces
//! travel, ignoring whether it leaves the king hanging. Legality is then a
//! filter: play the move on a scratch copy and see if the mover's king ended
//! up attacked. That one test covers pins, evasions and the en-passant
//! discovered-check trap in a single stroke, at the cost of a board copy per
//! candidate. Castling is the exception: its path conditions are checked
//! during generation since they don't fit the make-and-test mold.

use crate::attacks;
use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::moves::BareMove;
use crate::moves::Move;
use crate::moves::MoveKind;
use crate::piece::Color;
use crate::piece::PieceType;
use crate::square::Square;
use arrayvec::ArrayVec;

/// Upper bound on the number of (pseudo-legal) moves in any position.
pub const MAX_MOVES: usize = 256;

pub type MoveList = ArrayVec<Move, MAX_MOVES>;

/// Generation scope: everything, or only the moves quiescence wants to see.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum GenMode {
    All,
    Tacticals,
}

impl Board {
    ////////////////////////////////////////////////////////////////////////////
    //
    // Public entry points
    //
    ////////////////////////////////////////////////////////////////////////////

    /// All legal moves in this position.
    pub fn legal_moves(&self) -> MoveList {
        self.legal(GenMode::All)
    }

    /// Legal captures and promotions only.
    pub fn legal_tacticals(&self) -> MoveList {
        self.legal(GenMode::Tacticals)
    }

    fn legal(&self, mode: GenMode) -> MoveList {
        let mut moves = MoveList::new();
        self.pseudo_moves(mode, &mut moves);

        let mut legal = MoveList::new();

        for mv in moves {
            if self.is_legal(mv) {
                legal.push(mv);
            }
        }

        legal
    }

    /// Would this (pseudo-legal) move leave our own king en prise?
    pub fn is_legal(&self, mv: Move) -> bool {
        let us = self.current;
        let next = self.play_move(mv);
        let king = next.king_sq(us);

        !next.attacked_by(king, !us, next.all_occupied())
    }

    /// Is this move even plausible on the current board? Used to vet moves
    /// coming out of the transposition table, which may be torn garbage or
    /// belong to a colliding position entirely.
    pub fn is_pseudo_legal(&self, mv: Move) -> bool {
        if mv == Move::NULL {
            return false;
        }

        let mut moves = MoveList::new();
        self.pseudo_moves(GenMode::All, &mut moves);

        moves.contains(&mv)
    }

    /// Resolve a bare (wire-format) move against the legal moves.
    pub fn find_move(&self, bare: BareMove) -> Option<Move> {
        self.legal_moves().into_iter().find(|&mv| bare.matches(mv))
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Pseudo-legal generation
    //
    ////////////////////////////////////////////////////////////////////////////

    fn pseudo_moves(&self, mode: GenMode, moves: &mut MoveList) {
        let us = self.current;
        let occupied = self.all_occupied();
        let enemy = self.occupied_by(!us);

        // In tacticals mode we only aim at enemy pieces; otherwise anywhere
        // that isn't our own piece.
        let targets = match mode {
            GenMode::All => !self.occupied_by(us),
            GenMode::Tacticals => enemy,
        };

        self.pawn_moves(mode, moves);

        for ptype in [
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ] {
            for src in self.pieces(us, ptype) {
                let attacks = attacks::piece_attacks(ptype, src, occupied) & targets;

                for tgt in attacks {
                    let kind = if enemy.contains(tgt) {
                        MoveKind::Capture
                    } else {
                        MoveKind::Quiet
                    };

                    moves.push(Move::new(src, tgt, kind));
                }
            }
        }

        if mode == GenMode::All {
            self.castling_moves(moves);
        }
    }

    fn pawn_moves(&self, mode: GenMode, moves: &mut MoveList) {
        let us = self.current;
        let pawns = self.pieces(us, PieceType::Pawn);
        let empty = !self.all_occupied();
        let enemy = self.occupied_by(!us);

        ////////////////////////////////////////////////////////////////////////
        //
        // Pushes. Quiet pushes are skipped in tacticals mode, but promotions
        // by push still count as tactical.
        //
        ////////////////////////////////////////////////////////////////////////

        let single_pushes = pawns.forward(us) & empty;

        for tgt in single_pushes {
            let src = tgt.backward(us).unwrap();

            if tgt.relative_rank(us) == 7 {
                push_promos(moves, src, tgt, false, mode);
            } else if mode == GenMode::All {
                moves.push(Move::new(src, tgt, MoveKind::Quiet));
            }
        }

        if mode == GenMode::All {
            let home_rank = match us {
                Color::White => Bitboard::RANK_2,
                Color::Black => Bitboard::RANK_7,
            };

            let double_pushes = ((pawns & home_rank).forward(us) & empty).forward(us) & empty;

            for tgt in double_pushes {
                let src = tgt.backward(us).unwrap().backward(us).unwrap();
                moves.push(Move::new(src, tgt, MoveKind::DoublePush));
            }
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Captures, including capture-promotions and en passant
        //
        ////////////////////////////////////////////////////////////////////////

        for src in pawns {
            let captures = attacks::pawn_attacks(src, us) & enemy;

            for tgt in captures {
                if tgt.relative_rank(us) == 7 {
                    push_promos(moves, src, tgt, true, mode);
                } else {
                    moves.push(Move::new(src, tgt, MoveKind::Capture));
                }
            }

            if let Some(ep_sq) = self.en_passant {
                if attacks::pawn_attacks(src, us).contains(ep_sq) {
                    moves.push(Move::new(src, ep_sq, MoveKind::EnPassant));
                }
            }
        }
    }

    fn castling_moves(&self, moves: &mut MoveList) {
        let us = self.current;
        let occupied = self.all_occupied();

        if self.in_check() {
            return;
        }

        for ctype in self.castling.for_side(us) {
            if !(ctype.vacant_squares() & occupied).is_empty() {
                continue;
            }

            let path_is_safe = ctype
                .king_path()
                .all(|sq| !self.attacked_by(sq, !us, occupied));

            if path_is_safe {
                moves.push(ctype.king_move());
            }
        }
    }
}

/// Push the promotion moves for a pawn arriving on the last rank. Quiescence
/// only cares about queening; the underpromotions stay behind in full
/// generation.
fn push_promos(moves: &mut MoveList, src: Square, tgt: Square, capture: bool, mode: GenMode) {
    moves.push(Move::new(src, tgt, MoveKind::promo(PieceType::Queen, capture)));

    if mode == GenMode::All {
        for ptype in [PieceType::Knight, PieceType::Bishop, PieceType::Rook] {
            moves.push(Move::new(src, tgt, MoveKind::promo(ptype, capture)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square::Square::*;

    #[test]
    fn startpos_has_twenty_moves() {
        let board = Board::default();
        assert_eq!(board.legal_moves().len(), 20);
    }

    #[test]
    fn pinned_pieces_stay_put() {
        // The d7 knight is pinned against the king by the rook on d1
        let board: Board = "3k4/3n4/8/8/8/8/8/3RK3 b - - 0 1".parse().unwrap();
        let knight_moves = board
            .legal_moves()
            .into_iter()
            .filter(|mv| mv.src() == D7)
            .count();

        assert_eq!(knight_moves, 0);
    }

    #[test]
    fn evasions_only_when_in_check() {
        // White king on e1 checked by the rook on e8; every legal move must
        // resolve the check
        let board: Board = "4r1k1/8/8/8/8/8/3P4/3QK3 w - - 0 1".parse().unwrap();
        assert!(board.in_check());

        for mv in board.legal_moves() {
            let next = board.play_move(mv);
            let king = next.king_sq(Color::White);
            assert!(!next.attacked_by(king, Color::Black, next.all_occupied()));
        }
    }

    #[test]
    fn en_passant_discovered_check_is_illegal() {
        // Capturing en passant would clear both pawns off the fifth rank and
        // leave the white king staring at the rook: the classic trap
        let board: Board = "8/8/8/K2pP2r/8/8/8/4k3 w - d6 0 1".parse().unwrap();
        let mv = board.find_move("e5d6".parse().unwrap());
        assert!(mv.is_none());
    }

    #[test]
    fn no_castling_through_attack() {
        // The black rook on f8 covers f1, so white may not castle kingside,
        // but queenside is fine
        let board: Board = "r3kr2/8/8/8/8/8/8/R3K2R w KQq - 0 1".parse().unwrap();
        let moves = board.legal_moves();

        assert!(!moves.contains(&Move::new(E1, G1, MoveKind::CastleKingside)));
        assert!(moves.contains(&Move::new(E1, C1, MoveKind::CastleQueenside)));
    }

    #[test]
    fn tacticals_are_a_subset_of_legal_moves() {
        let board: Board =
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
                .parse()
                .unwrap();

        let all = board.legal_moves();

        for mv in board.legal_tacticals() {
            assert!(all.contains(&mv));
            assert!(mv.is_tactical());
        }
    }

    #[test]
    fn promotions_come_in_four_kinds() {
        let board: Board = "8/4P3/8/8/8/8/8/k1K5 w - - 0 1".parse().unwrap();
        let promos = board
            .legal_moves()
            .into_iter()
            .filter(|mv| mv.is_promotion())
            .count();

        assert_eq!(promos, 4);

        // ... but quiescence only looks at the queen
        let qs_promos = board
            .legal_tacticals()
            .into_iter()
            .filter(|mv| mv.is_promotion())
            .count();

        assert_eq!(qs_promos, 1);
    }
}
