//! Static exchange evaluation.
//!
//! SEE answers "if everything that can capture on this square does, in least
//! valuable attacker order, who comes out ahead?" without searching. The
//! search uses it to split captures into good and bad ones, and to prune
//! moves whose exchanges lose too much material.
//!
//! The implementation is threshold-based: rather than computing the exact
//! exchange balance, `see(mv, threshold)` only answers whether the balance
//! ends up at or above the threshold, which lets us bail out of the exchange
//! early in most cases.

use crate::attacks;
use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::moves::Move;
use crate::piece::Color;
use crate::piece::PieceType;
use crate::square::Square;

/// Piece values for exchange purposes. The king's value never enters the
/// balance: if he has to take, the exchange is already over.
pub const SEE_VALUES: [i32; PieceType::COUNT] = [100, 300, 300, 500, 900, 0];

pub fn piece_value(ptype: PieceType) -> i32 {
    SEE_VALUES[ptype]
}

impl Board {
    /// Does the exchange set off by `mv` come out at or above `threshold`?
    pub fn see(&self, mv: Move, threshold: i32) -> bool {
        let src = mv.src();
        let tgt = mv.tgt();

        // Castles can't be captured; their exchange balance is always zero.
        if mv.is_castle() {
            return threshold <= 0;
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Material swing of the move itself
        //
        ////////////////////////////////////////////////////////////////////////

        let mut balance = 0;

        if let Some(promo) = mv.promo_type() {
            balance += SEE_VALUES[promo] - SEE_VALUES[PieceType::Pawn];
        }

        if mv.is_capture() {
            let victim = if mv.is_en_passant() {
                PieceType::Pawn
            } else {
                self.get_at(tgt).expect("capture target holds a piece").piece_type()
            };

            balance += SEE_VALUES[victim];
        }

        // The piece that now sits on the target, waiting to be traded off
        let mut victim = match mv.promo_type() {
            Some(promo) => promo,
            None => self.get_at(src).expect("move source holds a piece").piece_type(),
        };

        // Even giving up the capturing piece entirely keeps us above the
        // threshold: no need to play out the exchange.
        if balance - SEE_VALUES[victim] >= threshold {
            return true;
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Play out the exchange, least valuable attacker first
        //
        ////////////////////////////////////////////////////////////////////////

        let mut occupied = self.all_occupied() ^ src.bb() | tgt.bb();

        if mv.is_en_passant() {
            occupied ^= mv.capture_sq(self.current).bb();
        }

        let diag_sliders =
            (self.diag_sliders(Color::White) | self.diag_sliders(Color::Black)) & occupied;
        let hv_sliders =
            (self.hv_sliders(Color::White) | self.hv_sliders(Color::Black)) & occupied;

        let mut attackers = self.attackers(tgt, occupied) & occupied;
        let mut side = self.current;

        loop {
            // Flip the perspective to the side about to recapture
            side = !side;
            balance = -balance;

            let Some(attacker_sq) = self.least_valuable(attackers, side) else {
                break;
            };

            let attacker = self.get_at(attacker_sq).expect("attacker square holds a piece");

            // Lift the attacker off the board, and look for sliders it was
            // shadowing
            occupied ^= attacker_sq.bb();
            attackers &= occupied;

            if attacker.is_pawn() || attacker.is_diag_slider() {
                attackers |= attacks::bishop_attacks(tgt, occupied) & diag_sliders;
            }

            if attacker.is_hv_slider() {
                attackers |= attacks::rook_attacks(tgt, occupied) & hv_sliders;
            }

            // The king can only recapture if nothing is left to punish it
            if attacker.is_king() && !(attackers & self.occupied_by(!side)).is_empty() {
                break;
            }

            balance += SEE_VALUES[victim];
            victim = attacker.piece_type();

            if side == self.current && balance - SEE_VALUES[victim] >= threshold {
                return true;
            }
        }

        // Express the final balance from the original mover's point of view
        if side != self.current {
            balance = -balance;
        }

        threshold <= balance
    }

    /// The square of the least valuable piece of `side` among `attackers`.
    fn least_valuable(&self, attackers: Bitboard, side: Color) -> Option<Square> {
        let candidates = attackers & self.occupied_by(side);

        PieceType::ALL
            .into_iter()
            .map(|ptype| candidates & self.piece_bbs[ptype])
            .find(|bb| !bb.is_empty())
            .map(|bb| bb.lsb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn queen_takes_defended_pawn_is_losing() {
        let board: Board = KIWIPETE.parse().unwrap();
        let mv = board.find_move("f3h5".parse().unwrap()).unwrap();
        assert!(!board.see(mv, 0));
    }

    #[test]
    fn even_trade_passes_zero() {
        let board: Board = KIWIPETE.parse().unwrap();
        let mv = board.find_move("e2b5".parse().unwrap()).unwrap();
        assert!(board.see(mv, 0));
    }

    #[test]
    fn winning_capture_passes_positive_threshold() {
        // Pawn takes an undefended knight
        let board: Board = "4k3/8/3n4/4P3/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let mv = board.find_move("e5d6".parse().unwrap()).unwrap();

        assert!(board.see(mv, 0));
        assert!(board.see(mv, 200));
        assert!(!board.see(mv, 250));
    }

    #[test]
    fn quiet_move_into_attack_is_losing() {
        // Rook steps onto a square covered by a pawn
        let board: Board = "4k3/8/2p5/8/8/8/8/1R2K3 w - - 0 1".parse().unwrap();
        let mv = board.find_move("b1b5".parse().unwrap()).unwrap();

        assert!(!board.see(mv, 0));
        assert!(board.see(mv, -500));
    }

    #[test]
    fn xray_recaptures_count() {
        // Doubled rooks against a defended pawn: RxP, PxR, RxP wins the pawn
        // back through the discovered file
        let board: Board = "1k6/3p4/2p5/8/8/8/2R5/1KR5 w - - 0 1".parse().unwrap();
        let mv = board.find_move("c2c6".parse().unwrap()).unwrap();

        assert!(board.see(mv, -300));
        assert!(!board.see(mv, 0));
    }
}
