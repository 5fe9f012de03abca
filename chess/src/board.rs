//! The board holds the complete game state at one instant: piece placement,
//! side to move, castling rights, en-passant square and the move clocks.
//!
//! Boards are small and `Copy`, and playing a move produces a _new_ board
//! (copy-make). The search never has to unwind anything: abandoning a line
//! means dropping the copies.

use crate::attacks;
use crate::bitboard::Bitboard;
use crate::castling::CastleType;
use crate::castling::CastlingRights;
use crate::moves::Move;
use crate::piece::Color;
use crate::piece::Piece;
use crate::piece::PieceType;
use crate::square::Square;
use colored::Colorize;
use std::fmt::Display;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Board {
    /// The side to move
    pub current: Color,

    /// Piece sets per piece type, both colors mixed
    pub piece_bbs: [Bitboard; PieceType::COUNT],

    /// Occupation per side
    pub side_bbs: [Bitboard; Color::COUNT],

    /// Square-indexed piece lookup, kept in sync with the bitboards
    pub piece_list: [Option<Piece>; Square::COUNT],

    /// Remaining castling rights for both sides
    pub castling: CastlingRights,

    /// The en-passant target square, if the last move was a double push
    pub en_passant: Option<Square>,

    /// Plies since the last capture or pawn move (50-move rule)
    pub halfmoves: u8,

    /// Full move counter, incremented after black's move
    pub fullmoves: u16,
}

impl Board {
    pub const EMPTY: Self = Self {
        current: Color::White,
        piece_bbs: [Bitboard::EMPTY; PieceType::COUNT],
        side_bbs: [Bitboard::EMPTY; Color::COUNT],
        piece_list: [None; Square::COUNT],
        castling: CastlingRights::NONE,
        en_passant: None,
        halfmoves: 0,
        fullmoves: 1,
    };

    ////////////////////////////////////////////////////////////////////////////
    //
    // Piece bookkeeping
    //
    ////////////////////////////////////////////////////////////////////////////

    pub fn get_at(&self, sq: Square) -> Option<Piece> {
        self.piece_list[sq]
    }

    pub fn add_at(&mut self, sq: Square, piece: Piece) {
        debug_assert!(self.piece_list[sq].is_none());
        self.piece_list[sq] = Some(piece);
        self.piece_bbs[piece.piece_type()] |= sq.bb();
        self.side_bbs[piece.color()] |= sq.bb();
    }

    pub fn remove_at(&mut self, sq: Square) -> Option<Piece> {
        let piece = self.piece_list[sq].take()?;
        self.piece_bbs[piece.piece_type()] ^= sq.bb();
        self.side_bbs[piece.color()] ^= sq.bb();
        Some(piece)
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Piece set queries
    //
    ////////////////////////////////////////////////////////////////////////////

    pub fn occupied_by(&self, side: Color) -> Bitboard {
        self.side_bbs[side]
    }

    pub fn all_occupied(&self) -> Bitboard {
        self.side_bbs[Color::White] | self.side_bbs[Color::Black]
    }

    pub fn pieces(&self, side: Color, ptype: PieceType) -> Bitboard {
        self.piece_bbs[ptype] & self.side_bbs[side]
    }

    pub fn king_sq(&self, side: Color) -> Square {
        self.pieces(side, PieceType::King).lsb()
    }

    /// Bishops and queens of one side
    pub fn diag_sliders(&self, side: Color) -> Bitboard {
        (self.piece_bbs[PieceType::Bishop] | self.piece_bbs[PieceType::Queen])
            & self.side_bbs[side]
    }

    /// Rooks and queens of one side
    pub fn hv_sliders(&self, side: Color) -> Bitboard {
        (self.piece_bbs[PieceType::Rook] | self.piece_bbs[PieceType::Queen])
            & self.side_bbs[side]
    }

    /// Does `side` have anything left besides pawns and the king?
    ///
    /// Used to gate null-move pruning: with only pawns on the board, zugzwang
    /// stops being "unlikely".
    pub fn has_non_pawn_material(&self, side: Color) -> bool {
        let minors_and_majors = self.occupied_by(side)
            & !self.piece_bbs[PieceType::Pawn]
            & !self.piece_bbs[PieceType::King];

        !minors_and_majors.is_empty()
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Attack queries
    //
    ////////////////////////////////////////////////////////////////////////////

    /// Is `sq` attacked by any piece of `side`, given an occupancy?
    ///
    /// The occupancy is a parameter so callers can ask hypothetical questions
    /// (castling paths, exchange evaluation).
    pub fn attacked_by(&self, sq: Square, side: Color, occupied: Bitboard) -> bool {
        let pawns = self.pieces(side, PieceType::Pawn);
        let knights = self.pieces(side, PieceType::Knight);
        let king = self.pieces(side, PieceType::King);

        // Leapers first: they're cheap lookups.
        if !(attacks::pawn_attacks(sq, !side) & pawns).is_empty()
            || !(attacks::knight_attacks(sq) & knights).is_empty()
            || !(attacks::king_attacks(sq) & king).is_empty()
        {
            return true;
        }

        !(attacks::bishop_attacks(sq, occupied) & self.diag_sliders(side)).is_empty()
            || !(attacks::rook_attacks(sq, occupied) & self.hv_sliders(side)).is_empty()
    }

    /// All pieces of either side attacking `sq`, given an occupancy.
    pub fn attackers(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        use Color::*;
        use PieceType::*;

        let pawns = attacks::pawn_attacks(sq, Black) & self.pieces(White, Pawn)
            | attacks::pawn_attacks(sq, White) & self.pieces(Black, Pawn);

        pawns
            | attacks::knight_attacks(sq) & self.piece_bbs[Knight]
            | attacks::king_attacks(sq) & self.piece_bbs[King]
            | attacks::bishop_attacks(sq, occupied)
                & (self.diag_sliders(White) | self.diag_sliders(Black))
            | attacks::rook_attacks(sq, occupied)
                & (self.hv_sliders(White) | self.hv_sliders(Black))
    }

    /// Is the side to move in check?
    pub fn in_check(&self) -> bool {
        let king = self.king_sq(self.current);
        self.attacked_by(king, !self.current, self.all_occupied())
    }

    /// The pieces currently giving check
    pub fn checkers(&self) -> Bitboard {
        let king = self.king_sq(self.current);
        self.attackers(king, self.all_occupied()) & self.occupied_by(!self.current)
    }

    /// Does the move give check? Answered the expensive-but-honest way, by
    /// playing the move.
    pub fn gives_check(&self, mv: Move) -> bool {
        self.play_move(mv).in_check()
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Playing moves
    //
    ////////////////////////////////////////////////////////////////////////////

    /// Play a move and return the resulting board.
    ///
    /// The move must have been produced by move generation on this board;
    /// garbage in, garbage out.
    pub fn play_move(&self, mv: Move) -> Board {
        debug_assert!(mv != Move::NULL);

        let mut board = *self;
        let us = self.current;
        let src = mv.src();
        let tgt = mv.tgt();

        let piece = board.remove_at(src).expect("move source holds a piece");

        if mv.is_capture() {
            board.remove_at(mv.capture_sq(us));
        }

        // Place the moved piece, which may have promoted on the way
        board.add_at(tgt, mv.promo_piece(us).unwrap_or(piece));

        // Castling also moves the rook
        if mv.is_castle() {
            let ctype = CastleType::from_move(mv).expect("castle move has a castle type");
            let (rook_src, rook_tgt) = ctype.rook_move();
            let rook = board.remove_at(rook_src).expect("castle rook in place");
            board.add_at(rook_tgt, rook);
        }

        board.castling = board.castling.update(src, tgt);

        board.en_passant = if mv.is_double_push() {
            tgt.backward(us)
        } else {
            None
        };

        if piece.is_pawn() || mv.is_capture() {
            board.halfmoves = 0;
        } else {
            board.halfmoves += 1;
        }

        if !us.is_white() {
            board.fullmoves += 1;
        }

        board.current = !us;
        board
    }

    /// Pass the turn without moving: the forbidden move that makes null-move
    /// pruning work.
    pub fn play_null_move(&self) -> Board {
        let mut board = *self;

        board.current = !board.current;
        board.en_passant = None;
        board.halfmoves += 1;

        if board.current.is_white() {
            board.fullmoves += 1;
        }

        board
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Rule-based draws
    //
    ////////////////////////////////////////////////////////////////////////////

    /// Fifty-move rule or dead position.
    ///
    /// Repetitions are not the board's business: they need game history, which
    /// lives a level up.
    pub fn is_rule_draw(&self) -> bool {
        self.halfmoves >= 100 || self.insufficient_material()
    }

    /// Neither side can possibly deliver mate: bare kings, or king + single
    /// minor piece against a bare king.
    pub fn insufficient_material(&self) -> bool {
        use PieceType::*;

        let knights = self.piece_bbs[Knight];
        let bishops = self.piece_bbs[Bishop];
        let minors = knights | bishops;

        let heavy_or_pawn = self.piece_bbs[Pawn]
            | self.piece_bbs[Rook]
            | self.piece_bbs[Queen];

        heavy_or_pawn.is_empty() && minors.count() <= 1
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Display
//
////////////////////////////////////////////////////////////////////////////////

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", "   a b c d e f g h".bright_blue())?;

        for rank in (0..8).rev() {
            write!(f, "{} ", (rank + 1).to_string().bright_blue())?;

            for file in 0..8 {
                let sq = Square::new(8 * rank + file);

                match self.get_at(sq) {
                    Some(piece) => write!(f, " {piece}")?,
                    None => write!(f, " {}", ".".bright_black())?,
                }
            }

            writeln!(f)?;
        }

        write!(f, "\n{} {} to move", "»".bright_blue(), self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::MoveKind;
    use crate::square::Square::*;

    #[test]
    fn playing_a_capture_updates_both_sides() {
        let board: Board = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
            .parse()
            .unwrap();

        let next = board.play_move(Move::new(E4, D5, MoveKind::Capture));

        assert_eq!(next.get_at(D5), Some(Piece::WhitePawn));
        assert_eq!(next.occupied_by(Color::Black).count(), 15);
        assert_eq!(next.halfmoves, 0);
        assert_eq!(next.current, Color::Black);
    }

    #[test]
    fn castling_moves_the_rook() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let next = board.play_move(Move::new(E1, G1, MoveKind::CastleKingside));

        assert_eq!(next.get_at(G1), Some(Piece::WhiteKing));
        assert_eq!(next.get_at(F1), Some(Piece::WhiteRook));
        assert_eq!(next.get_at(H1), None);
        assert!(!next.castling.is_available(CastleType::WhiteKingside));
        assert!(!next.castling.is_available(CastleType::WhiteQueenside));
        assert!(next.castling.is_available(CastleType::BlackKingside));
    }

    #[test]
    fn en_passant_removes_the_right_pawn() {
        let board: Board = "k7/8/8/3pP3/8/8/8/K7 w - d6 0 2".parse().unwrap();
        let next = board.play_move(Move::new(E5, D6, MoveKind::EnPassant));

        assert_eq!(next.get_at(D6), Some(Piece::WhitePawn));
        assert_eq!(next.get_at(D5), None);
        assert!(next.occupied_by(Color::Black).count() == 1);
    }

    #[test]
    fn check_detection() {
        let board: Board = "4k3/8/8/8/8/8/4R3/4K3 b - - 0 1".parse().unwrap();
        assert!(board.in_check());
        assert_eq!(board.checkers().count(), 1);

        let board: Board = "4k3/8/8/8/8/8/3R4/4K3 b - - 0 1".parse().unwrap();
        assert!(!board.in_check());
    }

    #[test]
    fn insufficient_material_cases() {
        let draw: Board = "8/8/4k3/8/8/2K5/8/8 w - - 0 1".parse().unwrap();
        assert!(draw.insufficient_material());

        let draw: Board = "8/8/4k3/8/8/2K2N2/8/8 w - - 0 1".parse().unwrap();
        assert!(draw.insufficient_material());

        let not_draw: Board = "8/8/4k3/8/8/2K2N2/5N2/8 w - - 0 1".parse().unwrap();
        assert!(!not_draw.insufficient_material());

        let not_draw: Board = "8/8/4k3/8/8/2K4P/8/8 w - - 0 1".parse().unwrap();
        assert!(!not_draw.insufficient_material());
    }
}
