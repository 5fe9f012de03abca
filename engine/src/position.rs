//! A `Position` is a `Board` plus everything the search layer tracks across
//! moves but the board itself has no business knowing: the Zobrist hash
//! family and the repetition history.
//!
//! The hashes are updated incrementally while playing a move; recomputing
//! them from scratch every node would dwarf the cost of the move itself.

use crate::zobrist::ZHash;
use arrayvec::ArrayVec;
use chess::board::Board;
use chess::castling::CastleType;
use chess::moves::BareMove;
use chess::moves::Move;
use chess::piece::Color;
use chess::piece::Piece;
use chess::piece::PieceType;

/// Positions older than the last irreversible move can never repeat, so the
/// history never needs more room than the 50-move rule allows.
const HIST_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct Position {
    /// The board itself
    pub board: Board,

    /// Zobrist hash of the full board state
    pub hash: ZHash,

    /// Hash of the pawn structure only
    pub pawn_hash: ZHash,

    /// Hashes of each side's non-pawn material
    pub nonpawn_hashes: [ZHash; 2],

    /// Hash of minor pieces and kings
    pub minor_hash: ZHash,

    /// Hash of the material signature
    pub material_hash: ZHash,

    /// Hashes of the boards since the last irreversible move
    pub history: ArrayVec<ZHash, HIST_SIZE>,
}

impl Position {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            hash: ZHash::from_board(&board),
            pawn_hash: ZHash::pawn_hash(&board),
            nonpawn_hashes: [
                ZHash::nonpawn_hash(&board, Color::White),
                ZHash::nonpawn_hash(&board, Color::Black),
            ],
            minor_hash: ZHash::minor_hash(&board),
            material_hash: ZHash::material_hash(&board),
            history: ArrayVec::new(),
        }
    }

    /// Has the current board occurred before in the game history?
    ///
    /// A single prior occurrence already scores as a draw in the search: if
    /// we can repeat once, nothing stops us from repeating twice.
    pub fn is_repetition(&self) -> bool {
        self.history
            .iter()
            .rev()
            // The opponent's last position can't equal ours; neither can any
            // position with the other side to move.
            .skip(1)
            .step_by(2)
            .any(|&historic| historic == self.hash)
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Playing moves
    //
    ////////////////////////////////////////////////////////////////////////////

    /// Play a move, updating the board and all hashes incrementally.
    pub fn play_move(&self, mv: Move) -> Self {
        use PieceType::*;

        debug_assert!(mv != Move::NULL);

        let us = self.board.current;
        let src = mv.src();
        let tgt = mv.tgt();

        let mut hash = self.hash;
        let mut pawn_hash = self.pawn_hash;
        let mut nonpawn_hashes = self.nonpawn_hashes;
        let mut minor_hash = self.minor_hash;
        let mut material_hash = self.material_hash;

        let piece = self.board.get_at(src).expect("move source holds a piece");
        let placed = mv.promo_piece(us).unwrap_or(piece);

        ////////////////////////////////////////////////////////////////////////
        //
        // Captured piece leaves every hash it's part of
        //
        ////////////////////////////////////////////////////////////////////////

        if mv.is_capture() {
            let victim_sq = mv.capture_sq(us);
            let victim = self
                .board
                .get_at(victim_sq)
                .expect("capture square holds a piece");

            hash.toggle_piece(victim, victim_sq);

            if victim.is_pawn() {
                pawn_hash.toggle_piece(victim, victim_sq);
            } else {
                nonpawn_hashes[!us].toggle_piece(victim, victim_sq);
            }

            if matches!(victim.piece_type(), Knight | Bishop | King) {
                minor_hash.toggle_piece(victim, victim_sq);
            }

            let count = self.board.pieces(victim.color(), victim.piece_type()).count() as usize;
            material_hash.toggle_material(victim, count);
            material_hash.toggle_material(victim, count - 1);
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // The moving piece leaves its source and lands (possibly promoted)
        // on the target
        //
        ////////////////////////////////////////////////////////////////////////

        hash.toggle_piece(piece, src);
        hash.toggle_piece(placed, tgt);

        if piece.is_pawn() {
            pawn_hash.toggle_piece(piece, src);
        } else {
            nonpawn_hashes[us].toggle_piece(piece, src);
        }

        if placed.is_pawn() {
            pawn_hash.toggle_piece(placed, tgt);
        } else {
            nonpawn_hashes[us].toggle_piece(placed, tgt);
        }

        if matches!(piece.piece_type(), Knight | Bishop | King) {
            minor_hash.toggle_piece(piece, src);
        }

        if matches!(placed.piece_type(), Knight | Bishop | King) {
            minor_hash.toggle_piece(placed, tgt);
        }

        // Promotions change the material signature on both sides of the trade
        if piece != placed {
            let count = self.board.pieces(us, piece.piece_type()).count() as usize;
            material_hash.toggle_material(piece, count);
            material_hash.toggle_material(piece, count - 1);

            let count = self.board.pieces(us, placed.piece_type()).count() as usize;
            material_hash.toggle_material(placed, count);
            material_hash.toggle_material(placed, count + 1);
        }

        // Castling drags the rook along
        if mv.is_castle() {
            let ctype = CastleType::from_move(mv).expect("castle move has a castle type");
            let (rook_src, rook_tgt) = ctype.rook_move();
            let rook = Piece::new(PieceType::Rook, us);

            hash.toggle_piece(rook, rook_src);
            hash.toggle_piece(rook, rook_tgt);
            nonpawn_hashes[us].toggle_piece(rook, rook_src);
            nonpawn_hashes[us].toggle_piece(rook, rook_tgt);
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Let the board apply the move, then reconcile the state-dependent
        // hash contributions (castling rights, en passant, side to move)
        //
        ////////////////////////////////////////////////////////////////////////

        let board = self.board.play_move(mv);

        if board.castling != self.board.castling {
            hash.toggle_castling(self.board.castling);
            hash.toggle_castling(board.castling);
        }

        if let Some(ep_sq) = self.board.en_passant {
            hash.toggle_ep(ep_sq);
        }

        if let Some(ep_sq) = board.en_passant {
            hash.toggle_ep(ep_sq);
        }

        hash.toggle_side();

        // An irreversible move resets the repetition horizon
        let mut history = if piece.is_pawn() || mv.is_capture() {
            ArrayVec::new()
        } else {
            self.history.clone()
        };

        if !history.is_full() && board.halfmoves > 0 {
            history.push(self.hash);
        }

        Self {
            board,
            hash,
            pawn_hash,
            nonpawn_hashes,
            minor_hash,
            material_hash,
            history,
        }
    }

    /// Pass the turn. Only the side, en-passant and clock state change.
    pub fn play_null_move(&self) -> Self {
        let board = self.board.play_null_move();
        let mut hash = self.hash;

        hash.toggle_side();

        if let Some(ep_sq) = self.board.en_passant {
            hash.toggle_ep(ep_sq);
        }

        Self {
            board,
            hash,
            pawn_hash: self.pawn_hash,
            nonpawn_hashes: self.nonpawn_hashes,
            minor_hash: self.minor_hash,
            material_hash: self.material_hash,
            // A null move is as irreversible as it gets: no line through it
            // can repeat a position from before it.
            history: ArrayVec::new(),
        }
    }

    /// Resolve and play a wire-format move.
    pub fn play_bare_move(&self, bare: BareMove) -> Option<Self> {
        self.board.find_move(bare).map(|mv| self.play_move(mv))
    }

    /// A cheap approximation of the hash after `mv`, used to prefetch the TT
    /// entry before actually playing the move. Castling-rights changes are
    /// ignored; a few misses are fine for a prefetch.
    pub fn approx_hash_after(&self, mv: Move) -> ZHash {
        let mut hash = self.hash;
        let us = self.board.current;

        hash.toggle_side();

        if let Some(piece) = self.board.get_at(mv.src()) {
            hash.toggle_piece(piece, mv.src());
            hash.toggle_piece(mv.promo_piece(us).unwrap_or(piece), mv.tgt());
        }

        if mv.is_capture() {
            let victim_sq = mv.capture_sq(us);

            if let Some(victim) = self.board.get_at(victim_sq) {
                hash.toggle_piece(victim, victim_sq);
            }
        }

        if let Some(ep_sq) = self.board.en_passant {
            hash.toggle_ep(ep_sq);
        }

        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_hashes_match_scratch(pos: &Position) {
        assert_eq!(pos.hash, ZHash::from_board(&pos.board), "main hash");
        assert_eq!(pos.pawn_hash, ZHash::pawn_hash(&pos.board), "pawn hash");
        assert_eq!(
            pos.nonpawn_hashes,
            [
                ZHash::nonpawn_hash(&pos.board, Color::White),
                ZHash::nonpawn_hash(&pos.board, Color::Black),
            ],
            "nonpawn hashes"
        );
        assert_eq!(pos.minor_hash, ZHash::minor_hash(&pos.board), "minor hash");
        assert_eq!(
            pos.material_hash,
            ZHash::material_hash(&pos.board),
            "material hash"
        );
    }

    /// Play every legal move in a handful of tricky positions and check that
    /// the incrementally updated hashes agree with hashing from scratch.
    #[test]
    fn incremental_hashing_matches_scratch() {
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "k7/8/8/3pP3/8/8/8/K7 w - d6 0 2",
        ];

        for fen in fens {
            let pos = Position::new(fen.parse().unwrap());

            for mv in pos.board.legal_moves() {
                let next = pos.play_move(mv);
                assert_hashes_match_scratch(&next);
            }
        }
    }

    #[test]
    fn null_move_hash_matches_scratch() {
        let pos = Position::new(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
                .parse()
                .unwrap(),
        );

        let next = pos.play_null_move();
        assert_eq!(next.hash, ZHash::from_board(&next.board));
    }

    #[test]
    fn repetitions_are_detected() {
        let mut pos = Position::new("3k4/8/8/8/8/8/8/3K3P w - - 0 1".parse().unwrap());

        for mv in ["d1e1", "d8e8", "e1d1", "e8d8"] {
            pos = pos.play_bare_move(mv.parse().unwrap()).unwrap();
        }

        assert!(pos.is_repetition());

        // A pawn push wipes the slate clean
        pos = pos.play_bare_move("h1h2".parse().unwrap()).unwrap();
        assert!(pos.history.is_empty());
        assert!(!pos.is_repetition());
    }

    #[test]
    fn same_square_different_route_is_a_repetition() {
        let mut pos = Position::new(Board::default());

        for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            pos = pos.play_bare_move(mv.parse().unwrap()).unwrap();
        }

        assert!(pos.is_repetition());
    }
}
