//! Zobrist hashing.
//!
//! Every position maps to a 64-bit key by XOR-ing together one random number
//! per (piece, square), plus numbers for the side to move, the castling
//! rights and the en-passant file. XOR being its own inverse is what makes
//! the hash incrementally updatable: playing a move toggles a handful of
//! numbers in and out.
//!
//! Beside the main key, the engine keeps a small family of partial keys
//! (pawns only, minor pieces, non-pawn material per side, material counts)
//! that the correction histories use as indices.
//!
//! The tables are generated at compile time from a splitmix64 stream, so
//! there is no runtime initialization to sequence.

use chess::board::Board;
use chess::castling::CastlingRights;
use chess::piece::Color;
use chess::piece::Piece;
use chess::piece::PieceType;
use chess::square::Square;

////////////////////////////////////////////////////////////////////////////////
//
// Table generation
//
////////////////////////////////////////////////////////////////////////////////

/// splitmix64: short, decent, and usable in const context.
const fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

const PIECE_KEYS: [[u64; Square::COUNT]; Piece::COUNT] = {
    let mut keys = [[0u64; Square::COUNT]; Piece::COUNT];
    let mut stream = 0xA76E_5D5C_1F1E_9C01u64;
    let mut piece = 0;

    while piece < Piece::COUNT {
        let mut sq = 0;

        while sq < Square::COUNT {
            stream = splitmix64(stream);
            keys[piece][sq] = stream;
            sq += 1;
        }

        piece += 1;
    }

    keys
};

const CASTLING_KEYS: [u64; 16] = {
    let mut keys = [0u64; 16];
    let mut stream = 0xC3A5_C85C_97CB_3127u64;
    let mut i = 1;

    // The no-rights state hashes to zero
    while i < 16 {
        stream = splitmix64(stream);
        keys[i] = stream;
        i += 1;
    }

    keys
};

const EP_FILE_KEYS: [u64; 8] = {
    let mut keys = [0u64; 8];
    let mut stream = 0xB492_B66F_BE98_F273u64;
    let mut i = 0;

    while i < 8 {
        stream = splitmix64(stream);
        keys[i] = stream;
        i += 1;
    }

    keys
};

const SIDE_KEY: u64 = splitmix64(0x9AE1_6A3B_2F90_404F);

/// Keys for material counting: one per (piece, count). Never more than ten
/// of one piece (eight pawns can promote, but then they stop being pawns).
const MATERIAL_KEYS: [[u64; 11]; Piece::COUNT] = {
    let mut keys = [[0u64; 11]; Piece::COUNT];
    let mut stream = 0xD1B5_4A32_D192_ED03u64;
    let mut piece = 0;

    while piece < Piece::COUNT {
        let mut count = 0;

        while count < 11 {
            stream = splitmix64(stream);
            keys[piece][count] = stream;
            count += 1;
        }

        piece += 1;
    }

    keys
};

////////////////////////////////////////////////////////////////////////////////
//
// ZHash
//
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct ZHash(pub u64);

impl ZHash {
    pub const NULL: Self = Self(0);

    /// Hash the full board state from scratch.
    pub fn from_board(board: &Board) -> Self {
        let mut hash = ZHash::NULL;

        for sq in Square::ALL {
            if let Some(piece) = board.get_at(sq) {
                hash.toggle_piece(piece, sq);
            }
        }

        if let Some(ep_sq) = board.en_passant {
            hash.toggle_ep(ep_sq);
        }

        hash.toggle_castling(board.castling);

        if !board.current.is_white() {
            hash.toggle_side();
        }

        hash
    }

    /// Hash only the pawn structure (used by the pawn correction history).
    pub fn pawn_hash(board: &Board) -> Self {
        let mut hash = ZHash::NULL;

        for side in [Color::White, Color::Black] {
            for sq in board.pieces(side, PieceType::Pawn) {
                hash.toggle_piece(Piece::new(PieceType::Pawn, side), sq);
            }
        }

        hash
    }

    /// Hash the non-pawn pieces of one side.
    pub fn nonpawn_hash(board: &Board, side: Color) -> Self {
        let mut hash = ZHash::NULL;

        for sq in board.occupied_by(side) {
            let piece = board.get_at(sq).unwrap();

            if !piece.is_pawn() {
                hash.toggle_piece(piece, sq);
            }
        }

        hash
    }

    /// Hash the minor pieces and kings of both sides.
    pub fn minor_hash(board: &Board) -> Self {
        use PieceType::*;

        let mut hash = ZHash::NULL;

        for sq in board.all_occupied() {
            let piece = board.get_at(sq).unwrap();

            if matches!(piece.piece_type(), Knight | Bishop | King) {
                hash.toggle_piece(piece, sq);
            }
        }

        hash
    }

    /// A key derived from the material signature alone.
    pub fn material_hash(board: &Board) -> Self {
        let mut hash = ZHash::NULL;

        for piece in Piece::ALL {
            let count = board.pieces(piece.color(), piece.piece_type()).count();
            hash.toggle_material(piece, count as usize);
        }

        hash
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // Incremental updates
    //
    ////////////////////////////////////////////////////////////////////////////

    pub fn toggle_piece(&mut self, piece: Piece, sq: Square) {
        self.0 ^= PIECE_KEYS[piece as usize][sq];
    }

    pub fn toggle_side(&mut self) {
        self.0 ^= SIDE_KEY;
    }

    pub fn toggle_castling(&mut self, rights: CastlingRights) {
        self.0 ^= CASTLING_KEYS[rights.0 as usize & 0xF];
    }

    pub fn toggle_ep(&mut self, ep_sq: Square) {
        self.0 ^= EP_FILE_KEYS[ep_sq.file()];
    }

    pub fn toggle_material(&mut self, piece: Piece, count: usize) {
        self.0 ^= MATERIAL_KEYS[piece as usize][count.min(10)];
    }
}

impl From<&Board> for ZHash {
    fn from(board: &Board) -> Self {
        ZHash::from_board(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_positions_hash_differently() {
        let startpos = Board::default();
        let e4: Board = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
            .parse()
            .unwrap();

        assert_ne!(ZHash::from_board(&startpos), ZHash::from_board(&e4));
    }

    #[test]
    fn toggles_are_involutions() {
        let board = Board::default();
        let original = ZHash::from_board(&board);
        let mut hash = original;

        hash.toggle_piece(Piece::WhiteKnight, Square::F3);
        hash.toggle_side();
        assert_ne!(hash, original);

        hash.toggle_side();
        hash.toggle_piece(Piece::WhiteKnight, Square::F3);
        assert_eq!(hash, original);
    }

    #[test]
    fn pawn_hash_ignores_piece_placement() {
        let a: Board = "rnbqkbnr/ppp1pppp/3p4/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
            .parse()
            .unwrap();
        let b: Board = "r1bqkbnr/ppp1pppp/2np4/8/2B1P3/8/PPPP1PPP/RNBQK1NR w KQkq - 2 3"
            .parse()
            .unwrap();

        assert_eq!(ZHash::pawn_hash(&a), ZHash::pawn_hash(&b));
        assert_ne!(ZHash::from_board(&a), ZHash::from_board(&b));
    }

    #[test]
    fn material_hash_tracks_counts_not_squares() {
        let a: Board = "4k3/8/8/8/3N4/8/8/4K3 w - - 0 1".parse().unwrap();
        let b: Board = "4k3/8/8/8/8/8/1N6/4K3 w - - 0 1".parse().unwrap();
        let c: Board = "4k3/8/8/8/8/8/1N2N3/4K3 w - - 0 1".parse().unwrap();

        assert_eq!(ZHash::material_hash(&a), ZHash::material_hash(&b));
        assert_ne!(ZHash::material_hash(&a), ZHash::material_hash(&c));
    }
}
