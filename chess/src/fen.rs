//! FEN parsing and serialization.

use crate::board::Board;
use crate::piece::Piece;
use crate::square::Square;
use anyhow::anyhow;
use std::str::FromStr;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Default for Board {
    fn default() -> Self {
        START_FEN.parse().expect("the initial position is valid")
    }
}

impl FromStr for Board {
    type Err = anyhow::Error;

    fn from_str(fen: &str) -> anyhow::Result<Self> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(anyhow!("Empty FEN"))?;

        let mut board = Board::EMPTY;

        ////////////////////////////////////////////////////////////////////////
        //
        // Piece placement, ranks come in from the 8th down
        //
        ////////////////////////////////////////////////////////////////////////

        let ranks: Vec<_> = placement.split('/').collect();

        if ranks.len() != 8 {
            return Err(anyhow!("Invalid FEN: {fen}"));
        }

        for (i, entries) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file: usize = 0;

            for ch in entries.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file += skip as usize;
                    continue;
                }

                if file >= 8 {
                    return Err(anyhow!("Invalid FEN: {fen}"));
                }

                let piece: Piece = ch.to_string().parse()?;
                board.add_at(Square::new(8 * rank + file), piece);
                file += 1;
            }

            if file != 8 {
                return Err(anyhow!("Invalid FEN: {fen}"));
            }
        }

        ////////////////////////////////////////////////////////////////////////
        //
        // Remaining fields; clocks default when the FEN is truncated, as
        // many GUIs like to send them
        //
        ////////////////////////////////////////////////////////////////////////

        board.current = fields.next().unwrap_or("w").parse()?;
        board.castling = fields.next().unwrap_or("-").parse()?;

        board.en_passant = match fields.next().unwrap_or("-") {
            "-" => None,
            sq => Some(sq.parse()?),
        };

        board.halfmoves = fields.next().unwrap_or("0").parse()?;
        board.fullmoves = fields.next().unwrap_or("1").parse()?;

        Ok(board)
    }
}

impl Board {
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty = 0;

            for file in 0..8 {
                match self.get_at(Square::new(8 * rank + file)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push_str(&piece.to_string());
                    }
                    None => empty += 1,
                }
            }

            if empty > 0 {
                fen.push_str(&empty.to_string());
            }

            if rank > 0 {
                fen.push('/');
            }
        }

        let ep = match self.en_passant {
            Some(sq) => sq.to_string(),
            None => "-".to_string(),
        };

        format!(
            "{fen} {} {} {ep} {} {}",
            self.current, self.castling, self.halfmoves, self.fullmoves
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Color;

    const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn startpos_roundtrips() {
        let board: Board = START_FEN.parse().unwrap();
        assert_eq!(board.to_fen(), START_FEN);
    }

    #[test]
    fn kiwipete_roundtrips() {
        let board: Board = KIWIPETE.parse().unwrap();
        assert_eq!(board.to_fen(), KIWIPETE);
        assert_eq!(board.current, Color::White);
        assert_eq!(board.all_occupied().count(), 32);
    }

    #[test]
    fn en_passant_field() {
        let board: Board = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
            .parse()
            .unwrap();
        assert_eq!(board.en_passant, Some(Square::E3));
    }

    #[test]
    fn truncated_fen_gets_default_clocks() {
        let board: Board = "8/8/8/8/8/8/8/K6k w - -".parse().unwrap();
        assert_eq!(board.halfmoves, 0);
        assert_eq!(board.fullmoves, 1);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("not a fen".parse::<Board>().is_err());
        assert!("8/8/8/8/8/8/8 w - - 0 1".parse::<Board>().is_err());
        assert!("9/8/8/8/8/8/8/8 w - - 0 1".parse::<Board>().is_err());
    }
}
