//! Messages flowing from the host (GUI) to the engine.

use crate::time_control::TimeControl;
use anyhow::anyhow;
use chess::board::Board;
use chess::moves::BareMove;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub enum UciClientMessage {
    Uci,
    Debug(bool),
    IsReady,
    SetOption(String, String),
    UciNewGame,
    Position(Box<Board>, Vec<BareMove>),
    Go(Go),
    Stop,
    PonderHit,
    Quit,
}

/// Everything a `go` command can carry besides the bare time control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Go {
    pub tc: TimeControl,

    /// Start in ponder mode: search on the opponent's time, never stop on our
    /// own initiative until `ponderhit` or `stop` arrives.
    pub ponder: bool,

    /// Restrict the root to these moves only
    pub search_moves: Vec<BareMove>,

    /// `go perft N`: not a search at all, but a movegen node count
    pub perft: Option<usize>,
}

impl Go {
    pub fn infinite() -> Self {
        Self {
            tc: TimeControl::Infinite,
            ponder: false,
            search_moves: Vec::new(),
            perft: None,
        }
    }
}

impl FromStr for Go {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut go = Go::infinite();
        let mut tc_parts: Vec<&str> = Vec::new();
        let mut parts = s.split_whitespace();

        while let Some(part) = parts.next() {
            match part {
                "ponder" => go.ponder = true,

                "perft" => {
                    let depth = parts
                        .next()
                        .and_then(|value| value.parse().ok())
                        .ok_or(anyhow!("Missing depth for 'go perft'"))?;

                    go.perft = Some(depth);
                }

                // Per the protocol, searchmoves eats the rest of the line
                "searchmoves" => {
                    for mv in parts.by_ref() {
                        go.search_moves.push(mv.parse()?);
                    }
                }

                tc_part => tc_parts.push(tc_part),
            }
        }

        if !tc_parts.is_empty() {
            go.tc = tc_parts.join(" ").parse()?;
        }

        Ok(go)
    }
}

impl Display for Go {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(depth) = self.perft {
            return write!(f, "perft {depth}");
        }

        write!(f, "{}", self.tc)?;

        if self.ponder {
            write!(f, " ponder")?;
        }

        if !self.search_moves.is_empty() {
            write!(f, " searchmoves")?;
            for mv in &self.search_moves {
                write!(f, " {mv}")?;
            }
        }

        Ok(())
    }
}

impl Display for UciClientMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use UciClientMessage::*;

        match self {
            Uci => write!(f, "uci"),
            Debug(flag) => write!(f, "debug {}", if *flag { "on" } else { "off" }),
            IsReady => write!(f, "isready"),
            SetOption(name, value) => write!(f, "setoption name {name} value {value}"),
            UciNewGame => write!(f, "ucinewgame"),

            Position(board, moves) => {
                write!(f, "position fen {}", board.to_fen())?;

                if !moves.is_empty() {
                    write!(f, " moves")?;
                    for mv in moves {
                        write!(f, " {mv}")?;
                    }
                }

                Ok(())
            }

            Go(go) => write!(f, "go {go}"),
            Stop => write!(f, "stop"),
            PonderHit => write!(f, "ponderhit"),
            Quit => write!(f, "quit"),
        }
    }
}

impl FromStr for UciClientMessage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        use UciClientMessage::*;

        let s = s.trim();
        let (msg, rest) = s.split_once(' ').unwrap_or((s, ""));

        match msg {
            "uci" => Ok(Uci),
            "isready" => Ok(IsReady),
            "ucinewgame" => Ok(UciNewGame),
            "stop" => Ok(Stop),
            "ponderhit" => Ok(PonderHit),
            "quit" => Ok(Quit),

            "debug" => match rest.split_whitespace().next() {
                Some("on") => Ok(Debug(true)),
                Some("off") => Ok(Debug(false)),
                _ => Err(anyhow!("Invalid debug flag: {rest}")),
            },

            "setoption" => {
                let rest = rest
                    .strip_prefix("name")
                    .ok_or(anyhow!("Malformed setoption: {s}"))?
                    .trim_start();

                // Option names may contain spaces, so split on the "value"
                // keyword rather than whitespace.
                let (name, value) = match rest.split_once(" value ") {
                    Some((name, value)) => (name.trim(), value.trim()),
                    None => (rest.trim(), ""),
                };

                if name.is_empty() {
                    return Err(anyhow!("Malformed setoption: {s}"));
                }

                Ok(SetOption(name.to_string(), value.to_string()))
            }

            "position" => {
                let tokens: Vec<&str> = rest.split_whitespace().collect();

                // The move list is optional, and everything between the
                // position type and the "moves" keyword belongs to the FEN.
                let moves_idx = tokens
                    .iter()
                    .position(|&token| token == "moves")
                    .unwrap_or(tokens.len());

                let board: Board = match tokens.first() {
                    Some(&"startpos") => Board::default(),
                    Some(&"fen") => tokens[1..moves_idx].join(" ").parse()?,
                    _ => return Err(anyhow!("Invalid position command: {s}")),
                };

                let mut moves = Vec::new();

                for &token in tokens.iter().skip(moves_idx + 1) {
                    moves.push(token.parse()?);
                }

                Ok(Position(Box::new(board), moves))
            }

            "go" => Ok(Go(rest.parse()?)),

            _ => Err(anyhow!("Unknown UCI command: {msg}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert!(matches!("uci".parse().unwrap(), UciClientMessage::Uci));
        assert!(matches!("isready".parse().unwrap(), UciClientMessage::IsReady));
        assert!(matches!("stop".parse().unwrap(), UciClientMessage::Stop));
        assert!(matches!("ponderhit".parse().unwrap(), UciClientMessage::PonderHit));
        assert!(matches!("quit\n".trim().parse().unwrap(), UciClientMessage::Quit));
    }

    #[test]
    fn setoption_with_spaces_in_name() {
        let msg: UciClientMessage = "setoption name Move Overhead value 30".parse().unwrap();

        let UciClientMessage::SetOption(name, value) = msg else {
            panic!("expected SetOption");
        };

        assert_eq!(name, "Move Overhead");
        assert_eq!(value, "30");
    }

    #[test]
    fn setoption_button_has_no_value() {
        let msg: UciClientMessage = "setoption name Clear Hash".parse().unwrap();

        let UciClientMessage::SetOption(name, value) = msg else {
            panic!("expected SetOption");
        };

        assert_eq!(name, "Clear Hash");
        assert_eq!(value, "");
    }

    #[test]
    fn position_startpos_with_moves() {
        let msg: UciClientMessage = "position startpos moves e2e4 e7e5".parse().unwrap();

        let UciClientMessage::Position(board, moves) = msg else {
            panic!("expected Position");
        };

        assert_eq!(*board, Board::default());
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].to_string(), "e2e4");
    }

    #[test]
    fn position_fen_with_moves() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let msg: UciClientMessage = format!("position fen {fen} moves e2a6").parse().unwrap();

        let UciClientMessage::Position(board, moves) = msg else {
            panic!("expected Position");
        };

        assert_eq!(board.to_fen(), fen);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn go_with_everything() {
        let go: Go = "wtime 1000 btime 2000 ponder searchmoves e2e4 d2d4".parse().unwrap();

        assert!(go.ponder);
        assert_eq!(go.search_moves.len(), 2);
        assert!(matches!(go.tc, TimeControl::Clock { .. }));
    }

    #[test]
    fn go_perft() {
        let go: Go = "perft 5".parse().unwrap();
        assert_eq!(go.perft, Some(5));
    }

    #[test]
    fn bare_go_is_infinite() {
        let go: Go = "".parse().unwrap();
        assert_eq!(go.tc, TimeControl::Infinite);
        assert!(!go.ponder);
    }
}
