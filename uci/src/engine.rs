//! Messages flowing from the engine back to the host.

use crate::options::UciOption;
use crate::search_info::SearchInfo;
use chess::moves::Move;
use colored::Colorize;
use std::fmt::Display;
use std::io::IsTerminal;

#[derive(Debug, Clone)]
pub enum UciEngineMessage {
    Id(IdType),
    UciOk,
    ReadyOk,
    BestMove {
        mv: Move,
        ponder: Option<Move>,
    },
    Info(SearchInfo),
    UciOption(UciOption),

    /// Free-form diagnostics; the designated channel for recoverable errors
    InfoString(String),
}

impl Display for UciEngineMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use UciEngineMessage::*;

        // Tone down the protocol scaffolding when a human is watching
        if std::io::stdout().is_terminal() {
            match self {
                Id(id) => write!(f, "{}", format!("id {id}").bright_black()),
                UciOk => write!(f, "{}", "uciok".bright_black()),
                ReadyOk => write!(f, "{}", "readyok".bright_black()),
                UciOption(option) => {
                    write!(f, "{} {option}", "option".bright_black())
                }

                BestMove { mv, ponder } => {
                    write!(f, "{} {}", "bestmove".bright_black(), mv.to_string().italic())?;

                    if let Some(ponder) = ponder {
                        write!(f, " {} {ponder}", "ponder".bright_black())?;
                    }

                    Ok(())
                }

                Info(info) => write!(f, "info {info}"),
                InfoString(text) => write!(f, "info string {text}"),
            }
        } else {
            match self {
                Id(id) => write!(f, "id {id}"),
                UciOk => write!(f, "uciok"),
                ReadyOk => write!(f, "readyok"),
                UciOption(option) => write!(f, "option {option}"),

                BestMove { mv, ponder } => {
                    write!(f, "bestmove {mv}")?;

                    if let Some(ponder) = ponder {
                        write!(f, " ponder {ponder}")?;
                    }

                    Ok(())
                }

                Info(info) => write!(f, "info {info}"),
                InfoString(text) => write!(f, "info string {text}"),
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// Identification
//
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub enum IdType {
    Name(String),
    Author(String),
}

impl Display for IdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdType::Name(name) => write!(f, "name {name}"),
            IdType::Author(author) => write!(f, "author {author}"),
        }
    }
}
