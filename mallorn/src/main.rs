use chess::board::Board;
use clap::Parser;
use clap::Subcommand;

mod bench;
mod uci;

#[derive(Parser)]
#[command(name = "mallorn", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the fixed benchmark suite and report node counts
    Bench {
        /// Search depth per position
        #[arg(short, long, default_value_t = 10)]
        depth: usize,
    },

    /// Count leaf nodes of the move generator
    Perft {
        /// Search depth
        depth: usize,

        /// Position to run from (defaults to the initial position)
        #[arg(short, long)]
        fen: Option<String>,

        /// Run the standard validation suite instead of a single position
        #[arg(short, long)]
        suite: bool,
    },
}

fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Some(Command::Bench { depth }) => bench::run(depth),

        Some(Command::Perft { depth, fen, suite }) => {
            if suite {
                bench::perft_suite();
            } else {
                let board: Board = match fen {
                    Some(fen) => fen.parse()?,
                    None => Board::default(),
                };

                bench::perft_divide(&board, depth);
            }
        }

        // No subcommand: speak UCI on stdio
        None => uci::UciController::new().run()?,
    }

    Ok(())
}
