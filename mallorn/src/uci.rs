//! Mallorn's UCI front-end.
//!
//! Two threads: this one reads stdin and parses commands; a dedicated
//! engine thread owns the search pool (and with it the transposition table
//! and learning book) and runs searches to completion. The only things
//! crossing back from a running search to the input thread are the shared
//! stop/ponder flags inside the `TimeControlHandle`, which is what keeps
//! `stop` and `ponderhit` responsive while every worker is busy.

use anyhow::anyhow;
use chess::board::Board;
use chess::moves::Move;
use engine::learning::default_book_path;
use engine::learning::LearningBook;
use engine::learning::LearningMode;
use engine::mcts::MctsParams;
use engine::pool::MctsConfig;
use engine::pool::SearchPool;
use engine::position::Position;
use engine::search::SearchSettings;
use engine::style::BiasProvider;
use engine::style::PositionStyle;
use engine::style::StyleBias;
use engine::time_control::TimeControlHandle;
use engine::time_control::TimeController;
use engine::transpositions::TTable;
use std::io::BufRead;
use std::io::Write;
use std::sync::mpsc;
use std::time::Duration;
use uci::client::Go;
use uci::client::UciClientMessage;
use uci::engine::IdType;
use uci::engine::UciEngineMessage;
use uci::options::OptionType;
use uci::options::UciOption;

const NAME: &str = "Mallorn";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHOR: &str = "the Mallorn developers";

const UCI_OPTIONS: [UciOption; 17] = [
    UciOption {
        name: "Hash",
        option_type: OptionType::Spin { min: 1, max: 1_048_576, default: 16 },
    },
    UciOption {
        name: "Threads",
        option_type: OptionType::Spin { min: 1, max: 1024, default: 1 },
    },
    UciOption {
        name: "MultiPV",
        option_type: OptionType::Spin { min: 1, max: 500, default: 1 },
    },
    UciOption {
        name: "Ponder",
        option_type: OptionType::Check { default: false },
    },
    UciOption {
        name: "Move Overhead",
        option_type: OptionType::Spin { min: 0, max: 5000, default: 10 },
    },
    UciOption {
        name: "Clear Hash",
        option_type: OptionType::Button,
    },
    UciOption {
        name: "UCI_Chess960",
        option_type: OptionType::Check { default: false },
    },
    UciOption {
        name: "UCI_ShowWDL",
        option_type: OptionType::Check { default: false },
    },
    UciOption {
        name: "UCI_LimitStrength",
        option_type: OptionType::Check { default: false },
    },
    UciOption {
        name: "UCI_Elo",
        option_type: OptionType::Spin { min: 1500, max: 2800, default: 2800 },
    },
    UciOption {
        name: "SyzygyPath",
        option_type: OptionType::Text { default: "" },
    },
    UciOption {
        name: "SyzygyProbeDepth",
        option_type: OptionType::Spin { min: 1, max: 100, default: 1 },
    },
    UciOption {
        name: "SyzygyProbeLimit",
        option_type: OptionType::Spin { min: 0, max: 7, default: 7 },
    },
    UciOption {
        name: "MCTS",
        option_type: OptionType::Check { default: false },
    },
    UciOption {
        name: "MCTSThreads",
        option_type: OptionType::Spin { min: 1, max: 512, default: 1 },
    },
    UciOption {
        name: "Persisted Learning",
        option_type: OptionType::Combo {
            default: "Off",
            values: &["Off", "Standard", "Self"],
        },
    },
    UciOption {
        name: "Read only learning",
        option_type: OptionType::Check { default: false },
    },
];

/// Extra options that don't fit the const table (styles, MCTS tuning).
fn extra_options() -> Vec<UciOption> {
    vec![
        UciOption {
            name: "Style",
            option_type: OptionType::Combo {
                default: "Balanced",
                values: &["Balanced", "Aggressive", "Positional", "Defensive"],
            },
        },
        UciOption {
            name: "MCTS Multi Strategy",
            option_type: OptionType::Spin { min: 0, max: 100, default: 20 },
        },
        UciOption {
            name: "MCTS Multi MinVisits",
            option_type: OptionType::Spin { min: 0, max: 1000, default: 5 },
        },
    ]
}

////////////////////////////////////////////////////////////////////////////////
//
// Option state
//
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
struct EngineOptions {
    threads: usize,
    multipv: usize,
    ponder: bool,
    move_overhead: Duration,
    chess960: bool,
    show_wdl: bool,
    limit_strength: bool,
    elo: u32,
    style: PositionStyle,
    syzygy_path: String,
    syzygy_probe_depth: i32,
    syzygy_probe_limit: i32,
    mcts: bool,
    mcts_threads: usize,
    mcts_multi_strategy: i32,
    mcts_min_visits: u64,
    learning: LearningMode,
    learning_read_only: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            multipv: 1,
            ponder: false,
            move_overhead: Duration::from_millis(10),
            chess960: false,
            show_wdl: false,
            limit_strength: false,
            elo: 2800,
            style: PositionStyle::default(),
            syzygy_path: String::new(),
            syzygy_probe_depth: 1,
            syzygy_probe_limit: 7,
            mcts: false,
            mcts_threads: 1,
            mcts_multi_strategy: 20,
            mcts_min_visits: 5,
            learning: LearningMode::Off,
            learning_read_only: false,
        }
    }
}

impl EngineOptions {
    fn settings(&self, search_moves: Vec<Move>) -> SearchSettings {
        let mut style = StyleBias::from_provider(&self.style as &dyn BiasProvider);

        if self.limit_strength {
            style = style.with_elo_limit(self.elo);
        }

        SearchSettings {
            multipv: self.multipv,
            show_wdl: self.show_wdl,
            style,
            search_moves,
        }
    }

    fn mcts_config(&self) -> MctsConfig {
        MctsConfig {
            enabled: self.mcts,
            threads: self.mcts_threads,
            params: MctsParams {
                multi_strategy: self.mcts_multi_strategy,
                multi_min_visits: self.mcts_min_visits,
                ..MctsParams::default()
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// The controller
//
////////////////////////////////////////////////////////////////////////////////

pub struct UciController {
    position: Position,
    options: EngineOptions,
    engine: EngineThread,
    tc_handle: Option<TimeControlHandle>,
}

impl UciController {
    pub fn new() -> Self {
        Self {
            position: Position::new(Board::default()),
            options: EngineOptions::default(),
            engine: EngineThread::spawn(),
            tc_handle: None,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let stdin = std::io::stdin().lock();

        for line in stdin.lines() {
            let line = line?;
            let input = line.trim();

            if input.is_empty() {
                continue;
            }

            match input.parse::<UciClientMessage>() {
                Ok(command) => {
                    if !self.dispatch(command)? {
                        break;
                    }
                }

                // Protocol misuse is diagnosed once and otherwise ignored
                Err(err) => {
                    println!("{}", UciEngineMessage::InfoString(err.to_string()));
                }
            }

            std::io::stdout().flush()?;
        }

        Ok(())
    }

    /// Handle one command; returns false when it's time to quit.
    fn dispatch(&mut self, command: UciClientMessage) -> anyhow::Result<bool> {
        use UciClientMessage as Cmd;

        match command {
            Cmd::Uci => {
                println!("{}", UciEngineMessage::Id(IdType::Name(format!("{NAME} {VERSION}"))));
                println!("{}", UciEngineMessage::Id(IdType::Author(AUTHOR.to_string())));

                for option in UCI_OPTIONS {
                    println!("{}", UciEngineMessage::UciOption(option));
                }

                for option in extra_options() {
                    println!("{}", UciEngineMessage::UciOption(option));
                }

                println!("{}", UciEngineMessage::UciOk);
            }

            Cmd::IsReady => {
                // Engine-side initialization is synchronous with commands,
                // so by the time we read this, anything pending is done.
                println!("{}", UciEngineMessage::ReadyOk);
            }

            Cmd::Debug(flag) => {
                if flag {
                    eprintln!(
                        "config: threads={} ponder={} chess960={} syzygy='{}' \
                         (probe depth {}, limit {})",
                        self.options.threads,
                        self.options.ponder,
                        self.options.chess960,
                        self.options.syzygy_path,
                        self.options.syzygy_probe_depth,
                        self.options.syzygy_probe_limit,
                    );
                }
            }

            Cmd::SetOption(name, value) => {
                // A bad option value is a diagnostic, never a shutdown
                if let Err(err) = self.set_option(&name, &value) {
                    println!("{}", UciEngineMessage::InfoString(err.to_string()));
                }
            }

            Cmd::UciNewGame => {
                self.position = Position::new(Board::default());
                self.tc_handle = None;
                self.engine.send(EngineCommand::NewGame);
            }

            Cmd::Position(board, moves) => {
                let mut position = Position::new(*board);
                let mut rejected = None;

                for bare in moves {
                    match position.play_bare_move(bare) {
                        Some(next) => position = next,
                        None => {
                            rejected = Some(bare);
                            break;
                        }
                    }
                }

                // An illegal move leaves the engine in its previous state
                if let Some(bare) = rejected {
                    println!(
                        "{}",
                        UciEngineMessage::InfoString(format!("Illegal move: {bare}"))
                    );
                } else {
                    self.position = position;
                }
            }

            Cmd::Go(go) => self.go(go),

            Cmd::Stop => {
                if let Some(handle) = &self.tc_handle {
                    handle.stop();
                }
            }

            Cmd::PonderHit => {
                if let Some(handle) = &self.tc_handle {
                    handle.ponderhit();
                }
            }

            Cmd::Quit => {
                // Unblock any search still running, or the engine thread
                // would never get to the quit command.
                if let Some(handle) = &self.tc_handle {
                    handle.stop();
                }

                self.engine.send(EngineCommand::Quit);
                self.engine.wait();
                return Ok(false);
            }
        }

        Ok(true)
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // go
    //
    ////////////////////////////////////////////////////////////////////////////

    fn go(&mut self, go: Go) {
        // `go perft N` is a movegen count, not a search
        if let Some(depth) = go.perft {
            self.engine
                .send(EngineCommand::Perft(self.position.clone(), depth));
            return;
        }

        let (tc, handle) = TimeController::new(
            go.tc,
            self.position.board.current,
            go.ponder,
            self.options.move_overhead,
        );

        self.tc_handle = Some(handle);

        // Resolve the searchmoves restriction against the actual position;
        // unknown moves are diagnosed and dropped.
        let mut search_moves = Vec::new();

        for bare in &go.search_moves {
            match self.position.board.find_move(*bare) {
                Some(mv) => search_moves.push(mv),
                None => println!(
                    "{}",
                    UciEngineMessage::InfoString(format!("Ignoring illegal searchmove: {bare}"))
                ),
            }
        }

        self.engine.send(EngineCommand::Search {
            position: self.position.clone(),
            tc,
            settings: self.options.settings(search_moves),
            mcts: self.options.mcts_config(),
        });
    }

    ////////////////////////////////////////////////////////////////////////////
    //
    // setoption
    //
    ////////////////////////////////////////////////////////////////////////////

    fn set_option(&mut self, name: &str, value: &str) -> anyhow::Result<()> {
        match name {
            "Hash" => {
                let mb = value.parse()?;
                self.engine.send(EngineCommand::ResizeTT(mb));
            }

            "Threads" => {
                self.options.threads = value.parse()?;
                self.engine
                    .send(EngineCommand::SetThreads(self.options.threads));
            }

            "MultiPV" => self.options.multipv = value.parse::<usize>()?.clamp(1, 500),
            "Ponder" => self.options.ponder = parse_check(value)?,

            "Move Overhead" => {
                self.options.move_overhead = Duration::from_millis(value.parse()?);
            }

            "Clear Hash" => self.engine.send(EngineCommand::ClearTT),

            "UCI_Chess960" => self.options.chess960 = parse_check(value)?,
            "UCI_ShowWDL" => self.options.show_wdl = parse_check(value)?,
            "UCI_LimitStrength" => self.options.limit_strength = parse_check(value)?,
            "UCI_Elo" => self.options.elo = value.parse()?,

            "Style" => {
                self.options.style = value.parse().map_err(|err: String| anyhow!(err))?;
            }

            "SyzygyPath" => {
                self.options.syzygy_path = value.to_string();

                // No probing backend is linked in: announce it once and run
                // as if the tablebases weren't there (which they aren't).
                if !value.is_empty() && value != "<empty>" {
                    println!(
                        "{}",
                        UciEngineMessage::InfoString(
                            "no tablebase backend available; continuing without".to_string()
                        )
                    );
                }
            }

            "SyzygyProbeDepth" => self.options.syzygy_probe_depth = value.parse()?,
            "SyzygyProbeLimit" => self.options.syzygy_probe_limit = value.parse()?,

            "MCTS" => {
                self.options.mcts = parse_check(value)?;
                self.engine
                    .send(EngineCommand::EnableMcts(self.options.mcts));
            }

            "MCTSThreads" => self.options.mcts_threads = value.parse()?,
            "MCTS Multi Strategy" => self.options.mcts_multi_strategy = value.parse()?,
            "MCTS Multi MinVisits" => self.options.mcts_min_visits = value.parse()?,

            "Persisted Learning" => {
                self.options.learning = value.parse().map_err(|err: String| anyhow!(err))?;
                self.engine.send(EngineCommand::SetLearning(
                    self.options.learning,
                    self.options.learning_read_only,
                ));
            }

            "Read only learning" => {
                self.options.learning_read_only = parse_check(value)?;
                self.engine.send(EngineCommand::SetLearning(
                    self.options.learning,
                    self.options.learning_read_only,
                ));
            }

            _ => println!(
                "{}",
                UciEngineMessage::InfoString(format!("Unknown option: {name}"))
            ),
        }

        Ok(())
    }
}

fn parse_check(value: &str) -> anyhow::Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(anyhow!("Expected 'true' or 'false', got '{value}'")),
    }
}

////////////////////////////////////////////////////////////////////////////////
//
// The engine thread
//
////////////////////////////////////////////////////////////////////////////////

enum EngineCommand {
    Search {
        position: Position,
        tc: TimeController,
        settings: SearchSettings,
        mcts: MctsConfig,
    },
    Perft(Position, usize),
    ResizeTT(usize),
    ClearTT,
    SetThreads(usize),
    EnableMcts(bool),
    SetLearning(LearningMode, bool),
    NewGame,
    Quit,
}

struct EngineThread {
    tx: mpsc::Sender<EngineCommand>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl EngineThread {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<EngineCommand>();

        let handle = std::thread::spawn(move || {
            let mut pool = SearchPool::new(TTable::DEFAULT_SIZE_MB, 1);
            let mut learning =
                LearningBook::open(default_book_path(), LearningMode::Off, false);

            for command in rx {
                match command {
                    EngineCommand::Search { position, tc, settings, mcts } => {
                        let outcome = pool.search(
                            &position,
                            &tc,
                            &settings,
                            &mcts,
                            Some(&learning),
                        );

                        learning.record(
                            position.hash,
                            outcome.best_move,
                            outcome.depth,
                            outcome.score,
                        );

                        // In ponder mode, hold the answer until the GUI
                        // resolves the ponder with a hit or a stop.
                        while tc.pondering() && !tc.stopped() {
                            std::thread::sleep(Duration::from_millis(1));
                        }

                        println!(
                            "{}",
                            UciEngineMessage::BestMove {
                                mv: outcome.best_move,
                                ponder: outcome.ponder,
                            }
                        );

                        let _ = std::io::stdout().flush();
                    }

                    EngineCommand::Perft(position, depth) => {
                        crate::bench::perft_divide(&position.board, depth);
                        let _ = std::io::stdout().flush();
                    }

                    EngineCommand::ResizeTT(mb) => pool.resize_tt(mb),
                    EngineCommand::ClearTT => pool.clear(),
                    EngineCommand::SetThreads(n) => pool.set_threads(n),
                    EngineCommand::EnableMcts(enabled) => pool.enable_mcts(enabled),

                    EngineCommand::SetLearning(mode, read_only) => {
                        learning.finish_game();
                        learning = LearningBook::open(default_book_path(), mode, read_only);
                    }

                    EngineCommand::NewGame => {
                        learning.finish_game();
                        pool.clear();
                    }

                    EngineCommand::Quit => {
                        learning.finish_game();
                        break;
                    }
                }
            }
        });

        Self { tx, handle: Some(handle) }
    }

    fn send(&self, command: EngineCommand) {
        // A dead engine thread means we're shutting down anyway
        let _ = self.tx.send(command);
    }

    fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
