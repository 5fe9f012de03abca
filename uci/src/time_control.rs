//! The time-related constraints a `go` command can place on a search.

use anyhow::anyhow;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// What the host asked the search to respect: a depth, a node count, a fixed
/// time slice, or an actual chess clock to budget for ourselves.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimeControl {
    /// Keep going until an explicit `stop`
    Infinite,

    /// Search to a fixed nominal depth
    Depth(usize),

    /// Search a fixed number of nodes
    Nodes(u64),

    /// Search until a mate within the given number of moves is found
    Mate(usize),

    /// Search for a fixed amount of wall-clock time
    FixedTime(Duration),

    /// A real clock; the engine carves out its own budget
    Clock {
        wtime: Duration,
        btime: Duration,
        winc: Option<Duration>,
        binc: Option<Duration>,
        movestogo: Option<u32>,
    },
}

impl Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TimeControl::*;

        match self {
            Infinite => write!(f, "infinite"),
            Depth(n) => write!(f, "depth {n}"),
            Nodes(n) => write!(f, "nodes {n}"),
            Mate(n) => write!(f, "mate {n}"),
            FixedTime(time) => write!(f, "movetime {}", time.as_millis()),

            Clock { wtime, btime, winc, binc, movestogo } => {
                write!(f, "wtime {} btime {}", wtime.as_millis(), btime.as_millis())?;

                if let Some(winc) = winc {
                    write!(f, " winc {}", winc.as_millis())?;
                }

                if let Some(binc) = binc {
                    write!(f, " binc {}", binc.as_millis())?;
                }

                if let Some(movestogo) = movestogo {
                    write!(f, " movestogo {movestogo}")?;
                }

                Ok(())
            }
        }
    }
}

impl FromStr for TimeControl {
    type Err = anyhow::Error;

    /// Parse the time-control portion of a `go` command.
    ///
    /// The protocol allows the clock fields in any order, so we sweep up all
    /// the key-value pairs first and decide what they amount to afterwards.
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut wtime = None;
        let mut btime = None;
        let mut winc = None;
        let mut binc = None;
        let mut movestogo = None;

        let mut parts = s.split_whitespace().peekable();

        if parts.peek().is_none() {
            return Ok(TimeControl::Infinite);
        }

        while let Some(key) = parts.next() {
            match key {
                "infinite" => return Ok(TimeControl::Infinite),

                "depth" => return Ok(TimeControl::Depth(next_number(&mut parts, key)?)),

                "nodes" => return Ok(TimeControl::Nodes(next_number(&mut parts, key)?)),

                "mate" => return Ok(TimeControl::Mate(next_number(&mut parts, key)?)),

                "movetime" => {
                    let millis: u64 = next_number(&mut parts, key)?;
                    return Ok(TimeControl::FixedTime(Duration::from_millis(millis)));
                }

                "wtime" => wtime = Some(next_millis(&mut parts, key)?),
                "btime" => btime = Some(next_millis(&mut parts, key)?),
                "winc" => winc = Some(next_millis(&mut parts, key)?),
                "binc" => binc = Some(next_millis(&mut parts, key)?),
                "movestogo" => movestogo = Some(next_number(&mut parts, key)?),

                _ => return Err(anyhow!("Invalid time control: {s}")),
            }
        }

        match (wtime, btime) {
            (Some(wtime), Some(btime)) => Ok(TimeControl::Clock {
                wtime,
                btime,
                winc,
                binc,
                movestogo,
            }),

            _ => Err(anyhow!("Invalid time control: {s}")),
        }
    }
}

fn next_number<'a, T, I>(parts: &mut I, key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    I: Iterator<Item = &'a str>,
{
    parts
        .next()
        .and_then(|value| value.parse().ok())
        .ok_or(anyhow!("Missing value for '{key}'"))
}

fn next_millis<'a, I>(parts: &mut I, key: &str) -> anyhow::Result<Duration>
where
    I: Iterator<Item = &'a str>,
{
    // Some hosts report negative clocks when a side has flagged; clamp
    // rather than error out mid-game.
    let millis: i64 = next_number(parts, key)?;
    Ok(Duration::from_millis(millis.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_controls() {
        assert_eq!("infinite".parse::<TimeControl>().unwrap(), TimeControl::Infinite);
        assert_eq!("depth 12".parse::<TimeControl>().unwrap(), TimeControl::Depth(12));
        assert_eq!("nodes 50000".parse::<TimeControl>().unwrap(), TimeControl::Nodes(50000));
        assert_eq!("mate 3".parse::<TimeControl>().unwrap(), TimeControl::Mate(3));
        assert_eq!(
            "movetime 2500".parse::<TimeControl>().unwrap(),
            TimeControl::FixedTime(Duration::from_millis(2500))
        );
    }

    #[test]
    fn clock_fields_in_any_order() {
        let tc: TimeControl = "winc 100 wtime 60000 btime 50000 binc 200 movestogo 30"
            .parse()
            .unwrap();

        assert_eq!(
            tc,
            TimeControl::Clock {
                wtime: Duration::from_millis(60000),
                btime: Duration::from_millis(50000),
                winc: Some(Duration::from_millis(100)),
                binc: Some(Duration::from_millis(200)),
                movestogo: Some(30),
            }
        );
    }

    #[test]
    fn negative_clocks_clamp_to_zero() {
        let tc: TimeControl = "wtime -132 btime 1000".parse().unwrap();

        assert_eq!(
            tc,
            TimeControl::Clock {
                wtime: Duration::ZERO,
                btime: Duration::from_millis(1000),
                winc: None,
                binc: None,
                movestogo: None,
            }
        );
    }

    #[test]
    fn roundtrips() {
        for s in ["infinite", "depth 8", "nodes 1000", "movetime 100"] {
            let tc: TimeControl = s.parse().unwrap();
            assert_eq!(tc.to_string(), s);
        }
    }
}
