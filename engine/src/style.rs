//! Playing-style biases.
//!
//! A style is a small, uniform nudge on the search's pruning decisions: an
//! additive delta on reductions and one on futility margins. An aggressive
//! style reduces speculative lines less and prunes defensive resources
//! more; a positional style does the opposite. The default style is the
//! identity, so a search with no style configured behaves exactly as if
//! this module didn't exist.
//!
//! Strength limiting rides the same mechanism: a lowered Elo target maps to
//! a style that prunes more bluntly.

use std::str::FromStr;

/// The caricature the engine is asked to play like.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum PositionStyle {
    #[default]
    Balanced,

    /// Sharp, sacrificial, attack-first
    Aggressive,

    /// Simple, precise, endgame-oriented
    Positional,

    /// Prophylactic, risk-averse
    Defensive,
}

impl FromStr for PositionStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Balanced" => Ok(Self::Balanced),
            "Aggressive" => Ok(Self::Aggressive),
            "Positional" => Ok(Self::Positional),
            "Defensive" => Ok(Self::Defensive),
            _ => Err(format!("Unknown style: {s}")),
        }
    }
}

/// The contract a style has to fulfill towards the search.
pub trait BiasProvider {
    /// Added to every late-move reduction (negative = search wider)
    fn reduction_delta(&self) -> i32;

    /// Added to every futility margin (negative = prune more)
    fn futility_delta(&self) -> i32;
}

impl BiasProvider for PositionStyle {
    fn reduction_delta(&self) -> i32 {
        match self {
            Self::Balanced => 0,
            Self::Aggressive => -1,
            Self::Positional => 0,
            Self::Defensive => 1,
        }
    }

    fn futility_delta(&self) -> i32 {
        match self {
            Self::Balanced => 0,
            Self::Aggressive => 40,
            Self::Positional => -20,
            Self::Defensive => 30,
        }
    }
}

/// The resolved biases a search actually runs with, flattened out of
/// whatever provider produced them.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct StyleBias {
    pub reduction_delta: i32,
    pub futility_delta: i32,
}

impl StyleBias {
    pub fn from_provider(provider: &dyn BiasProvider) -> Self {
        Self {
            reduction_delta: provider.reduction_delta(),
            futility_delta: provider.futility_delta(),
        }
    }

    /// Fold a strength limit into the bias: the lower the target Elo, the
    /// blunter the pruning.
    pub fn with_elo_limit(mut self, elo: u32) -> Self {
        if elo < 2800 {
            let handicap = (2800 - elo) as i32 / 400;
            self.reduction_delta += handicap;
            self.futility_delta -= 20 * handicap;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_is_identity() {
        let bias = StyleBias::from_provider(&PositionStyle::Balanced);
        assert_eq!(bias, StyleBias::default());
    }

    #[test]
    fn elo_limit_blunts_the_search() {
        let bias = StyleBias::default().with_elo_limit(1600);
        assert!(bias.reduction_delta > 0);
        assert!(bias.futility_delta < 0);

        // Full strength changes nothing
        let bias = StyleBias::default().with_elo_limit(2800);
        assert_eq!(bias, StyleBias::default());
    }
}
