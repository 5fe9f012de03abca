//! UCI option declarations, as advertised in response to `uci`.

use std::fmt::Display;

#[derive(Debug, Clone)]
pub enum OptionType {
    Check {
        default: bool,
    },
    Spin {
        min: i64,
        max: i64,
        default: i64,
    },
    Combo {
        default: &'static str,
        values: &'static [&'static str],
    },
    Button,
    Text {
        default: &'static str,
    },
}

impl Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Check { default } => {
                write!(f, "type check default {default}")
            }

            Self::Spin { min, max, default } => {
                write!(f, "type spin default {default} min {min} max {max}")
            }

            Self::Combo { default, values } => {
                write!(f, "type combo default {default}")?;

                for value in values.iter() {
                    write!(f, " var {value}")?;
                }

                Ok(())
            }

            Self::Button => write!(f, "type button"),

            Self::Text { default } => {
                // The convention for "no value" in a string option
                let default = if default.is_empty() { "<empty>" } else { default };
                write!(f, "type string default {default}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UciOption {
    pub name: &'static str,
    pub option_type: OptionType,
}

impl Display for UciOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "name {} {}", self.name, self.option_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_option_rendering() {
        let option = UciOption {
            name: "Hash",
            option_type: OptionType::Spin { min: 1, max: 1024, default: 16 },
        };

        assert_eq!(
            option.to_string(),
            "name Hash type spin default 16 min 1 max 1024"
        );
    }

    #[test]
    fn combo_option_rendering() {
        let option = UciOption {
            name: "Persisted Learning",
            option_type: OptionType::Combo {
                default: "Off",
                values: &["Off", "Standard", "Self"],
            },
        };

        assert_eq!(
            option.to_string(),
            "name Persisted Learning type combo default Off var Off var Standard var Self"
        );
    }

    #[test]
    fn empty_string_option_rendering() {
        let option = UciOption {
            name: "SyzygyPath",
            option_type: OptionType::Text { default: "" },
        };

        assert_eq!(option.to_string(), "name SyzygyPath type string default <empty>");
    }
}
