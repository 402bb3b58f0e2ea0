use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommendation attached to a tree node and returned by live inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Synthesis {
    Buy,
    Sell,
    Hold,
    #[default]
    None,
}

impl Synthesis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Synthesis::Buy => "BUY",
            Synthesis::Sell => "SELL",
            Synthesis::Hold => "HOLD",
            Synthesis::None => "NONE",
        }
    }

    pub fn all() -> [Synthesis; 4] {
        [Synthesis::Buy, Synthesis::Sell, Synthesis::Hold, Synthesis::None]
    }
}

impl fmt::Display for Synthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a historical sequence played out over its lookahead window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Buy => write!(f, "BUY"),
            Outcome::Sell => write!(f, "SELL"),
            Outcome::Hold => write!(f, "HOLD"),
        }
    }
}
