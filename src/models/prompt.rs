use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of generation guidance plus its emphasis weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptEntry {
    pub text: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool, // Nothing clears this yet; kept for per-line disabling
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl PromptEntry {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight,
            enabled: true,
        }
    }

    /// True when the entry carries the implicit 1.0 weight.
    pub fn has_default_weight(&self) -> bool {
        self.weight == 1.0
    }
}

/// Which of the two prompt boxes a text or bundle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Positive, Direction::Negative];

    /// Name of the hidden slot the backend node reads for this direction.
    pub fn bundle_slot(self) -> &'static str {
        match self {
            Direction::Positive => "positive_bundle",
            Direction::Negative => "negative_bundle",
        }
    }

    /// Name of the multiline text control for this direction.
    pub fn text_slot(self) -> &'static str {
        match self {
            Direction::Positive => "positive_prompts",
            Direction::Negative => "negative_prompts",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Positive => write!(f, "positive"),
            Direction::Negative => write!(f, "negative"),
        }
    }
}
