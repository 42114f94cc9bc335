use serde::{Deserialize, Serialize};

/// A user's explicit response to one candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Like,
    Dislike,
    Neutral,
    /// Unset
    #[default]
    None,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Like => "like",
            Reaction::Dislike => "dislike",
            Reaction::Neutral => "neutral",
            Reaction::None => "none",
        }
    }
}
