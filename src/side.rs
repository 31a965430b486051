use std::fmt;

use serde::{Deserialize, Serialize};

/// The faction a team starts a map on.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Side {
    #[serde(rename = "T")]
    T,
    #[serde(rename = "CT")]
    Ct,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::T => Self::Ct,
            Self::Ct => Self::T,
        }
    }
}

/// One of the two team slots of a match.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TeamSlot {
    #[default]
    Team1,
    Team2,
}

impl TeamSlot {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Team1 => Self::Team2,
            Self::Team2 => Self::Team1,
        }
    }
}

impl fmt::Display for TeamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team1 => write!(f, "team1"),
            Self::Team2 => write!(f, "team2"),
        }
    }
}
