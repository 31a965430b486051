use thiserror::Error;

use crate::{Slug, bracket::BracketError, config::ConfigError, veto::VetoError};

/// Every way a request against the engine can fail. Each failure is scoped
/// to the request that caused it.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Veto(#[from] VetoError),
    #[error(transparent)]
    Bracket(#[from] BracketError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("the match '{0}' doesn't exist")]
    MatchNotFound(Slug),
    #[error("the match '{0}' already exists")]
    MatchExists(Slug),
    #[error("the match '{0}' has no veto")]
    NoVeto(Slug),
    #[error("the tournament '{0}' doesn't exist")]
    TournamentNotFound(Slug),
    #[error("there is no tournament yet")]
    NoActiveTournament,
    #[error("the team '{0}' doesn't exist")]
    TeamNotFound(Slug),
    #[error("the team '{0}' already exists")]
    TeamExists(Slug),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    RouteNotFound(String),
    #[error("persist: {0}")]
    Persist(String),
}

impl Error {
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn persist(error: anyhow::Error) -> Self {
        Self::Persist(format!("{error:#}"))
    }

    /// The name clients match on.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Veto(error) => match error {
                VetoError::FormatNotFound(_) => "FormatNotFound",
                VetoError::PoolSizeMismatch { .. } => "PoolSizeMismatch",
                VetoError::DuplicateMap(_) => "DuplicateMap",
                VetoError::VetoAlreadyCompleted => "VetoAlreadyCompleted",
                VetoError::VetoPending => "VetoPending",
                VetoError::TeamsAlreadyAssigned => "TeamsAlreadyAssigned",
                VetoError::NotYourTurn(_) => "NotYourTurn",
                VetoError::InvalidMap(_) => "InvalidMap",
                VetoError::InvalidSide => "InvalidSide",
                VetoError::CorruptLog(_) => "CorruptLog",
            },
            Self::Bracket(error) => match error {
                BracketError::InsufficientTeams(_) => "InsufficientTeams",
                BracketError::DuplicateTeam(_) => "DuplicateTeam",
                BracketError::UnsupportedBracketType(_) => "UnsupportedBracketType",
                BracketError::TournamentAlreadyStarted(_) => "TournamentAlreadyStarted",
                BracketError::MatchNotReady { .. } => "MatchNotReady",
                BracketError::UnknownWinner { .. } => "UnknownWinner",
                BracketError::SlotTaken { .. } => "SlotTaken",
            },
            Self::Config(error) => match error {
                ConfigError::VetoNotComplete(_) => "VetoNotComplete",
                ConfigError::WebhookNotConfigured => "WebhookNotConfigured",
            },
            Self::MatchNotFound(_) => "MatchNotFound",
            Self::MatchExists(_) => "MatchExists",
            Self::NoVeto(_) => "NoVeto",
            Self::TournamentNotFound(_) => "TournamentNotFound",
            Self::NoActiveTournament => "NoActiveTournament",
            Self::TeamNotFound(_) => "TeamNotFound",
            Self::TeamExists(_) => "TeamExists",
            Self::BadRequest(_) => "BadRequest",
            Self::RouteNotFound(_) => "RouteNotFound",
            Self::Persist(_) => "Persist",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Veto(error) => match error {
                VetoError::FormatNotFound(_)
                | VetoError::PoolSizeMismatch { .. }
                | VetoError::DuplicateMap(_)
                | VetoError::InvalidMap(_)
                | VetoError::InvalidSide => 400,
                VetoError::VetoAlreadyCompleted
                | VetoError::VetoPending
                | VetoError::TeamsAlreadyAssigned
                | VetoError::NotYourTurn(_) => 409,
                VetoError::CorruptLog(_) => 500,
            },
            Self::Bracket(error) => match error {
                BracketError::InsufficientTeams(_)
                | BracketError::DuplicateTeam(_)
                | BracketError::UnsupportedBracketType(_)
                | BracketError::UnknownWinner { .. } => 400,
                BracketError::TournamentAlreadyStarted(_)
                | BracketError::MatchNotReady { .. }
                | BracketError::SlotTaken { .. } => 409,
            },
            Self::Config(_) | Self::MatchExists(_) | Self::TeamExists(_) | Self::NoVeto(_) => 409,
            Self::MatchNotFound(_)
            | Self::TournamentNotFound(_)
            | Self::NoActiveTournament
            | Self::TeamNotFound(_)
            | Self::RouteNotFound(_) => 404,
            Self::BadRequest(_) => 400,
            Self::Persist(_) => 500,
        }
    }
}
