use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    Slug,
    bracket::BracketError,
    error::Error,
    utils::{self, slugify},
};

const TOURNAMENTS_FILE: &str = "tournaments.ron";

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    #[default]
    SingleElimination,
}

impl fmt::Display for BracketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleElimination => write!(f, "single_elimination"),
        }
    }
}

impl FromStr for BracketType {
    type Err = BracketError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "single_elimination" | "single" => Ok(Self::SingleElimination),
            _ => Err(BracketError::UnsupportedBracketType(string.to_string())),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub slug: Slug,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BracketType,
    pub format: String,
    pub maps: Vec<String>,
    /// In seed order.
    pub teams: Vec<Slug>,
    /// Match slugs, first round first.
    pub rounds: Vec<Vec<Slug>>,
    pub started: bool,
    pub champion: Option<Slug>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Tournament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {} teams)",
            self.name,
            self.slug,
            self.format,
            self.teams.len()
        )
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Tournaments {
    pub tournaments: BTreeMap<Slug, Tournament>,
    /// The most recently created tournament.
    pub active: Option<Slug>,
    #[serde(skip)]
    data_dir: Option<PathBuf>,
}

impl Tournaments {
    /// # Errors
    ///
    /// If the tournaments file exists but can't be read.
    pub fn load(data_dir: PathBuf) -> anyhow::Result<Self> {
        let mut tournaments: Self =
            utils::read_ron(&data_dir.join(TOURNAMENTS_FILE))?.unwrap_or_default();
        info!("loaded {} tournaments", tournaments.tournaments.len());

        tournaments.data_dir = Some(data_dir);
        Ok(tournaments)
    }

    /// A slug derived from `name` that no tournament uses yet.
    ///
    /// # Errors
    ///
    /// If the name has no letters or digits.
    pub fn unique_slug(&self, name: &str) -> Result<Slug, Error> {
        let base = slugify(name);
        if base.is_empty() {
            return Err(Error::BadRequest("a tournament needs a name".to_string()));
        }

        let mut slug = base.clone();
        while self.tournaments.contains_key(&slug) {
            slug = format!("{base}-{:04x}", rand::random::<u16>());
        }

        Ok(slug)
    }

    /// Adds the tournament and makes it the active one.
    ///
    /// # Errors
    ///
    /// If saving fails, in which case nothing changes.
    pub fn insert(&mut self, tournament: Tournament) -> Result<(), Error> {
        let mut next = self.clone();
        next.active = Some(tournament.slug.clone());
        next.tournaments.insert(tournament.slug.clone(), tournament.clone());
        next.commit(self)?;

        info!("tournament created: {tournament}");
        Ok(())
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn get(&self, slug: &str) -> Result<&Tournament, Error> {
        self.tournaments
            .get(slug)
            .ok_or_else(|| Error::TournamentNotFound(slug.to_string()))
    }

    /// # Errors
    ///
    /// If no tournament was created yet.
    pub fn active(&self) -> Result<&Tournament, Error> {
        match &self.active {
            Some(slug) => self.get(slug),
            None => Err(Error::NoActiveTournament),
        }
    }

    /// Marks the tournament started. Only the first call succeeds.
    ///
    /// # Errors
    ///
    /// If the tournament doesn't exist or already started, or saving fails.
    pub fn start(&mut self, slug: &str) -> Result<Tournament, Error> {
        let mut next = self.clone();
        let tournament = next
            .tournaments
            .get_mut(slug)
            .ok_or_else(|| Error::TournamentNotFound(slug.to_string()))?;

        if tournament.started {
            return Err(BracketError::TournamentAlreadyStarted(slug.to_string()).into());
        }

        tournament.started = true;
        let tournament = tournament.clone();
        next.commit(self)?;

        info!("tournament started: {tournament}");
        Ok(tournament)
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist or saving fails.
    pub fn set_champion(&mut self, slug: &str, team: &str) -> Result<(), Error> {
        let mut next = self.clone();
        let tournament = next
            .tournaments
            .get_mut(slug)
            .ok_or_else(|| Error::TournamentNotFound(slug.to_string()))?;

        if tournament.champion.as_deref() == Some(team) {
            return Ok(());
        }

        tournament.champion = Some(team.to_string());
        next.commit(self)?;

        info!("tournament {slug}: {team} is the champion");
        Ok(())
    }

    /// Saves `self` and then replaces `current` with it.
    fn commit(self, current: &mut Self) -> Result<(), Error> {
        if let Some(data_dir) = &self.data_dir {
            utils::write_ron(&data_dir.join(TOURNAMENTS_FILE), &self).map_err(Error::persist)?;
        }

        *current = self;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn tournament(slug: &str) -> Tournament {
        Tournament {
            slug: slug.to_string(),
            name: "Spring Cup".to_string(),
            kind: BracketType::SingleElimination,
            format: "bo1".to_string(),
            maps: Vec::new(),
            teams: Vec::new(),
            rounds: Vec::new(),
            started: false,
            champion: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bracket_types() {
        assert_eq!(
            "single_elimination".parse::<BracketType>(),
            Ok(BracketType::SingleElimination)
        );
        assert_eq!(
            "Single-Elimination".parse::<BracketType>(),
            Ok(BracketType::SingleElimination)
        );
        assert_eq!(
            "double_elimination".parse::<BracketType>(),
            Err(BracketError::UnsupportedBracketType(
                "double_elimination".to_string()
            ))
        );
    }

    #[test]
    fn slugs_are_unique() -> anyhow::Result<()> {
        let mut tournaments = Tournaments::default();
        assert_eq!(tournaments.unique_slug("Spring Cup")?, "spring-cup");

        tournaments.insert(tournament("spring-cup"))?;
        let slug = tournaments.unique_slug("Spring Cup")?;

        assert_ne!(slug, "spring-cup");
        assert!(slug.starts_with("spring-cup-"));
        assert!(tournaments.unique_slug("???").is_err());

        Ok(())
    }

    #[test]
    fn starts_once() -> anyhow::Result<()> {
        let mut tournaments = Tournaments::default();
        assert!(matches!(
            tournaments.active(),
            Err(Error::NoActiveTournament)
        ));

        tournaments.insert(tournament("spring-cup"))?;
        assert!(tournaments.start("spring-cup")?.started);
        assert!(matches!(
            tournaments.start("spring-cup"),
            Err(Error::Bracket(BracketError::TournamentAlreadyStarted(_)))
        ));
        assert!(matches!(
            tournaments.start("autumn-cup"),
            Err(Error::TournamentNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn failed_saves_change_nothing() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut tournaments = Tournaments::load(temp.path().to_path_buf())?;
        tournaments.insert(tournament("spring-cup"))?;

        // Saving needs the folder.
        drop(temp);
        let before = tournaments.clone();

        assert!(matches!(
            tournaments.start("spring-cup"),
            Err(Error::Persist(_))
        ));
        assert!(matches!(
            tournaments.insert(tournament("autumn-cup")),
            Err(Error::Persist(_))
        ));
        assert!(matches!(
            tournaments.set_champion("spring-cup", "navi"),
            Err(Error::Persist(_))
        ));
        assert_eq!(tournaments, before);
        assert!(!tournaments.get("spring-cup")?.started);

        Ok(())
    }

    #[test]
    fn json_uses_type() -> anyhow::Result<()> {
        let json = serde_json::to_value(tournament("spring-cup"))?;

        assert_eq!(json["type"], "single_elimination");
        assert!(json["createdAt"].is_string());

        Ok(())
    }
}
