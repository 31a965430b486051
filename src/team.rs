use std::{collections::BTreeMap, fmt, path::PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    Slug,
    error::Error,
    utils::{self, slugify},
};

const TEAMS_FILE: &str = "teams.ron";

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub steam_id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub slug: Slug,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub players: Vec<Player>,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} players)", self.name, self.slug, self.players.len())
    }
}

/// Teams by slug, kept sorted so listings are stable.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Teams {
    pub teams: BTreeMap<Slug, Team>,
    #[serde(skip)]
    data_dir: Option<PathBuf>,
}

impl Teams {
    /// # Errors
    ///
    /// If the teams file exists but can't be read.
    pub fn load(data_dir: PathBuf) -> anyhow::Result<Self> {
        let mut teams: Self = utils::read_ron(&data_dir.join(TEAMS_FILE))?.unwrap_or_default();
        info!("loaded {} teams", teams.teams.len());

        teams.data_dir = Some(data_dir);
        Ok(teams)
    }

    /// Registers a team. A missing slug is derived from the name.
    ///
    /// # Errors
    ///
    /// If the slug is taken or empty, or saving fails.
    pub fn insert(&mut self, mut team: Team) -> Result<Team, Error> {
        team.slug = if team.slug.is_empty() {
            slugify(&team.name)
        } else {
            slugify(&team.slug)
        };

        if team.slug.is_empty() {
            return Err(Error::BadRequest("a team needs a name".to_string()));
        }
        if self.teams.contains_key(&team.slug) {
            return Err(Error::TeamExists(team.slug));
        }

        let mut next = self.clone();
        next.teams.insert(team.slug.clone(), team.clone());
        if let Some(data_dir) = &next.data_dir {
            utils::write_ron(&data_dir.join(TEAMS_FILE), &next).map_err(Error::persist)?;
        }
        *self = next;

        info!("team created: {team}");
        Ok(team)
    }

    /// # Errors
    ///
    /// If the team doesn't exist.
    pub fn get(&self, slug: &str) -> Result<&Team, Error> {
        self.teams
            .get(slug)
            .ok_or_else(|| Error::TeamNotFound(slug.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn slug_is_derived_from_the_name() -> anyhow::Result<()> {
        let mut teams = Teams::default();
        let team = teams.insert(Team {
            name: "Natus Vincere".to_string(),
            ..Team::default()
        })?;

        assert_eq!(team.slug, "natus-vincere");
        assert_eq!(teams.get("natus-vincere")?.name, "Natus Vincere");

        Ok(())
    }

    #[test]
    fn duplicate_slugs_are_rejected() -> anyhow::Result<()> {
        let mut teams = Teams::default();
        teams.insert(Team {
            slug: "faze".to_string(),
            name: "FaZe Clan".to_string(),
            ..Team::default()
        })?;

        let result = teams.insert(Team {
            slug: "FaZe".to_string(),
            name: "FaZe".to_string(),
            ..Team::default()
        });

        assert!(matches!(result, Err(Error::TeamExists(slug)) if slug == "faze"));
        assert!(matches!(teams.get("g2"), Err(Error::TeamNotFound(_))));

        Ok(())
    }

    #[test]
    fn failed_save_adds_no_team() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut teams = Teams::load(temp.path().join("missing"))?;

        let result = teams.insert(Team {
            name: "G2 Esports".to_string(),
            ..Team::default()
        });

        assert!(matches!(result, Err(Error::Persist(_))));
        assert!(teams.teams.is_empty());

        Ok(())
    }
}
