use std::fmt;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Slug, side::TeamSlot};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BracketError {
    #[error("bracket: a bracket needs at least 2 teams, got {0}")]
    InsufficientTeams(usize),
    #[error("bracket: the team '{0}' is seeded more than once")]
    DuplicateTeam(Slug),
    #[error("bracket: '{0}' isn't a supported bracket type")]
    UnsupportedBracketType(String),
    #[error("bracket: the tournament '{0}' already started")]
    TournamentAlreadyStarted(Slug),
    #[error("bracket: the match '{slug}' is {status}, it has to be ready or live")]
    MatchNotReady { slug: Slug, status: MatchStatus },
    #[error("bracket: '{winner}' doesn't play in the match '{slug}'")]
    UnknownWinner { slug: Slug, winner: Slug },
    #[error("bracket: {slot} of the match '{slug}' is already taken")]
    SlotTaken { slug: Slug, slot: TeamSlot },
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Pending,
    VetoInProgress,
    Ready,
    Live,
    Completed,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::VetoInProgress => write!(f, "veto_in_progress"),
            Self::Ready => write!(f, "ready"),
            Self::Live => write!(f, "live"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct BracketPosition {
    pub round: usize,
    pub index: usize,
}

/// The parent slot a match's winner is written into.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Advancement {
    pub slug: Slug,
    pub slot: TeamSlot,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub slug: Slug,
    pub tournament: Slug,
    pub position: BracketPosition,
    pub team1: Option<Slug>,
    pub team2: Option<Slug>,
    #[serde(default)]
    pub server: Option<String>,
    pub status: MatchStatus,
    pub winner: Option<Slug>,
    /// `None` for the final.
    pub next: Option<Advancement>,
    pub veto_format: String,
    pub map_pool: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (round {}): {} vs {} [{}]",
            self.slug,
            self.position.round + 1,
            self.team1.as_deref().unwrap_or("_"),
            self.team2.as_deref().unwrap_or("_"),
            self.status
        )
    }
}

impl Match {
    #[must_use]
    pub fn team(&self, slot: TeamSlot) -> Option<&Slug> {
        match slot {
            TeamSlot::Team1 => self.team1.as_ref(),
            TeamSlot::Team2 => self.team2.as_ref(),
        }
    }

    #[must_use]
    pub fn teams(&self) -> Option<(Slug, Slug)> {
        match (&self.team1, &self.team2) {
            (Some(team1), Some(team2)) => Some((team1.clone(), team2.clone())),
            _ => None,
        }
    }

    /// A first round match with a single team.
    #[must_use]
    pub fn is_bye(&self) -> bool {
        self.position.round == 0 && self.team1.is_some() != self.team2.is_some()
    }

    /// Completes a bye as a walkover for its sole team.
    pub fn resolve_bye(&mut self) -> Option<Slug> {
        if !self.is_bye() || self.status != MatchStatus::Pending {
            return None;
        }

        let winner = self.team1.clone().or_else(|| self.team2.clone());
        self.winner.clone_from(&winner);
        self.status = MatchStatus::Completed;

        winner
    }

    /// Writes a team into one slot. Returns true when both slots are now
    /// filled. Writing the same team twice changes nothing.
    ///
    /// # Errors
    ///
    /// If the slot already holds another team.
    pub fn fill_slot(&mut self, slot: TeamSlot, team: &str) -> Result<bool, BracketError> {
        let current = match slot {
            TeamSlot::Team1 => &mut self.team1,
            TeamSlot::Team2 => &mut self.team2,
        };

        if let Some(existing) = current.as_deref() {
            if existing != team {
                return Err(BracketError::SlotTaken {
                    slug: self.slug.clone(),
                    slot,
                });
            }
        } else {
            *current = Some(team.to_string());
        }

        Ok(self.team1.is_some() && self.team2.is_some())
    }

    pub fn begin_veto(&mut self) {
        if self.status == MatchStatus::Pending {
            self.status = MatchStatus::VetoInProgress;
        }
    }

    pub fn veto_completed(&mut self) {
        if self.status == MatchStatus::VetoInProgress {
            self.status = MatchStatus::Ready;
        }
    }

    /// # Errors
    ///
    /// If the match isn't ready.
    pub fn mark_live(&mut self) -> Result<(), BracketError> {
        if self.status != MatchStatus::Ready {
            return Err(BracketError::MatchNotReady {
                slug: self.slug.clone(),
                status: self.status,
            });
        }

        self.status = MatchStatus::Live;
        Ok(())
    }

    /// Completes the match and returns where the winner goes next.
    ///
    /// # Errors
    ///
    /// If the match isn't ready or live, or the winner doesn't play in it.
    pub fn report_result(&mut self, winner: &str) -> Result<Option<Advancement>, BracketError> {
        if !matches!(self.status, MatchStatus::Ready | MatchStatus::Live) {
            return Err(BracketError::MatchNotReady {
                slug: self.slug.clone(),
                status: self.status,
            });
        }

        if self.team1.as_deref() != Some(winner) && self.team2.as_deref() != Some(winner) {
            return Err(BracketError::UnknownWinner {
                slug: self.slug.clone(),
                winner: winner.to_string(),
            });
        }

        self.winner = Some(winner.to_string());
        self.status = MatchStatus::Completed;

        Ok(self.next.clone())
    }
}

#[must_use]
pub fn match_slug(tournament: &str, position: BracketPosition) -> Slug {
    format!(
        "{tournament}-r{}-m{}",
        position.round + 1,
        position.index + 1
    )
}

/// Builds a single elimination bracket sized to the next power of two.
///
/// With `m` first round matches, the team at seed `i < m` takes team1 of
/// match `i` and the team at seed `m + i` takes team2 of match `i`, so a
/// first round match never has two empty slots. Matches come back ordered by
/// round, then by index.
///
/// # Errors
///
/// If there are fewer than two teams or a team is repeated.
pub fn create_bracket(
    tournament: &str,
    teams: &[Slug],
    veto_format: &str,
    map_pool: &[String],
    created_at: DateTime<Utc>,
) -> Result<Vec<Match>, BracketError> {
    if teams.len() < 2 {
        return Err(BracketError::InsufficientTeams(teams.len()));
    }

    let mut seen = FxHashSet::default();
    for team in teams {
        if !seen.insert(team) {
            return Err(BracketError::DuplicateTeam(team.clone()));
        }
    }

    let size = teams.len().next_power_of_two();
    let rounds = size.trailing_zeros() as usize;
    let first_round = size / 2;
    let mut matches = Vec::with_capacity(size - 1);

    for round in 0..rounds {
        let matches_in_round = size >> (round + 1);

        for index in 0..matches_in_round {
            let position = BracketPosition { round, index };

            let next = (round + 1 < rounds).then(|| Advancement {
                slug: match_slug(
                    tournament,
                    BracketPosition {
                        round: round + 1,
                        index: index / 2,
                    },
                ),
                slot: if index % 2 == 0 {
                    TeamSlot::Team1
                } else {
                    TeamSlot::Team2
                },
            });

            let (team1, team2) = if round == 0 {
                (
                    teams.get(index).cloned(),
                    teams.get(first_round + index).cloned(),
                )
            } else {
                (None, None)
            };

            matches.push(Match {
                slug: match_slug(tournament, position),
                tournament: tournament.to_string(),
                position,
                team1,
                team2,
                server: None,
                status: MatchStatus::Pending,
                winner: None,
                next,
                veto_format: veto_format.to_string(),
                map_pool: map_pool.to_vec(),
                created_at,
            });
        }
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams(count: usize) -> Vec<Slug> {
        (1..=count).map(|seed| format!("team-{seed}")).collect()
    }

    fn bracket(count: usize) -> Result<Vec<Match>, BracketError> {
        create_bracket("cup", &teams(count), "bo1", &[], Utc::now())
    }

    #[test]
    fn three_teams_make_one_bye() -> anyhow::Result<()> {
        let matches = bracket(3)?;

        assert_eq!(matches.len(), 3);

        let first_round: Vec<_> = matches
            .iter()
            .filter(|game| game.position.round == 0)
            .collect();
        assert_eq!(first_round.len(), 2);
        assert_eq!(first_round.iter().filter(|game| game.is_bye()).count(), 1);

        assert_eq!(matches[0].team1.as_deref(), Some("team-1"));
        assert_eq!(matches[0].team2.as_deref(), Some("team-3"));
        assert_eq!(matches[1].team1.as_deref(), Some("team-2"));
        assert_eq!(matches[1].team2, None);

        Ok(())
    }

    #[test]
    fn parents_point_upwards() -> anyhow::Result<()> {
        let matches = bracket(8)?;
        assert_eq!(matches.len(), 7);

        assert_eq!(
            matches[0].next,
            Some(Advancement {
                slug: "cup-r2-m1".to_string(),
                slot: TeamSlot::Team1,
            })
        );
        assert_eq!(
            matches[3].next,
            Some(Advancement {
                slug: "cup-r2-m2".to_string(),
                slot: TeamSlot::Team2,
            })
        );

        let last = matches.last().map(|game| (game.slug.as_str(), game.next.clone()));
        assert_eq!(last, Some(("cup-r3-m1", None)));

        Ok(())
    }

    #[test]
    fn no_first_round_match_is_empty() -> anyhow::Result<()> {
        for count in 2..=33 {
            for game in bracket(count)?
                .iter()
                .filter(|game| game.position.round == 0)
            {
                assert!(game.team1.is_some() || game.team2.is_some());
            }
        }

        Ok(())
    }

    #[test]
    fn bracket_errors() {
        assert_eq!(bracket(1).err(), Some(BracketError::InsufficientTeams(1)));

        let repeated = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(
            create_bracket("cup", &repeated, "bo1", &[], Utc::now()).err(),
            Some(BracketError::DuplicateTeam("a".to_string()))
        );
    }

    #[test]
    fn bye_is_a_walkover() -> anyhow::Result<()> {
        let mut matches = bracket(3)?;

        assert_eq!(matches[0].resolve_bye(), None);
        assert_eq!(matches[1].resolve_bye(), Some("team-2".to_string()));
        assert_eq!(matches[1].status, MatchStatus::Completed);

        Ok(())
    }

    #[test]
    fn result_on_a_pending_match() -> anyhow::Result<()> {
        let mut matches = bracket(2)?;

        assert_eq!(
            matches[0].report_result("team-1"),
            Err(BracketError::MatchNotReady {
                slug: "cup-r1-m1".to_string(),
                status: MatchStatus::Pending,
            })
        );

        Ok(())
    }

    #[test]
    fn result_needs_a_playing_winner() -> anyhow::Result<()> {
        let mut matches = bracket(4)?;
        let game = &mut matches[0];
        game.status = MatchStatus::Ready;

        assert!(matches!(
            game.report_result("team-2"),
            Err(BracketError::UnknownWinner { .. })
        ));

        game.mark_live()?;
        let next = game.report_result("team-3")?;

        assert_eq!(game.winner.as_deref(), Some("team-3"));
        assert_eq!(game.status, MatchStatus::Completed);
        assert_eq!(next.map(|next| next.slot), Some(TeamSlot::Team1));

        Ok(())
    }

    #[test]
    fn slots_fill_once() -> anyhow::Result<()> {
        let mut matches = bracket(4)?;
        let parent = &mut matches[2];

        assert!(!parent.fill_slot(TeamSlot::Team1, "team-1")?);
        assert!(!parent.fill_slot(TeamSlot::Team1, "team-1")?);
        assert!(parent.fill_slot(TeamSlot::Team2, "team-2")?);
        assert!(matches!(
            parent.fill_slot(TeamSlot::Team2, "team-4"),
            Err(BracketError::SlotTaken { .. })
        ));

        Ok(())
    }
}
