// This file is part of get5-bracket.
//
// get5-bracket is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// get5-bracket is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Slug,
    format::{FORMATS, StepKind, VetoFormat, VetoStep},
    side::{Side, TeamSlot},
};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum VetoError {
    #[error("veto: the format '{0}' doesn't exist")]
    FormatNotFound(String),
    #[error("veto: the format '{format}' needs a pool of {expected} maps, got {got}")]
    PoolSizeMismatch {
        format: String,
        expected: usize,
        got: usize,
    },
    #[error("veto: '{0}' is in the map pool more than once")]
    DuplicateMap(String),
    #[error("veto: the veto is already completed")]
    VetoAlreadyCompleted,
    #[error("veto: both teams have to be assigned before the veto starts")]
    VetoPending,
    #[error("veto: the teams are already assigned")]
    TeamsAlreadyAssigned,
    #[error("veto: it isn't {0}'s turn")]
    NotYourTurn(String),
    #[error("veto: '{0}' isn't an available map")]
    InvalidMap(String),
    #[error("veto: a side-pick needs a side of T or CT")]
    InvalidSide,
    #[error("veto: the action log doesn't replay: {0}")]
    CorruptLog(String),
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// What a client submits: a map for bans and picks, a side for side-picks.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VetoAction {
    #[serde(default)]
    pub map_name: Option<String>,
    #[serde(default)]
    pub side: Option<Side>,
    pub team_slug: Slug,
}

/// One executed step. For a side-pick `map_name` is the map the side
/// applies to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub step_index: usize,
    pub team_slug: Slug,
    pub kind: StepKind,
    pub map_name: Option<String>,
    pub side: Option<Side>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedMap {
    pub map_name: String,
    pub order: usize,
    pub side_team1: Side,
    pub side_team2: Side,
    /// `None` for a map nobody banned or picked.
    pub picked_by: Option<TeamSlot>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStep {
    pub step_index: usize,
    pub actor: TeamSlot,
    pub team_slug: Option<Slug>,
    pub kind: StepKind,
}

/// The veto of one match.
///
/// The action log is the source of truth. `available_maps`, `picked_maps`,
/// `status` and `next_step` are caches rebuilt by folding the log over the
/// original pool.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VetoSession {
    pub match_id: Slug,
    pub format_id: String,
    pub map_pool: Vec<String>,
    pub team1: Option<Slug>,
    pub team2: Option<Slug>,
    pub action_log: Vec<ActionRecord>,
    #[serde(default)]
    pub available_maps: Vec<String>,
    #[serde(default)]
    pub picked_maps: Vec<PickedMap>,
    #[serde(default)]
    pub status: VetoStatus,
    #[serde(default)]
    pub next_step: Option<NextStep>,
}

/// The state reached after folding some prefix of the action log.
#[derive(Clone, Debug)]
struct Fold {
    available: Vec<String>,
    picks: Vec<(String, TeamSlot)>,
    sides: Vec<(String, TeamSlot, Side)>,
    removals: usize,
}

impl Fold {
    fn new(pool: &[String]) -> Self {
        Self {
            available: pool.to_vec(),
            picks: Vec::new(),
            sides: Vec::new(),
            removals: 0,
        }
    }

    fn has_side(&self, map: &str) -> bool {
        self.sides.iter().any(|(sided, _, _)| sided == map)
    }

    /// The earliest picked map without a side, or once every ban and pick is
    /// done, the earliest remaining map without a side.
    fn side_target(&self, format: &VetoFormat) -> Option<String> {
        if let Some((map, _)) = self.picks.iter().find(|(map, _)| !self.has_side(map)) {
            return Some(map.clone());
        }

        if self.removals == format.removal_steps() {
            return self
                .available
                .iter()
                .find(|map| !self.has_side(map))
                .cloned();
        }

        None
    }

    /// Validates and applies one step, returning the map it touched.
    fn apply(
        &mut self,
        format: &VetoFormat,
        step: &VetoStep,
        map: Option<&str>,
        side: Option<Side>,
    ) -> Result<String, VetoError> {
        match step.kind {
            StepKind::Ban | StepKind::Pick => {
                let Some(map) = map else {
                    return Err(VetoError::InvalidMap(String::new()));
                };
                let Some(index) = self
                    .available
                    .iter()
                    .position(|available| available.eq_ignore_ascii_case(map))
                else {
                    return Err(VetoError::InvalidMap(map.to_string()));
                };

                let map = self.available.remove(index);
                self.removals += 1;

                if step.kind == StepKind::Pick {
                    self.picks.push((map.clone(), step.actor));
                }

                Ok(map)
            }
            StepKind::SidePick => {
                let Some(side) = side else {
                    return Err(VetoError::InvalidSide);
                };
                let Some(map) = self.side_target(format) else {
                    return Err(VetoError::CorruptLog(format!(
                        "the format '{}' has a side-pick with no map",
                        format.id
                    )));
                };

                self.sides.push((map.clone(), step.actor, side));
                Ok(map)
            }
        }
    }

    fn picked_maps(&self) -> Result<Vec<PickedMap>, VetoError> {
        let picks = self.picks.iter().map(|(map, by)| (map, Some(*by)));
        let deciders = self.available.iter().map(|map| (map, None));

        picks
            .chain(deciders)
            .enumerate()
            .map(|(order, (map, picked_by))| {
                let Some((_, chooser, side)) = self.sides.iter().find(|(sided, _, _)| sided == map)
                else {
                    return Err(VetoError::CorruptLog(format!("'{map}' never got a side")));
                };

                let (side_team1, side_team2) = match chooser {
                    TeamSlot::Team1 => (*side, side.opposite()),
                    TeamSlot::Team2 => (side.opposite(), *side),
                };

                Ok(PickedMap {
                    map_name: map.clone(),
                    order,
                    side_team1,
                    side_team2,
                    picked_by,
                })
            })
            .collect()
    }
}

impl VetoSession {
    /// # Errors
    ///
    /// If the format doesn't exist or the pool doesn't fit the format.
    pub fn create(
        match_id: &str,
        format_id: &str,
        map_pool: &[String],
        teams: Option<(Slug, Slug)>,
    ) -> Result<Self, VetoError> {
        let format = lookup(format_id)?;

        if map_pool.len() != format.pool_size {
            return Err(VetoError::PoolSizeMismatch {
                format: format_id.to_string(),
                expected: format.pool_size,
                got: map_pool.len(),
            });
        }

        for (index, map) in map_pool.iter().enumerate() {
            if map_pool
                .iter()
                .skip(index + 1)
                .any(|other| other.eq_ignore_ascii_case(map))
            {
                return Err(VetoError::DuplicateMap(map.clone()));
            }
        }

        let (team1, team2) = match teams {
            Some((team1, team2)) => (Some(team1), Some(team2)),
            None => (None, None),
        };

        let mut session = Self {
            match_id: match_id.to_string(),
            format_id: format_id.to_string(),
            map_pool: map_pool.to_vec(),
            team1,
            team2,
            action_log: Vec::new(),
            available_maps: Vec::new(),
            picked_maps: Vec::new(),
            status: VetoStatus::Pending,
            next_step: None,
        };
        session.replay()?;

        Ok(session)
    }

    /// # Errors
    ///
    /// If the teams are already assigned.
    pub fn assign_teams(&mut self, team1: &str, team2: &str) -> Result<(), VetoError> {
        if self.status != VetoStatus::Pending {
            return Err(VetoError::TeamsAlreadyAssigned);
        }

        self.team1 = Some(team1.to_string());
        self.team2 = Some(team2.to_string());
        self.replay()
    }

    /// # Errors
    ///
    /// If the format id of the session is unknown.
    pub fn format(&self) -> Result<&'static VetoFormat, VetoError> {
        lookup(&self.format_id)
    }

    #[must_use]
    pub fn team(&self, slot: TeamSlot) -> Option<&Slug> {
        match slot {
            TeamSlot::Team1 => self.team1.as_ref(),
            TeamSlot::Team2 => self.team2.as_ref(),
        }
    }

    /// A read only copy of the session.
    #[must_use]
    pub fn get_state(&self) -> VetoSession {
        self.clone()
    }

    /// Validates the action against the next expected step and appends it to
    /// the log. A rejected action leaves the session unchanged.
    ///
    /// # Errors
    ///
    /// If the veto is over or not started, it isn't the team's turn, the map
    /// isn't available, or a side-pick has no side.
    pub fn apply_action(&mut self, action: &VetoAction) -> Result<&VetoSession, VetoError> {
        match self.status {
            VetoStatus::Completed => return Err(VetoError::VetoAlreadyCompleted),
            VetoStatus::Pending => return Err(VetoError::VetoPending),
            VetoStatus::InProgress => {}
        }

        let format = self.format()?;
        let step_index = self.action_log.len();
        let Some(step) = format.step(step_index) else {
            return Err(VetoError::VetoAlreadyCompleted);
        };

        if self.team(step.actor) != Some(&action.team_slug) {
            return Err(VetoError::NotYourTurn(action.team_slug.clone()));
        }

        let mut fold = self.fold(format)?;
        let map = fold.apply(format, step, action.map_name.as_deref(), action.side)?;

        self.action_log.push(ActionRecord {
            step_index,
            team_slug: action.team_slug.clone(),
            kind: step.kind,
            map_name: Some(map),
            side: if step.kind == StepKind::SidePick {
                action.side
            } else {
                None
            },
            timestamp: Utc::now(),
        });

        self.refresh(format, &fold)?;
        Ok(&*self)
    }

    /// Rebuilds every cached field from the action log.
    ///
    /// # Errors
    ///
    /// If the log doesn't replay against the format and the pool.
    pub fn replay(&mut self) -> Result<(), VetoError> {
        let format = self.format()?;
        let fold = self.fold(format)?;
        self.refresh(format, &fold)
    }

    fn fold(&self, format: &VetoFormat) -> Result<Fold, VetoError> {
        let mut fold = Fold::new(&self.map_pool);

        for (index, record) in self.action_log.iter().enumerate() {
            let Some(step) = format.step(index) else {
                return Err(VetoError::CorruptLog(format!(
                    "{} actions for a format of {} steps",
                    self.action_log.len(),
                    format.steps.len()
                )));
            };

            if record.step_index != index
                || record.kind != step.kind
                || self.team(step.actor) != Some(&record.team_slug)
            {
                return Err(VetoError::CorruptLog(format!(
                    "action {index} doesn't match the step {} {}",
                    step.actor, step.kind
                )));
            }

            fold.apply(format, step, record.map_name.as_deref(), record.side)?;
        }

        Ok(fold)
    }

    fn refresh(&mut self, format: &VetoFormat, fold: &Fold) -> Result<(), VetoError> {
        let consumed = self.action_log.len();

        self.available_maps.clone_from(&fold.available);

        if consumed == format.steps.len() {
            self.picked_maps = fold.picked_maps()?;
            self.status = VetoStatus::Completed;
            self.next_step = None;
        } else {
            self.picked_maps.clear();
            self.status = if self.team1.is_some() && self.team2.is_some() {
                VetoStatus::InProgress
            } else {
                VetoStatus::Pending
            };
            self.next_step = format.step(consumed).map(|step| NextStep {
                step_index: consumed,
                actor: step.actor,
                team_slug: self.team(step.actor).cloned(),
                kind: step.kind,
            });
        }

        Ok(())
    }
}

fn lookup(format_id: &str) -> Result<&'static VetoFormat, VetoError> {
    FORMATS
        .get(format_id)
        .ok_or_else(|| VetoError::FormatNotFound(format_id.to_string()))
}
