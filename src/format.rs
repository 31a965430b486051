use std::fmt;

use serde::{Deserialize, Serialize};

use crate::side::TeamSlot::{self, Team1, Team2};

pub const DEFAULT_MAP_POOL: [&str; 7] = [
    "mirage", "inferno", "ancient", "anubis", "dust2", "vertigo", "nuke",
];

pub const DEFAULT_FORMAT: &str = "bo1";

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Ban,
    Pick,
    SidePick,
}

impl StepKind {
    /// Bans and picks remove a map from the available maps.
    #[must_use]
    pub fn removes_map(self) -> bool {
        matches!(self, Self::Ban | Self::Pick)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ban => write!(f, "ban"),
            Self::Pick => write!(f, "pick"),
            Self::SidePick => write!(f, "side-pick"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct VetoStep {
    pub actor: TeamSlot,
    pub kind: StepKind,
}

const fn ban(actor: TeamSlot) -> VetoStep {
    VetoStep {
        actor,
        kind: StepKind::Ban,
    }
}

const fn pick(actor: TeamSlot) -> VetoStep {
    VetoStep {
        actor,
        kind: StepKind::Pick,
    }
}

const fn side(actor: TeamSlot) -> VetoStep {
    VetoStep {
        actor,
        kind: StepKind::SidePick,
    }
}

/// A veto format: the ordered steps both teams go through and the pool they
/// go through them on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VetoFormat {
    pub id: &'static str,
    pub steps: &'static [VetoStep],
    pub pool_size: usize,
    pub final_map_count: usize,
}

pub const BO1: VetoFormat = VetoFormat {
    id: "bo1",
    steps: &[
        ban(Team1),
        ban(Team2),
        ban(Team1),
        ban(Team2),
        ban(Team1),
        ban(Team2),
        side(Team1),
    ],
    pool_size: 7,
    final_map_count: 1,
};

pub const BO1_CS_MAJOR: VetoFormat = VetoFormat {
    id: "bo1-cs-major",
    steps: &[
        ban(Team1),
        ban(Team1),
        ban(Team2),
        ban(Team2),
        ban(Team2),
        ban(Team1),
        side(Team2),
    ],
    pool_size: 7,
    final_map_count: 1,
};

pub const BO3: VetoFormat = VetoFormat {
    id: "bo3",
    steps: &[
        ban(Team1),
        ban(Team2),
        pick(Team1),
        side(Team2),
        pick(Team2),
        side(Team1),
        ban(Team2),
        ban(Team1),
        side(Team2),
    ],
    pool_size: 7,
    final_map_count: 3,
};

pub const BO5: VetoFormat = VetoFormat {
    id: "bo5",
    steps: &[
        ban(Team1),
        ban(Team2),
        pick(Team1),
        side(Team2),
        pick(Team2),
        side(Team1),
        pick(Team1),
        side(Team2),
        pick(Team2),
        side(Team1),
        side(Team2),
    ],
    pool_size: 7,
    final_map_count: 5,
};

impl VetoFormat {
    /// The number of ban and pick steps.
    #[must_use]
    pub fn removal_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.kind.removes_map()).count()
    }

    #[must_use]
    pub fn picks(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.kind == StepKind::Pick)
            .count()
    }

    /// The maps nobody banned or picked, played as deciders.
    #[must_use]
    pub fn leftover_maps(&self) -> usize {
        self.pool_size.saturating_sub(self.removal_steps())
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&VetoStep> {
        self.steps.get(index)
    }

    /// Checks the step table against the pool: the picks plus the leftover
    /// maps make up the series and every one of those maps gets exactly one
    /// side-pick.
    ///
    /// # Errors
    ///
    /// If the step table is inconsistent with the pool size or the series
    /// length.
    pub fn validate(&self) -> anyhow::Result<()> {
        let removal_steps = self.removal_steps();

        if removal_steps > self.pool_size {
            return Err(anyhow::Error::msg(format!(
                "{}: {removal_steps} bans and picks on a pool of {} maps",
                self.id, self.pool_size
            )));
        }

        if self.picks() + self.leftover_maps() != self.final_map_count {
            return Err(anyhow::Error::msg(format!(
                "{}: {} picks and {} leftover maps don't make a series of {}",
                self.id,
                self.picks(),
                self.leftover_maps(),
                self.final_map_count
            )));
        }

        let mut removals_seen = 0;
        let mut picks_without_side = 0;
        let mut deciders_without_side = self.leftover_maps();

        for (index, step) in self.steps.iter().enumerate() {
            match step.kind {
                StepKind::Ban => removals_seen += 1,
                StepKind::Pick => {
                    removals_seen += 1;
                    picks_without_side += 1;
                }
                StepKind::SidePick => {
                    if picks_without_side > 0 {
                        picks_without_side -= 1;
                    } else if removals_seen == removal_steps && deciders_without_side > 0 {
                        deciders_without_side -= 1;
                    } else {
                        return Err(anyhow::Error::msg(format!(
                            "{}: the side-pick at step {index} has no map to apply to",
                            self.id
                        )));
                    }
                }
            }
        }

        if picks_without_side + deciders_without_side > 0 {
            return Err(anyhow::Error::msg(format!(
                "{}: {} maps never get a side-pick",
                self.id,
                picks_without_side + deciders_without_side
            )));
        }

        Ok(())
    }
}

/// The process wide, read only table of veto formats.
#[derive(Debug)]
pub struct FormatRegistry {
    formats: &'static [VetoFormat],
}

pub static FORMATS: FormatRegistry = FormatRegistry {
    formats: &[BO1, BO1_CS_MAJOR, BO3, BO5],
};

impl FormatRegistry {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'static VetoFormat> {
        self.formats.iter().find(|format| format.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_is_valid() -> anyhow::Result<()> {
        for format in FORMATS.formats {
            format.validate()?;
        }

        Ok(())
    }

    #[test]
    fn bo1_formats_leave_one_map() {
        for format in [BO1, BO1_CS_MAJOR] {
            assert_eq!(
                format.removal_steps(),
                format.pool_size - format.final_map_count
            );
            assert_eq!(format.leftover_maps(), 1);
        }
    }

    #[test]
    fn series_formats_count_picks_and_decider() {
        assert_eq!(BO3.picks() + BO3.leftover_maps(), 3);
        assert_eq!(BO5.picks() + BO5.leftover_maps(), 5);
    }

    #[test]
    fn cs_major_steps() {
        let bans: Vec<_> = BO1_CS_MAJOR
            .steps
            .iter()
            .filter(|step| step.kind == StepKind::Ban)
            .map(|step| step.actor)
            .collect();

        assert_eq!(bans, vec![Team1, Team1, Team2, Team2, Team2, Team1]);
        assert_eq!(BO1_CS_MAJOR.steps.last(), Some(&side(Team2)));
    }

    #[test]
    fn side_pick_without_a_map_is_rejected() {
        const STEPS: &[VetoStep] = &[side(Team1), ban(Team1), ban(Team2)];

        let format = VetoFormat {
            id: "broken",
            steps: STEPS,
            pool_size: 3,
            final_map_count: 1,
        };

        assert!(format.validate().is_err());
    }

    #[test]
    fn map_without_a_side_is_rejected() {
        const STEPS: &[VetoStep] = &[ban(Team1), ban(Team2)];

        let format = VetoFormat {
            id: "broken",
            steps: STEPS,
            pool_size: 3,
            final_map_count: 1,
        };

        assert!(format.validate().is_err());
    }

    #[test]
    fn registry_lookup() {
        assert_eq!(FORMATS.get("bo3"), Some(&BO3));
        assert!(FORMATS.get("bo7").is_none());
        assert_eq!(FORMATS.get("bo1-cs-major"), Some(&BO1_CS_MAJOR));
    }
}
