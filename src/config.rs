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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Slug,
    bracket::Match,
    settings::Settings,
    side::Side,
    team::Team,
    veto::{VetoSession, VetoStatus},
};

const DEFAULT_PLAYERS_PER_TEAM: usize = 5;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("config: the veto of the match '{0}' isn't complete")]
    VetoNotComplete(Slug),
    #[error("config: set a webhook url before fetching match configs")]
    WebhookNotConfigured,
}

/// Which team starts a map on CT. The other side is implied.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapSide {
    Team1Ct,
    Team2Ct,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConfigTeam {
    pub id: Slug,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Steam id to player name.
    pub players: BTreeMap<String, String>,
}

impl From<&Team> for ConfigTeam {
    fn from(team: &Team) -> Self {
        Self {
            id: team.slug.clone(),
            name: team.name.clone(),
            tag: team.tag.clone(),
            players: team
                .players
                .iter()
                .map(|player| (player.steam_id.clone(), player.name.clone()))
                .collect(),
        }
    }
}

/// The match config the game server plugin loads, in the get5 match schema.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConfigDocument {
    pub matchid: Slug,
    pub num_maps: usize,
    pub maplist: Vec<String>,
    pub map_sides: Vec<MapSide>,
    pub skip_veto: bool,
    pub clinch_series: bool,
    pub players_per_team: usize,
    pub team1: ConfigTeam,
    pub team2: ConfigTeam,
    pub cvars: BTreeMap<String, String>,
}

/// Renders the config of a match whose veto is complete. Pure: the same
/// inputs always give the same document.
///
/// # Errors
///
/// If the veto isn't complete or no webhook url is set.
pub fn render(
    game: &Match,
    veto: &VetoSession,
    team1: &Team,
    team2: &Team,
    settings: &Settings,
) -> Result<ConfigDocument, ConfigError> {
    if veto.status != VetoStatus::Completed {
        return Err(ConfigError::VetoNotComplete(game.slug.clone()));
    }

    let Some(webhook_url) = &settings.webhook_url else {
        return Err(ConfigError::WebhookNotConfigured);
    };

    let mut picked_maps: Vec<_> = veto.picked_maps.iter().collect();
    picked_maps.sort_by_key(|picked| picked.order);

    let maplist = picked_maps
        .iter()
        .map(|picked| picked.map_name.clone())
        .collect();

    let map_sides = picked_maps
        .iter()
        .map(|picked| {
            if picked.side_team1 == Side::Ct {
                MapSide::Team1Ct
            } else {
                MapSide::Team2Ct
            }
        })
        .collect();

    let players_per_team = match team1.players.len().max(team2.players.len()) {
        0 => DEFAULT_PLAYERS_PER_TEAM,
        players => players,
    };

    let mut cvars = BTreeMap::new();
    cvars.insert("get5_remote_log_url".to_string(), webhook_url.clone());

    Ok(ConfigDocument {
        matchid: game.slug.clone(),
        num_maps: picked_maps.len(),
        maplist,
        map_sides,
        skip_veto: true,
        clinch_series: true,
        players_per_team,
        team1: team1.into(),
        team2: team2.into(),
        cvars,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::{
        bracket::create_bracket,
        format::DEFAULT_MAP_POOL,
        team::Player,
        veto::{PickedMap, VetoAction},
    };

    use super::*;

    fn fixtures() -> anyhow::Result<(Match, VetoSession, Team, Team, Settings)> {
        let pool: Vec<String> = DEFAULT_MAP_POOL.iter().map(ToString::to_string).collect();
        let teams = vec!["navi".to_string(), "vitality".to_string()];
        let game = create_bracket("major", &teams, "bo1-cs-major", &pool, Utc::now())?
            .remove(0);
        let veto = VetoSession::create(&game.slug, "bo1-cs-major", &pool, game.teams())?;

        let navi = Team {
            slug: "navi".to_string(),
            name: "Natus Vincere".to_string(),
            tag: Some("NAVI".to_string()),
            players: vec![Player {
                steam_id: "76561197991272318".to_string(),
                name: "s1mple".to_string(),
            }],
        };
        let vitality = Team {
            slug: "vitality".to_string(),
            name: "Team Vitality".to_string(),
            ..Team::default()
        };

        let mut settings = Settings::default();
        settings.set_webhook_url(Some("https://example.org/get5".to_string()))?;

        Ok((game, veto, navi, vitality, settings))
    }

    #[test]
    fn cs_major_config() -> anyhow::Result<()> {
        let (game, mut veto, navi, vitality, settings) = fixtures()?;

        for (team, map) in [
            ("navi", "mirage"),
            ("navi", "inferno"),
            ("vitality", "ancient"),
            ("vitality", "anubis"),
            ("vitality", "dust2"),
            ("navi", "vertigo"),
        ] {
            veto.apply_action(&VetoAction {
                map_name: Some(map.to_string()),
                side: None,
                team_slug: team.to_string(),
            })?;
        }
        veto.apply_action(&VetoAction {
            map_name: None,
            side: Some(Side::Ct),
            team_slug: "vitality".to_string(),
        })?;

        let config = render(&game, &veto, &navi, &vitality, &settings)?;
        let json = serde_json::to_value(&config)?;

        assert_eq!(json["num_maps"], 1);
        assert_eq!(json["maplist"], serde_json::json!(["nuke"]));
        assert_eq!(json["map_sides"], serde_json::json!(["team2_ct"]));
        assert_eq!(json["team1"]["name"], "Natus Vincere");
        assert_eq!(json["team1"]["players"]["76561197991272318"], "s1mple");
        assert_eq!(json["team2"]["name"], "Team Vitality");
        assert_eq!(json["players_per_team"], 1);
        assert_eq!(
            json["cvars"]["get5_remote_log_url"],
            "https://example.org/get5"
        );

        Ok(())
    }

    #[test]
    fn maps_follow_their_order() -> anyhow::Result<()> {
        let (game, mut veto, navi, vitality, settings) = fixtures()?;

        veto.status = VetoStatus::Completed;
        veto.picked_maps = vec![
            PickedMap {
                map_name: "nuke".to_string(),
                order: 1,
                side_team1: Side::T,
                side_team2: Side::Ct,
                picked_by: None,
            },
            PickedMap {
                map_name: "mirage".to_string(),
                order: 0,
                side_team1: Side::Ct,
                side_team2: Side::T,
                picked_by: None,
            },
        ];

        let config = render(&game, &veto, &navi, &vitality, &settings)?;

        assert_eq!(config.num_maps, 2);
        assert_eq!(config.maplist, vec!["mirage", "nuke"]);
        assert_eq!(config.map_sides, vec![MapSide::Team1Ct, MapSide::Team2Ct]);

        Ok(())
    }

    #[test]
    fn incomplete_veto() -> anyhow::Result<()> {
        let (game, veto, navi, vitality, settings) = fixtures()?;

        assert_eq!(
            render(&game, &veto, &navi, &vitality, &settings),
            Err(ConfigError::VetoNotComplete("major-r1-m1".to_string()))
        );

        Ok(())
    }

    #[test]
    fn webhook_has_to_be_set() -> anyhow::Result<()> {
        let (game, mut veto, navi, vitality, _settings) = fixtures()?;
        veto.status = VetoStatus::Completed;

        assert_eq!(
            render(&game, &veto, &navi, &vitality, &Settings::default()),
            Err(ConfigError::WebhookNotConfigured)
        );

        Ok(())
    }
}
