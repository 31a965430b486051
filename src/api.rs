//! The REST endpoints.
//!
//! | method | path | body | response |
//! |---|---|---|---|
//! | GET | `/api/settings` | | settings |
//! | PUT | `/api/settings` | `{webhookUrl}` | settings |
//! | GET | `/api/teams` | | `{teams}` |
//! | POST | `/api/team` | `{slug?, name, tag?, players[]}` | `{team}` |
//! | GET | `/api/tournament` | | `{tournament}` |
//! | POST | `/api/tournament` | `{name, type, format, maps[], teamIds[]}` | `{tournament}` |
//! | POST | `/api/tournament/start` | `{slug?}` | `{tournament}` |
//! | GET | `/api/matches` | | `{matches}` |
//! | GET | `/api/matches/{slug}.json` | | the get5 match config |
//! | POST | `/api/matches/{slug}/live` | | `{match}` |
//! | POST | `/api/matches/{slug}/result` | `{winner}` | `{match}` |
//! | GET | `/api/veto/{slug}` | | `{veto}` |
//! | POST | `/api/veto/{slug}/action` | `{mapName?, side?, teamSlug}` | `{veto}` |
//!
//! Errors are `{"error": message, "kind": kind}`.

use std::{
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;

use crate::{
    Slug,
    bracket::{Advancement, BracketPosition, MatchStatus},
    config::{self, ConfigError},
    error::Error,
    format::{DEFAULT_FORMAT, DEFAULT_MAP_POOL},
    http::{Request, Response},
    registry::{MatchEntry, MatchRegistry},
    scheduler::{BracketScheduler, NewTournament},
    settings::Settings,
    team::{Player, Team, Teams},
    tournament::{BracketType, Tournaments},
    utils,
    veto::{VetoAction, VetoStatus},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTournament {
    name: String,
    #[serde(rename = "type", default = "single_elimination")]
    kind: String,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default)]
    maps: Vec<String>,
    team_ids: Vec<Slug>,
}

fn single_elimination() -> String {
    BracketType::SingleElimination.to_string()
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

#[derive(Debug, Default, Deserialize)]
struct StartTournament {
    #[serde(default)]
    slug: Option<Slug>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTeam {
    #[serde(default)]
    slug: Option<Slug>,
    name: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    players: Vec<Player>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettings {
    #[serde(default)]
    webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchResult {
    winner: Slug,
}

/// A match with its teams filled in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchView<'a> {
    slug: &'a str,
    tournament: &'a str,
    position: BracketPosition,
    team1: Option<Team>,
    team2: Option<Team>,
    server: Option<&'a str>,
    status: MatchStatus,
    winner: Option<&'a str>,
    next: Option<&'a Advancement>,
    veto_format: &'a str,
    veto_status: Option<VetoStatus>,
    created_at: DateTime<Utc>,
}

/// The engine behind the endpoints.
#[derive(Debug)]
pub struct Api {
    scheduler: BracketScheduler,
    teams: RwLock<Teams>,
    settings: RwLock<Settings>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            scheduler: BracketScheduler::new(
                Arc::new(MatchRegistry::default()),
                Tournaments::default(),
            ),
            teams: RwLock::new(Teams::default()),
            settings: RwLock::new(Settings::default()),
        }
    }
}

impl Api {
    /// Loads everything under `data_dir`, or starts empty and in memory
    /// without one.
    ///
    /// # Errors
    ///
    /// If the data can't be read or a bracket can't be reconciled.
    pub fn new(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let Some(data_dir) = data_dir else {
            return Ok(Self::default());
        };

        utils::create_data_folder(&data_dir)?;

        let registry = Arc::new(MatchRegistry::load(data_dir.clone())?);
        let scheduler = BracketScheduler::new(registry, Tournaments::load(data_dir.clone())?);
        scheduler.reconcile()?;

        Ok(Self {
            scheduler,
            teams: RwLock::new(Teams::load(data_dir.clone())?),
            settings: RwLock::new(Settings::load(data_dir)?),
        })
    }

    #[must_use]
    pub fn scheduler(&self) -> &BracketScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn handle(&self, request: &Request) -> Response {
        match self.route(request) {
            Ok(response) => response,
            Err(error) => {
                let status = error.status_code();
                if status >= 500 {
                    error!("{} {}: {error}", request.method, request.path);
                } else {
                    debug!("{} {}: {error}", request.method, request.path);
                }

                Response::json(
                    status,
                    &json!({"error": error.to_string(), "kind": error.kind()}),
                )
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn route(&self, request: &Request) -> Result<Response, Error> {
        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();

        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["api", "settings"]) => Ok(Response::json(200, &*self.read_settings())),
            ("PUT", ["api", "settings"]) => {
                let update: UpdateSettings = body(request)?;
                let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
                settings.set_webhook_url(update.webhook_url)?;

                Ok(Response::json(200, &*settings))
            }
            ("GET", ["api", "teams"]) => {
                let teams = self.read_teams();
                let teams: Vec<&Team> = teams.teams.values().collect();

                Ok(Response::json(200, &json!({ "teams": teams })))
            }
            ("POST", ["api", "team"]) => {
                let team: CreateTeam = body(request)?;
                let team = self
                    .teams
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(Team {
                        slug: team.slug.unwrap_or_default(),
                        name: team.name,
                        tag: team.tag,
                        players: team.players,
                    })?;

                Ok(Response::json(201, &json!({ "team": team })))
            }
            ("GET", ["api", "tournament"]) => {
                let tournament = self.scheduler.active_tournament()?;
                Ok(Response::json(200, &json!({ "tournament": tournament })))
            }
            ("POST", ["api", "tournament"]) => {
                let create: CreateTournament = body(request)?;
                let maps = if create.maps.is_empty() {
                    DEFAULT_MAP_POOL.iter().map(ToString::to_string).collect()
                } else {
                    create.maps
                };

                let tournament = self.scheduler.create_tournament(
                    NewTournament {
                        name: create.name,
                        kind: create.kind,
                        format: create.format,
                        maps,
                        teams: create.team_ids,
                    },
                    &self.read_teams(),
                )?;

                Ok(Response::json(201, &json!({ "tournament": tournament })))
            }
            ("POST", ["api", "tournament", "start"]) => {
                let start: StartTournament = if request.body.is_empty() {
                    StartTournament::default()
                } else {
                    body(request)?
                };
                let slug = match start.slug {
                    Some(slug) => slug,
                    None => self.scheduler.active_tournament()?.slug,
                };

                let tournament = self.scheduler.start(&slug)?;
                Ok(Response::json(200, &json!({ "tournament": tournament })))
            }
            ("GET", ["api", "matches"]) => {
                let entries = self.scheduler.registry().list();
                let teams = self.read_teams();
                let matches: Vec<MatchView> = entries
                    .iter()
                    .map(|entry| match_view(entry, &teams))
                    .collect();

                Ok(Response::json(200, &json!({ "matches": matches })))
            }
            ("GET", ["api", "matches", file]) if file.ends_with(".json") => {
                let slug = file.trim_end_matches(".json");
                Ok(Response::json(200, &self.match_config(slug)?))
            }
            ("POST", ["api", "matches", slug, "live"]) => {
                let game = self.scheduler.mark_live(slug)?;
                Ok(Response::json(200, &json!({ "match": game })))
            }
            ("POST", ["api", "matches", slug, "result"]) => {
                let result: MatchResult = body(request)?;
                let game = self.scheduler.report_result(slug, &result.winner)?;

                Ok(Response::json(200, &json!({ "match": game })))
            }
            ("GET", ["api", "veto", slug]) => {
                let veto = self
                    .scheduler
                    .registry()
                    .get(slug)?
                    .veto
                    .ok_or_else(|| Error::NoVeto((*slug).to_string()))?;

                Ok(Response::json(200, &json!({ "veto": veto.get_state() })))
            }
            ("POST", ["api", "veto", slug, "action"]) => {
                let action: VetoAction = body(request)?;
                let veto = self.scheduler.registry().apply_veto_action(slug, &action)?;

                Ok(Response::json(200, &json!({ "veto": veto })))
            }
            _ => Err(Error::RouteNotFound(format!(
                "{} {}",
                request.method, request.path
            ))),
        }
    }

    fn match_config(&self, slug: &str) -> Result<config::ConfigDocument, Error> {
        let MatchEntry { r#match: game, veto } = self.scheduler.registry().get(slug)?;
        let Some(veto) = veto else {
            return Err(ConfigError::VetoNotComplete(slug.to_string()).into());
        };
        let Some((team1, team2)) = game.teams() else {
            return Err(ConfigError::VetoNotComplete(slug.to_string()).into());
        };

        let teams = self.read_teams();
        let config = config::render(
            &game,
            &veto,
            teams.get(&team1)?,
            teams.get(&team2)?,
            &self.read_settings(),
        )?;

        Ok(config)
    }

    fn read_teams(&self) -> std::sync::RwLockReadGuard<'_, Teams> {
        self.teams.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_settings(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn body<T: DeserializeOwned>(request: &Request) -> Result<T, Error> {
    serde_json::from_slice(&request.body).map_err(|error| Error::BadRequest(error.to_string()))
}

fn match_view<'a>(entry: &'a MatchEntry, teams: &Teams) -> MatchView<'a> {
    let game = &entry.r#match;
    let team = |slug: Option<&Slug>| {
        slug.map(|slug| {
            teams.get(slug).cloned().unwrap_or_else(|_| Team {
                slug: slug.clone(),
                name: slug.clone(),
                ..Team::default()
            })
        })
    };

    MatchView {
        slug: &game.slug,
        tournament: &game.tournament,
        position: game.position,
        team1: team(game.team1.as_ref()),
        team2: team(game.team2.as_ref()),
        server: game.server.as_deref(),
        status: game.status,
        winner: game.winner.as_deref(),
        next: game.next.as_ref(),
        veto_format: &game.veto_format,
        veto_status: entry.veto.as_ref().map(|veto| veto.status),
        created_at: game.created_at,
    }
}
