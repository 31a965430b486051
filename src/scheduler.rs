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

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use log::{debug, info};

use crate::{
    Slug,
    bracket::{Advancement, Match, MatchStatus, create_bracket},
    error::Error,
    registry::{MatchEntry, MatchRegistry},
    team::Teams,
    tournament::{BracketType, Tournament, Tournaments},
    veto::VetoSession,
};

/// What a client asks for when creating a tournament.
#[derive(Clone, Debug, Default)]
pub struct NewTournament {
    pub name: String,
    pub kind: String,
    pub format: String,
    pub maps: Vec<String>,
    pub teams: Vec<Slug>,
}

/// Drives brackets: seeding, byes, vetoes for filled matches and winners
/// moving up.
///
/// A match's lock is never held while taking another one. A winner is
/// committed on its match first and then written into the parent, so a crash
/// in between leaves work that [`BracketScheduler::reconcile`] finishes.
#[derive(Debug)]
pub struct BracketScheduler {
    registry: Arc<MatchRegistry>,
    tournaments: Mutex<Tournaments>,
}

impl BracketScheduler {
    #[must_use]
    pub fn new(registry: Arc<MatchRegistry>, tournaments: Tournaments) -> Self {
        Self {
            registry,
            tournaments: Mutex::new(tournaments),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<MatchRegistry> {
        &self.registry
    }

    /// # Errors
    ///
    /// If no tournament was created yet.
    pub fn active_tournament(&self) -> Result<Tournament, Error> {
        self.tournaments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active()
            .cloned()
    }

    /// # Errors
    ///
    /// If the tournament doesn't exist.
    pub fn tournament(&self, slug: &str) -> Result<Tournament, Error> {
        self.tournaments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slug)
            .cloned()
    }

    /// Validates the request, builds the bracket and stores its matches.
    /// Nothing is stored if any part of the request is invalid.
    ///
    /// # Errors
    ///
    /// If the bracket type, format, map pool or teams are invalid, or saving
    /// fails.
    pub fn create_tournament(
        &self,
        request: NewTournament,
        teams: &Teams,
    ) -> Result<Tournament, Error> {
        let kind: BracketType = request.kind.parse()?;

        // Checks the format and the pool the same way every veto will.
        VetoSession::create("", &request.format, &request.maps, None)?;

        for team in &request.teams {
            teams.get(team)?;
        }

        let mut tournaments = self.tournaments.lock().unwrap_or_else(PoisonError::into_inner);
        let slug = tournaments.unique_slug(&request.name)?;
        let created_at = Utc::now();

        let matches = create_bracket(
            &slug,
            &request.teams,
            &request.format,
            &request.maps,
            created_at,
        )?;

        let mut rounds: Vec<Vec<Slug>> = Vec::new();
        for game in &matches {
            if rounds.len() <= game.position.round {
                rounds.push(Vec::new());
            }
            if let Some(round) = rounds.last_mut() {
                round.push(game.slug.clone());
            }
        }

        let mut inserted = Vec::new();
        let mut stored = Ok(());
        for game in matches {
            let match_slug = game.slug.clone();
            stored = self.registry.insert(MatchEntry {
                r#match: game,
                veto: None,
            });
            if stored.is_err() {
                break;
            }
            inserted.push(match_slug);
        }

        let tournament = Tournament {
            slug,
            name: request.name,
            kind,
            format: request.format,
            maps: request.maps,
            teams: request.teams,
            rounds,
            started: false,
            champion: None,
            created_at,
        };
        if let Err(error) = stored.and_then(|()| tournaments.insert(tournament.clone())) {
            for game in &inserted {
                self.registry.remove(game);
            }
            return Err(error);
        }

        Ok(tournament)
    }

    /// Opens the vetoes of the first round and walks byes over.
    ///
    /// # Errors
    ///
    /// If the tournament doesn't exist or already started, or saving fails.
    pub fn start(&self, slug: &str) -> Result<Tournament, Error> {
        let tournament = self
            .tournaments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .start(slug)?;

        if let Some(first_round) = tournament.rounds.first() {
            for game in first_round {
                self.seed(game)?;
            }
        }

        self.tournament(slug)
    }

    /// Opens the veto of a first round match with two teams, or completes a
    /// bye and advances its team.
    fn seed(&self, slug: &str) -> Result<(), Error> {
        let walkover = self.registry.with_lock(slug, |entry| {
            let game = &mut entry.r#match;

            if let Some(winner) = game.resolve_bye() {
                info!("bye: {game}");
                return Ok(Some((winner, game.next.clone(), game.tournament.clone())));
            }

            open_veto(entry)?;
            Ok(None)
        })?;

        if let Some((winner, next, tournament)) = walkover {
            self.advance(&tournament, next.as_ref(), &winner)?;
        }

        Ok(())
    }

    /// Writes the winner into the parent slot. The parent's veto opens once
    /// both of its slots are filled. Without a parent the winner is the
    /// champion.
    fn advance(
        &self,
        tournament: &str,
        next: Option<&Advancement>,
        winner: &str,
    ) -> Result<(), Error> {
        let Some(next) = next else {
            return self
                .tournaments
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .set_champion(tournament, winner);
        };

        self.registry.with_lock(&next.slug, |entry| {
            if entry.r#match.fill_slot(next.slot, winner)? {
                open_veto(entry)?;
            }

            debug!("advanced {winner} to {}", entry.r#match);
            Ok(())
        })
    }

    /// Completes a ready or live match and moves its winner up.
    ///
    /// # Errors
    ///
    /// If the match doesn't exist, isn't ready or live, or the winner doesn't
    /// play in it.
    pub fn report_result(&self, slug: &str, winner: &str) -> Result<Match, Error> {
        let (game, next) = self.registry.with_lock(slug, |entry| {
            let next = entry.r#match.report_result(winner)?;
            Ok((entry.r#match.clone(), next))
        })?;

        info!("result: {game}, {winner} won");
        self.advance(&game.tournament, next.as_ref(), winner)?;

        Ok(game)
    }

    /// # Errors
    ///
    /// If the match doesn't exist or isn't ready.
    pub fn mark_live(&self, slug: &str) -> Result<Match, Error> {
        self.registry.with_lock(slug, |entry| {
            entry.r#match.mark_live()?;
            info!("live: {}", entry.r#match);

            Ok(entry.r#match.clone())
        })
    }

    /// Finishes advancements a crash interrupted. Every step is idempotent,
    /// so running this on a consistent bracket changes nothing.
    ///
    /// # Errors
    ///
    /// If a bracket is inconsistent or saving fails.
    pub fn reconcile(&self) -> Result<(), Error> {
        let started: Vec<Tournament> = self
            .tournaments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tournaments
            .values()
            .filter(|tournament| tournament.started)
            .cloned()
            .collect();

        for tournament in started {
            for slug in tournament.rounds.iter().flatten() {
                let game = self.registry.get(slug)?.r#match;

                match (game.status, &game.winner) {
                    (MatchStatus::Pending, _) if game.position.round == 0 => self.seed(slug)?,
                    (MatchStatus::Completed, Some(winner)) => {
                        self.advance(&tournament.slug, game.next.as_ref(), winner)?;
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

/// Creates the veto of a match whose two slots are filled.
fn open_veto(entry: &mut MatchEntry) -> Result<(), Error> {
    let game = &mut entry.r#match;

    if entry.veto.is_some() {
        return Ok(());
    }
    let Some(teams) = game.teams() else {
        return Ok(());
    };

    entry.veto = Some(VetoSession::create(
        &game.slug,
        &game.veto_format,
        &game.map_pool,
        Some(teams),
    )?);
    game.begin_veto();

    info!("veto opened: {game}");
    Ok(())
}
