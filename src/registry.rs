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

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Context;
use log::{debug, error, info};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    Slug,
    bracket::Match,
    error::Error,
    utils,
    veto::{VetoAction, VetoSession, VetoStatus},
};

const MATCHES_FOLDER: &str = "matches";

/// A match and its veto, saved and replaced as one unit.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchEntry {
    pub r#match: Match,
    pub veto: Option<VetoSession>,
}

/// The shared store of matches.
///
/// Every entry sits behind its own mutex, so work on one match never waits
/// on another. The outer map lock is only held to look up or add an entry.
#[derive(Debug, Default)]
pub struct MatchRegistry {
    entries: Mutex<FxHashMap<Slug, Arc<Mutex<MatchEntry>>>>,
    data_dir: Option<PathBuf>,
}

impl MatchRegistry {
    #[must_use]
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            data_dir,
        }
    }

    /// Loads every saved match and rebuilds each veto from its action log.
    ///
    /// # Errors
    ///
    /// If a match file can't be read, or a veto log doesn't replay.
    pub fn load(data_dir: PathBuf) -> anyhow::Result<Self> {
        let mut entries = FxHashMap::default();
        let folder = data_dir.join(MATCHES_FOLDER);

        if folder.exists() {
            for file in fs::read_dir(&folder)? {
                let path = file?.path();
                if path.extension().is_none_or(|extension| extension != "ron") {
                    continue;
                }

                let Some(mut entry) = utils::read_ron::<MatchEntry>(&path)? else {
                    continue;
                };

                if let Some(veto) = &mut entry.veto {
                    veto.replay()
                        .with_context(|| format!("replay: {}", path.display()))?;
                }

                entries.insert(entry.r#match.slug.clone(), Arc::new(Mutex::new(entry)));
            }
        }

        info!("loaded {} matches", entries.len());

        Ok(Self {
            entries: Mutex::new(entries),
            data_dir: Some(data_dir),
        })
    }

    fn slot(&self, slug: &str) -> Result<Arc<Mutex<MatchEntry>>, Error> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        entries
            .get(slug)
            .cloned()
            .ok_or_else(|| Error::MatchNotFound(slug.to_string()))
    }

    /// # Errors
    ///
    /// If the slug is taken or saving fails.
    pub fn insert(&self, entry: MatchEntry) -> Result<(), Error> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let slug = entry.r#match.slug.clone();

        if entries.contains_key(&slug) {
            return Err(Error::MatchExists(slug));
        }

        self.save(&entry)?;
        entries.insert(slug, Arc::new(Mutex::new(entry)));

        Ok(())
    }

    /// Drops the match and its file. Unknown slugs are ignored.
    pub fn remove(&self, slug: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.remove(slug).is_some()
            && let Some(data_dir) = &self.data_dir
        {
            let path = match_file(data_dir, slug);
            if let Err(error) = fs::remove_file(&path)
                && error.kind() != ErrorKind::NotFound
            {
                error!("remove {}: {error}", path.display());
            }
        }
    }

    /// A copy of the entry.
    ///
    /// # Errors
    ///
    /// If the match doesn't exist.
    pub fn get(&self, slug: &str) -> Result<MatchEntry, Error> {
        let slot = self.slot(slug)?;
        let entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(entry.clone())
    }

    /// Copies of every entry, ordered by tournament then bracket position.
    #[must_use]
    pub fn list(&self) -> Vec<MatchEntry> {
        let slots: Vec<_> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut entries: Vec<_> = slots
            .iter()
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect();

        entries.sort_by(|a, b| {
            (&a.r#match.tournament, a.r#match.position)
                .cmp(&(&b.r#match.tournament, b.r#match.position))
        });

        entries
    }

    /// Runs `f` on a copy of the entry while holding the match's lock.
    ///
    /// The copy is saved and swapped in only when `f` succeeds, so a failed
    /// `f` leaves the entry exactly as it was. Whoever takes the lock first
    /// wins; the next caller sees the state it left behind.
    ///
    /// # Errors
    ///
    /// If the match doesn't exist, `f` fails, or saving fails.
    pub fn with_lock<T>(
        &self,
        slug: &str,
        f: impl FnOnce(&mut MatchEntry) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let slot = self.slot(slug)?;
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let mut draft = entry.clone();
        let value = f(&mut draft)?;

        if draft != *entry {
            self.save(&draft)?;
            *entry = draft;
        }

        Ok(value)
    }

    /// Persists the match and its veto together.
    ///
    /// # Errors
    ///
    /// If writing the file fails.
    pub fn save(&self, entry: &MatchEntry) -> Result<(), Error> {
        if let Some(data_dir) = &self.data_dir {
            let path = match_file(data_dir, &entry.r#match.slug);
            utils::write_ron(&path, entry).map_err(Error::persist)?;
            debug!("saved {}", path.display());
        }

        Ok(())
    }

    /// Applies one veto action to the match's veto. When it completes the
    /// veto, the match becomes ready.
    ///
    /// # Errors
    ///
    /// If the match doesn't exist or has no veto, or the veto rejects the
    /// action.
    pub fn apply_veto_action(&self, slug: &str, action: &VetoAction) -> Result<VetoSession, Error> {
        self.with_lock(slug, |entry| {
            let Some(veto) = &mut entry.veto else {
                return Err(Error::NoVeto(slug.to_string()));
            };

            veto.apply_action(action)?;

            if veto.status == VetoStatus::Completed {
                entry.r#match.veto_completed();
                info!("veto completed: {}", entry.r#match);
            }

            Ok(veto.clone())
        })
    }
}

fn match_file(data_dir: &Path, slug: &str) -> PathBuf {
    data_dir.join(MATCHES_FOLDER).join(format!("{slug}.ron"))
}
