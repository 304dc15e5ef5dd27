//! Recorded app states and their persistence.
//!
//! This module defines the point-in-time resolution record kept for every app
//! (branch, commit, version) and the collection persisted to `sites/app_states.json`.
//!
//! # Public API
//! - [`AppState`]: One fully populated resolution record
//! - [`AppStates`]: The collection, keyed by app name, with explicit load/save
//! - [`AppStateTracker`]: Resolves apps into a fresh collection, skipping failures
//! - [`StateDiff`]: What changed between two collections
//!
//! # Strategy
//! - **JSON persistence**: Human-readable `app_states.json`, pretty printed, written
//!   to a temporary file and renamed into place
//! - **Disposable on disk**: An unreadable file is an empty collection, the next
//!   rebuild overwrites it
//! - **All or nothing per app**: A record is only built once every field resolved
//! - **Swap, never patch**: A rebuild produces a new collection which replaces the old

use crate::core::{
    error::{AppyardError, Result},
    git::GitRepo,
    version::VersionResolver,
    workspace::App,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const STATES_TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub branch: String,
    pub commit_hash: String,
    pub version: String,
    pub resolved_at: DateTime<Utc>,
}

/// Which apps to rebuild the state of
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSelection {
    All,
    One(String),
}

impl AppSelection {
    pub fn from_option(app: Option<String>) -> Self {
        app.map_or(Self::All, Self::One)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppStates {
    states: BTreeMap<String, AppState>,
}

/// A single field that differs between two records of the same app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub app: String,
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<FieldChange>,
}

impl StateDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl AppStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted collection; a missing file is an empty collection
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Like [`AppStates::load`], but a file that cannot be read or parsed is empty
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(states) => states,
            Err(e) => {
                log::warn!("Ignoring unreadable app states in {}: {e}", path.display());
                Self::new()
            }
        }
    }

    /// Write to a sibling temporary file, then rename it over `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let file_name = path.file_name().ok_or_else(|| {
            AppyardError::config_error(format!("Not a state file path: {}", path.display()))
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_file_name(format!(".{}{STATES_TMP_SUFFIX}", file_name.to_string_lossy()));
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, content)?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn get(&self, app: &str) -> Option<&AppState> {
        self.states.get(app)
    }

    pub fn insert(&mut self, app: impl Into<String>, state: AppState) {
        self.states.insert(app.into(), state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AppState)> {
        self.states.iter()
    }

    /// Compare `self` (before) with `other` (after); `resolved_at` is ignored
    pub fn diff(&self, other: &AppStates) -> StateDiff {
        let mut diff = StateDiff::default();

        for (app, after) in &other.states {
            let Some(before) = self.states.get(app) else {
                diff.added.push(app.clone());
                continue;
            };

            let fields = [
                ("branch", &before.branch, &after.branch),
                ("commit_hash", &before.commit_hash, &after.commit_hash),
                ("version", &before.version, &after.version),
            ];
            for (field, old, new) in fields {
                if old != new {
                    diff.changed.push(FieldChange {
                        app: app.clone(),
                        field,
                        before: old.clone(),
                        after: new.clone(),
                    });
                }
            }
        }

        diff.removed = self
            .states
            .keys()
            .filter(|app| !other.states.contains_key(*app))
            .cloned()
            .collect();

        diff
    }
}

/// Builds [`AppState`] records from the on-disk repositories
pub struct AppStateTracker<'a> {
    resolver: &'a VersionResolver,
}

impl<'a> AppStateTracker<'a> {
    pub fn new(resolver: &'a VersionResolver) -> Self {
        Self { resolver }
    }

    /// Resolve the full record of one app; no network access
    pub fn resolve(&self, app: &App) -> Result<AppState> {
        let repo = GitRepo::open(&app.path)?;
        let branch = repo.current_branch()?;
        let commit_hash = repo.head_commit()?;
        let version = self.resolver.resolve_current_version(app)?;

        Ok(AppState {
            branch,
            commit_hash,
            version,
            resolved_at: Utc::now(),
        })
    }

    /// Resolve every app into a fresh collection, leaving out the ones that fail
    pub fn rebuild(&self, apps: &[App]) -> AppStates {
        let mut states = AppStates::new();

        for app in apps {
            match self.resolve(app) {
                Ok(state) => {
                    log::debug!("{}: {} @ {} ({})", app.name, state.branch, state.commit_hash, state.version);
                    states.insert(&app.name, state);
                }
                Err(e) => log::warn!("Skipping state of {}: {e}", app.name),
            }
        }

        states
    }
}
