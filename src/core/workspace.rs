//! The workspace context: root directory, configuration, installed apps and their
//! recorded states.
//!
//! A workspace is a directory holding `apps/`, `sites/`, `config/`, `logs/` and
//! `config/pids/`. Every app lives in its own git repository under `apps/<folder>`.
//!
//! # Public API
//! - [`Workspace`]: Owns the root, the typed [`WorkspaceConfig`] and the in-memory
//!   [`AppStates`] collection
//! - [`App`]: One installed app repository
//! - [`is_workspace_directory`] / [`find_parent_workspace`]: Workspace discovery
//! - [`is_app_directory`]: Recognise an app checkout by its marker files
//!
//! # Name reconciliation
//! An app folder may be named differently from the distribution it contains. Resolving
//! the canonical name ([`Workspace::resolve_canonical_name`]) never touches the disk;
//! renaming the folder is a separate, explicit step
//! ([`Workspace::reconcile_directory_name`]).

use crate::core::{
    app_state::{AppSelection, AppStateTracker, AppStates, StateDiff},
    config::WorkspaceConfig,
    error::{AppyardError, Result},
    git::GitRepo,
    manifest::{self, PYPROJECT_FILE, SETUP_CFG_FILE, SETUP_PY_FILE},
    version::VersionResolver,
};
use std::fs;
use std::path::{Path, PathBuf};

pub const WORKSPACE_DIRS: [&str; 5] = ["apps", "sites", "config", "logs", "config/pids"];
pub const APP_MARKER_FILES: [&str; 3] = ["hooks.py", "modules.txt", "patches.txt"];
pub const STATES_FILE: &str = "app_states.json";
pub const SITE_CONFIG_FILE: &str = "site_config.json";

/// One installed application repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub name: String,
    pub folder: String,
    pub path: PathBuf,
    /// `upstream` if configured, otherwise the first remote, if any
    pub remote_ref: Option<String>,
}

impl App {
    /// Name of the python package inside the repository
    pub fn module(&self) -> &str {
        &self.folder
    }

    pub fn entry_point(&self) -> PathBuf {
        self.path.join(self.module()).join(manifest::INIT_FILE)
    }

    pub fn hooks_file(&self) -> PathBuf {
        self.path.join(self.module()).join(manifest::HOOKS_FILE)
    }
}

pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
    states: AppStates,
}

/// True when every workspace directory exists below `directory`
pub fn is_workspace_directory(directory: &Path) -> bool {
    WORKSPACE_DIRS
        .iter()
        .all(|folder| directory.join(folder).exists())
}

/// Walk up from `path` until a workspace is found, stopping at home and the filesystem root.
/// `path` is canonicalized first so a relative start such as `.` reaches its real parents.
pub fn find_parent_workspace(path: &Path) -> Option<PathBuf> {
    let start = match path.canonicalize() {
        Ok(start) => start,
        Err(e) => {
            log::debug!("Cannot resolve {}: {e}", path.display());
            return None;
        }
    };
    let home = crate::core::dirs::get_home_directory()
        .map(|home| home.canonicalize().unwrap_or(home));

    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if is_workspace_directory(dir) {
            return Some(dir.to_path_buf());
        }
        if home.as_deref() == Some(dir) {
            return None;
        }
        current = dir.parent();
    }

    None
}

/// True when all app marker files exist somewhere below `directory`
pub fn is_app_directory(directory: &Path) -> bool {
    APP_MARKER_FILES
        .iter()
        .all(|marker| contains_file(directory, marker))
}

fn contains_file(directory: &Path, file_name: &str) -> bool {
    let Ok(entries) = fs::read_dir(directory) else {
        return false;
    };

    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() && entry.file_name() == file_name {
            return true;
        }
        if file_type.is_dir() && !matches!(entry.file_name().to_str(), Some(".git" | "node_modules")) {
            subdirs.push(path);
        }
    }

    subdirs.iter().any(|dir| contains_file(dir, file_name))
}

impl Workspace {
    /// Open the workspace at `root`, loading its configuration and recorded states
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config = WorkspaceConfig::load(&root)?;
        Self::with_config(root, config)
    }

    pub fn with_config(root: PathBuf, config: WorkspaceConfig) -> Result<Self> {
        let states = AppStates::load_or_empty(&root.join("sites").join(STATES_FILE));
        Ok(Self {
            root,
            config,
            states,
        })
    }

    /// Find the workspace containing `start`
    pub fn discover<P: AsRef<Path>>(start: P) -> Result<Self> {
        let root = find_parent_workspace(start.as_ref()).ok_or(AppyardError::NotInWorkspace)?;
        log::debug!("Using workspace at {}", root.display());
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.root.join("apps")
    }

    pub fn sites_dir(&self) -> PathBuf {
        self.root.join("sites")
    }

    pub fn states_path(&self) -> PathBuf {
        self.sites_dir().join(STATES_FILE)
    }

    pub fn states(&self) -> &AppStates {
        &self.states
    }

    /// App folders under `apps/`, sorted by name
    pub fn app_folders(&self) -> Result<Vec<String>> {
        let apps_dir = self.apps_dir();
        if !apps_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut folders: Vec<String> = fs::read_dir(&apps_dir)?
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        folders.sort();
        Ok(folders)
    }

    /// The installed app in `apps/<name>`
    pub fn app(&self, name: &str) -> Result<App> {
        let path = self.apps_dir().join(name);
        if !path.is_dir() {
            return Err(AppyardError::app_not_found(name));
        }

        let remote_ref = match GitRepo::open(&path) {
            Ok(repo) => repo.remote_ref(&self.config.upstream_remote)?,
            Err(e) => {
                log::debug!("{name} is not a git repository: {e}");
                None
            }
        };

        Ok(App {
            name: name.to_string(),
            folder: name.to_string(),
            path,
            remote_ref,
        })
    }

    pub fn apps(&self) -> Result<Vec<App>> {
        self.app_folders()?
            .iter()
            .map(|folder| self.app(folder))
            .collect()
    }

    /// Site directories under `sites/` (those carrying a site config), sorted by name
    pub fn sites(&self) -> Result<Vec<String>> {
        let sites_dir = self.sites_dir();
        if !sites_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut sites: Vec<String> = fs::read_dir(&sites_dir)?
            .flatten()
            .filter(|entry| entry.path().join(SITE_CONFIG_FILE).is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        sites.sort();
        Ok(sites)
    }

    /// Rebuild the recorded states of the selected apps.
    ///
    /// The persisted collection is loaded, the whole collection is cleared, the selected
    /// apps are resolved into a fresh collection which then replaces the old one and is
    /// saved. Apps that fail to resolve are left out. An unreadable previous file counts
    /// as empty, so every rebuilt app is reported as added.
    pub fn update_states(&mut self, selection: &AppSelection) -> Result<StateDiff> {
        let previous = AppStates::load_or_empty(&self.states_path());

        let targets = match selection {
            AppSelection::All => self.apps()?,
            AppSelection::One(name) => match self.app(name) {
                Ok(app) => vec![app],
                Err(e) => {
                    log::warn!("Skipping state of {name}: {e}");
                    Vec::new()
                }
            },
        };

        let resolver = VersionResolver::new(&self.config);
        let rebuilt = AppStateTracker::new(&resolver).rebuild(&targets);

        let diff = previous.diff(&rebuilt);
        self.states = rebuilt;
        self.states.save(&self.states_path())?;

        log::info!(
            "Recorded states for {} app(s): {} added, {} removed, {} changed",
            self.states.len(),
            diff.added.len(),
            diff.removed.len(),
            diff.changed.len()
        );

        Ok(diff)
    }

    /// Distribution name of the app in `apps/<folder>`, read from `pyproject.toml`,
    /// `setup.cfg` or `setup.py` in that order. Falls back to the folder name.
    pub fn resolve_canonical_name(&self, folder: &str) -> Result<String> {
        let app_path = self.apps_dir().join(folder);
        if !app_path.is_dir() {
            return Err(AppyardError::app_directory_missing(app_path));
        }

        if let Some(name) = manifest::pyproject_field(&app_path.join(PYPROJECT_FILE), "name")? {
            return Ok(name);
        }

        if let Some(name) =
            manifest::setup_cfg_field(&app_path.join(SETUP_CFG_FILE), "metadata", "name")?
        {
            return Ok(name);
        }

        if let Some(contents) = manifest::read_optional(&app_path.join(SETUP_PY_FILE))? {
            if let Some(name) = manifest::keyword_argument_value(&contents, "name") {
                return Ok(name);
            }
        }

        Ok(folder.to_string())
    }

    /// Rename `apps/<folder>` to the app's canonical name and return the final name
    pub fn reconcile_directory_name(&self, folder: &str) -> Result<String> {
        let canonical = self.resolve_canonical_name(folder)?;
        if canonical == folder {
            return Ok(canonical);
        }

        let from = self.apps_dir().join(folder);
        let to = self.apps_dir().join(&canonical);
        if to.exists() {
            return Err(AppyardError::config_error(format!(
                "Cannot rename {} to {}: target already exists",
                from.display(),
                to.display()
            )));
        }

        log::info!("Renaming app folder {folder} to {canonical}");
        fs::rename(&from, &to)?;
        Ok(canonical)
    }

    /// Point the `upstream` remote of the installed app named after `git_url` at `git_url`
    pub fn set_git_remote_url(&self, git_url: &str) -> Result<String> {
        let app_name = app_name_from_url(git_url)
            .ok_or_else(|| AppyardError::config_error(format!("Cannot derive an app name from {git_url}")))?;

        let app = self.app(&app_name)?;
        if !app.path.join(".git").exists() {
            log::warn!("{app_name} is not a git checkout, remote left untouched");
            return Ok(app_name);
        }

        GitRepo::open(&app.path)?.set_remote_url(&self.config.upstream_remote, git_url)?;
        log::info!("Set {} remote of {app_name} to {git_url}", self.config.upstream_remote);
        Ok(app_name)
    }
}

/// Last path component of a git URL without the `.git` suffix
pub fn app_name_from_url(git_url: &str) -> Option<String> {
    let last = git_url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}
