//! Version resolution for installed apps, locally and at an upstream branch.
//!
//! The current version is read from the first manifest that declares one:
//!
//! 1. `pyproject.toml` `[project] version`
//! 2. `setup.cfg` `[metadata] version`
//! 3. `__version__ = "..."` in `<module>/__init__.py`
//! 4. `version="..."` in a legacy `setup.py`
//!
//! The upstream version is read from `<module>/__init__.py` as it exists at
//! `refs/remotes/<upstream>/<branch>`, without touching the working tree.

use crate::core::{
    config::{NetworkConfig, WorkspaceConfig},
    error::{AppyardError, Result},
    git::{GitRepo, RefFile},
    manifest::{self, INIT_FILE, PYPROJECT_FILE, SETUP_CFG_FILE, SETUP_PY_FILE},
    workspace::{App, Workspace},
};

const VERSION_FIELD: &str = "__version__";
const DEVELOP_VERSION_FIELD: &str = "develop_version";

/// Which manifest a current version was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    Pyproject,
    SetupCfg,
    EntryPoint,
    SetupPy,
}

/// Comparison of the installed and upstream major versions of one app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeDecision {
    pub current_major: u64,
    pub upstream_major: u64,
    pub is_upgrade: bool,
}

impl UpgradeDecision {
    pub fn new(current_major: u64, upstream_major: u64) -> Self {
        Self {
            current_major,
            upstream_major,
            is_upgrade: upstream_major > current_major,
        }
    }
}

/// Major component of a semantic version string
pub fn major_version(version: &str) -> Result<u64> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    semver::Version::parse(trimmed)
        .map(|parsed| parsed.major)
        .map_err(|e| AppyardError::invalid_version(version, e))
}

pub struct VersionResolver {
    upstream_remote: String,
    framework_app: String,
    network: NetworkConfig,
}

impl VersionResolver {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            upstream_remote: config.upstream_remote.clone(),
            framework_app: config.framework_app.clone(),
            network: config.network.clone(),
        }
    }

    pub fn resolve_current_version(&self, app: &App) -> Result<String> {
        self.resolve_current_version_with_source(app)
            .map(|(version, _)| version)
    }

    /// Current version together with the manifest it came from
    pub fn resolve_current_version_with_source(&self, app: &App) -> Result<(String, VersionSource)> {
        if let Some(version) = manifest::pyproject_field(&app.path.join(PYPROJECT_FILE), "version")? {
            return Ok((version, VersionSource::Pyproject));
        }

        if let Some(version) =
            manifest::setup_cfg_field(&app.path.join(SETUP_CFG_FILE), "metadata", "version")?
        {
            return Ok((version, VersionSource::SetupCfg));
        }

        if let Some(contents) = manifest::read_optional(&app.entry_point())? {
            if let Some(version) = manifest::assignment_value(&contents, VERSION_FIELD) {
                return Ok((version, VersionSource::EntryPoint));
            }
        }

        if let Some(contents) = manifest::read_optional(&app.path.join(SETUP_PY_FILE))? {
            if let Some(version) = manifest::keyword_argument_value(&contents, "version") {
                return Ok((version, VersionSource::SetupPy));
            }
        }

        Err(AppyardError::version_not_found(app.path.display().to_string()))
    }

    /// Version of `app` on `<upstream>/<branch>`; `branch` defaults to the active branch.
    ///
    /// Returns `Ok(None)` when the remote-tracking ref does not exist.
    pub fn resolve_upstream_version(&self, app: &App, branch: Option<&str>) -> Result<Option<String>> {
        let repo = GitRepo::open(&app.path)?.with_network(&self.network);
        let branch = match branch {
            Some(branch) => branch.to_string(),
            None => repo.current_branch()?,
        };

        if let Err(e) = repo.fetch_branch_shallow(&self.upstream_remote, &branch) {
            log::warn!(
                "Could not fetch {}/{branch} for {}: {e}",
                self.upstream_remote,
                app.name
            );
        }

        let path = format!("{}/{INIT_FILE}", app.module());
        let source_name = format!("{}/{branch}:{path}", self.upstream_remote);
        match repo.read_file_at_remote_ref(&self.upstream_remote, &branch, &path)? {
            RefFile::MissingRef => Ok(None),
            RefFile::MissingFile => Err(AppyardError::version_not_found(source_name)),
            RefFile::Content(contents) => manifest::assignment_value(&contents, VERSION_FIELD)
                .map(Some)
                .ok_or_else(|| AppyardError::version_not_found(source_name)),
        }
    }

    /// `develop_version` declared in the app's `hooks.py`
    pub fn resolve_develop_version(&self, app: &App) -> Result<Option<String>> {
        let Some(contents) = manifest::read_optional(&app.hooks_file())? else {
            return Ok(None);
        };
        Ok(manifest::assignment_value(&contents, DEVELOP_VERSION_FIELD))
    }

    /// Compare the installed major version of `app` with the one on `<upstream>/<branch>`
    pub fn upgrade_decision(&self, app: &App, branch: &str) -> Result<UpgradeDecision> {
        let current = self.resolve_current_version(app)?;
        let upstream = self
            .resolve_upstream_version(app, Some(branch))?
            .ok_or_else(|| AppyardError::invalid_branch(&app.name, branch))?;

        let decision = UpgradeDecision::new(major_version(&current)?, major_version(&upstream)?);
        log::debug!(
            "{}: {current} -> {upstream} on {branch} (upgrade: {})",
            app.name,
            decision.is_upgrade
        );
        Ok(decision)
    }

    /// Major version of the framework app, `0` when it cannot be read
    pub fn framework_major_version(&self, workspace: &Workspace) -> u64 {
        let major = workspace
            .app(&self.framework_app)
            .and_then(|app| self.resolve_current_version(&app))
            .and_then(|version| major_version(&version));

        match major {
            Ok(major) => major,
            Err(e) => {
                log::debug!("Could not read {} version: {e}", self.framework_app);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    fn git_in(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn app_at(path: &Path, folder: &str) -> App {
        App {
            name: folder.to_string(),
            folder: folder.to_string(),
            path: path.to_path_buf(),
            remote_ref: Some("upstream".to_string()),
        }
    }

    fn write_init(app_path: &Path, module: &str, version: &str) {
        let module_dir = app_path.join(module);
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(
            module_dir.join(INIT_FILE),
            format!("__version__ = \"{version}\"\n"),
        )
        .unwrap();
    }

    fn resolver() -> VersionResolver {
        VersionResolver::new(&WorkspaceConfig::default())
    }

    /// A local clone of a bare repository, the bare one acting as `upstream`
    fn clone_with_upstream(version: &str) -> (TempDir, App) {
        let temp_dir = TempDir::new().unwrap();
        let seed = temp_dir.path().join("seed");
        let bare = temp_dir.path().join("hrms.git");
        let clone = temp_dir.path().join("hrms");
        fs::create_dir_all(&seed).unwrap();

        git_in(&seed, &["init", "-q", "-b", "develop"]);
        git_in(&seed, &["config", "user.name", "Test User"]);
        git_in(&seed, &["config", "user.email", "test@example.com"]);
        write_init(&seed, "hrms", version);
        git_in(&seed, &["add", "."]);
        git_in(&seed, &["commit", "-q", "-m", "init"]);
        git_in(
            temp_dir.path(),
            &["clone", "-q", "--bare", "seed", "hrms.git"],
        );
        git_in(
            temp_dir.path(),
            &["clone", "-q", "-o", "upstream", bare.to_str().unwrap(), "hrms"],
        );

        let app = app_at(&clone, "hrms");
        (temp_dir, app)
    }

    #[test]
    fn test_pyproject_wins_over_entry_point() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(PYPROJECT_FILE),
            "[project]\nname = \"hrms\"\nversion = \"16.0.0\"\n",
        )
        .unwrap();
        write_init(temp_dir.path(), "hrms", "15.0.0");

        let app = app_at(temp_dir.path(), "hrms");
        let (version, source) = resolver().resolve_current_version_with_source(&app).unwrap();
        assert_eq!(version, "16.0.0");
        assert_eq!(source, VersionSource::Pyproject);
    }

    #[test]
    fn test_dynamic_pyproject_falls_through_to_entry_point() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(PYPROJECT_FILE),
            "[project]\nname = \"hrms\"\ndynamic = [\"version\"]\n",
        )
        .unwrap();
        write_init(temp_dir.path(), "hrms", "15.3.1");

        let app = app_at(temp_dir.path(), "hrms");
        let (version, source) = resolver().resolve_current_version_with_source(&app).unwrap();
        assert_eq!(version, "15.3.1");
        assert_eq!(source, VersionSource::EntryPoint);
    }

    #[test]
    fn test_setup_cfg_and_legacy_setup_py() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(SETUP_PY_FILE), "setup(name='old', version='13.2.0')\n").unwrap();
        let app = app_at(temp_dir.path(), "old");

        let (version, source) = resolver().resolve_current_version_with_source(&app).unwrap();
        assert_eq!((version.as_str(), source), ("13.2.0", VersionSource::SetupPy));

        fs::write(temp_dir.path().join(SETUP_CFG_FILE), "[metadata]\nversion = 13.3.0\n").unwrap();
        let (version, source) = resolver().resolve_current_version_with_source(&app).unwrap();
        assert_eq!((version.as_str(), source), ("13.3.0", VersionSource::SetupCfg));
    }

    #[test]
    fn test_no_manifest_is_version_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let app = app_at(temp_dir.path(), "empty");
        assert!(matches!(
            resolver().resolve_current_version(&app),
            Err(AppyardError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_develop_version_from_hooks() {
        let temp_dir = TempDir::new().unwrap();
        let module_dir = temp_dir.path().join("hrms");
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(
            module_dir.join("hooks.py"),
            "app_name = \"hrms\"\ndevelop_version = \"16.x.x-develop\"\n",
        )
        .unwrap();

        let app = app_at(temp_dir.path(), "hrms");
        assert_eq!(
            resolver().resolve_develop_version(&app).unwrap(),
            Some("16.x.x-develop".to_string())
        );
    }

    #[test]
    fn test_upgrade_decision_is_strictly_greater() {
        assert!(UpgradeDecision::new(14, 15).is_upgrade);
        assert!(!UpgradeDecision::new(15, 15).is_upgrade);
        assert!(!UpgradeDecision::new(15, 14).is_upgrade);
    }

    #[test]
    fn test_major_version() {
        assert_eq!(major_version("15.2.0").unwrap(), 15);
        assert_eq!(major_version("16.0.0-dev").unwrap(), 16);
        assert_eq!(major_version("v14.1.3").unwrap(), 14);
        assert!(matches!(
            major_version("develop"),
            Err(AppyardError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_upstream_version_of_existing_branch() {
        let (_temp_dir, app) = clone_with_upstream("16.0.0-dev");
        assert_eq!(
            resolver().resolve_upstream_version(&app, Some("develop")).unwrap(),
            Some("16.0.0-dev".to_string())
        );
    }

    #[test]
    fn test_upstream_version_of_missing_branch_is_none() {
        let (_temp_dir, app) = clone_with_upstream("16.0.0-dev");
        assert_eq!(
            resolver()
                .resolve_upstream_version(&app, Some("version-99"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_upstream_version_without_assignment_is_version_not_found() {
        let (_temp_dir, app) = clone_with_upstream("16.0.0-dev");
        let seed = app.path.parent().unwrap().join("seed");
        fs::write(seed.join("hrms").join(INIT_FILE), "__version__ = get_version()\n").unwrap();
        git_in(&seed, &["commit", "-q", "-am", "dynamic version"]);
        git_in(&seed, &["push", "-q", "../hrms.git", "develop"]);

        assert!(matches!(
            resolver().resolve_upstream_version(&app, Some("develop")),
            Err(AppyardError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_upstream_ref_without_entry_point_is_version_not_found() {
        let (_temp_dir, app) = clone_with_upstream("16.0.0-dev");
        let seed = app.path.parent().unwrap().join("seed");
        git_in(&seed, &["rm", "-q", "hrms/__init__.py"]);
        git_in(&seed, &["commit", "-q", "-m", "drop entry point"]);
        git_in(&seed, &["push", "-q", "../hrms.git", "develop"]);

        assert!(matches!(
            resolver().resolve_upstream_version(&app, Some("develop")),
            Err(AppyardError::VersionNotFound { .. })
        ));
    }

    fn workspace_with_framework(init: Option<&str>) -> (TempDir, Workspace) {
        let temp_dir = TempDir::new().unwrap();
        for dir in crate::core::workspace::WORKSPACE_DIRS {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        let framework = temp_dir.path().join("apps").join("frappe");
        fs::create_dir_all(framework.join("frappe")).unwrap();
        if let Some(init) = init {
            fs::write(framework.join("frappe").join(INIT_FILE), init).unwrap();
        }

        let workspace =
            Workspace::with_config(temp_dir.path().to_path_buf(), WorkspaceConfig::default()).unwrap();
        (temp_dir, workspace)
    }

    #[test]
    fn test_framework_major_version() {
        let (_temp_dir, workspace) = workspace_with_framework(Some("__version__ = \"15.38.2\"\n"));
        assert_eq!(resolver().framework_major_version(&workspace), 15);
    }

    #[test]
    fn test_framework_major_version_defaults_to_zero() {
        let (_unversioned, workspace) = workspace_with_framework(None);
        assert_eq!(resolver().framework_major_version(&workspace), 0);

        let (_not_semver, workspace) = workspace_with_framework(Some("__version__ = \"develop\"\n"));
        assert_eq!(resolver().framework_major_version(&workspace), 0);

        let empty = TempDir::new().unwrap();
        let workspace = Workspace::with_config(empty.path().to_path_buf(), WorkspaceConfig::default()).unwrap();
        assert_eq!(resolver().framework_major_version(&workspace), 0);
    }

    #[test]
    fn test_upgrade_decision_against_upstream() {
        let (_temp_dir, app) = clone_with_upstream("16.0.0-dev");
        fs::write(app.entry_point(), "__version__ = \"15.4.0\"\n").unwrap();

        let decision = resolver().upgrade_decision(&app, "develop").unwrap();
        assert_eq!(decision, UpgradeDecision::new(15, 16));
        assert!(decision.is_upgrade);

        assert!(matches!(
            resolver().upgrade_decision(&app, "version-99"),
            Err(AppyardError::InvalidBranch { .. })
        ));
    }
}
