//! Git repository and workspace setup utilities
//!
//! Builds throwaway workspaces (`apps/`, `sites/`, `config/`, `logs/`,
//! `config/pids/`) whose apps are clones of bare upstream repositories living next
//! to the workspace.

#![allow(dead_code)]

use appyard::core::error::{AppyardError, Result};
use appyard::core::workspace::WORKSPACE_DIRS;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A workspace plus the directory holding its apps' upstream repositories.
/// The TempDir must be kept alive for the duration of the test.
pub struct TestWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub remotes: PathBuf,
}

impl TestWorkspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn app_path(&self, app: &str) -> PathBuf {
        self.root.join("apps").join(app)
    }

    pub fn upstream_path(&self, app: &str) -> PathBuf {
        self.remotes.join(format!("{app}.git"))
    }

    fn seed_path(&self, app: &str) -> PathBuf {
        self.remotes.join(format!("seed-{app}"))
    }
}

/// Run git in `dir`, failing with the command's stderr
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    if !output.status.success() {
        return Err(AppyardError::command_failed(
            format!("git {}", args.join(" ")),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr),
        ));
    }
    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

fn configure_user(dir: &Path) -> Result<()> {
    git(dir, &["config", "user.name", "Test User"])?;
    git(dir, &["config", "user.email", "test@example.com"])?;
    Ok(())
}

/// An empty workspace directory tree
pub fn setup_workspace() -> Result<TestWorkspace> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("bench");
    let remotes = temp_dir.path().join("remotes");

    for dir in WORKSPACE_DIRS {
        fs::create_dir_all(root.join(dir))?;
    }
    fs::create_dir_all(&remotes)?;

    Ok(TestWorkspace {
        temp_dir,
        root,
        remotes,
    })
}

/// Write the files that make `dir` an app at `version`
pub fn write_app_files(dir: &Path, app: &str, version: &str) -> Result<()> {
    let module = dir.join(app);
    fs::create_dir_all(&module)?;
    fs::write(
        module.join("__init__.py"),
        format!("__version__ = \"{version}\"\n"),
    )?;
    fs::write(
        module.join("hooks.py"),
        format!("app_name = \"{app}\"\nrequired_apps = [\"frappe\"]\n"),
    )?;
    fs::write(module.join("modules.txt"), format!("{app}\n"))?;
    fs::write(module.join("patches.txt"), "")?;
    Ok(())
}

/// Create the bare upstream of `app` with one commit per `(branch, version)` pair.
/// The first branch is the default branch.
pub fn create_upstream(ws: &TestWorkspace, app: &str, branches: &[(&str, &str)]) -> Result<PathBuf> {
    let seed = ws.seed_path(app);
    fs::create_dir_all(&seed)?;

    let (first_branch, _) = branches
        .first()
        .ok_or_else(|| AppyardError::config_error("an upstream needs at least one branch"))?;
    git(&seed, &["init", "-q", "-b", first_branch])?;
    configure_user(&seed)?;

    for (branch, version) in branches {
        git(&seed, &["checkout", "-q", "-B", branch])?;
        write_app_files(&seed, app, version)?;
        git(&seed, &["add", "."])?;
        git(&seed, &["commit", "-q", "-m", &format!("{app} {version}")])?;
    }
    git(&seed, &["checkout", "-q", first_branch])?;

    let bare = ws.upstream_path(app);
    git(
        &ws.remotes,
        &["clone", "-q", "--bare", seed.to_str().unwrap_or_default(), bare.to_str().unwrap_or_default()],
    )?;
    Ok(bare)
}

/// Add a commit at `version` on `branch` of an existing upstream
pub fn push_upstream_version(ws: &TestWorkspace, app: &str, branch: &str, version: &str) -> Result<()> {
    let seed = ws.seed_path(app);
    git(&seed, &["checkout", "-q", "-B", branch])?;
    write_app_files(&seed, app, version)?;
    git(&seed, &["commit", "-q", "-am", &format!("{app} {version}")])?;
    let bare = ws.upstream_path(app);
    git(&seed, &["push", "-q", bare.to_str().unwrap_or_default(), branch])?;
    Ok(())
}

/// Tag the tip of `branch` on the upstream of `app`
pub fn tag_upstream(ws: &TestWorkspace, app: &str, branch: &str, tag: &str) -> Result<()> {
    git(&ws.upstream_path(app), &["tag", tag, branch])?;
    Ok(())
}

/// Clone the upstream of `app` into `apps/<app>` with the remote named `upstream`
pub fn install_app(ws: &TestWorkspace, app: &str, branch: &str) -> Result<PathBuf> {
    let target = ws.app_path(app);
    let upstream = ws.upstream_path(app);
    git(
        &ws.root.join("apps"),
        &[
            "clone",
            "-q",
            "-o",
            "upstream",
            "-b",
            branch,
            upstream.to_str().unwrap_or_default(),
            app,
        ],
    )?;
    configure_user(&target)?;
    Ok(target)
}

/// Depth-1, single-branch clone over `file://` so the clone really is shallow
pub fn install_app_shallow(ws: &TestWorkspace, app: &str, branch: &str) -> Result<PathBuf> {
    let target = ws.app_path(app);
    let url = format!("file://{}", ws.upstream_path(app).display());
    git(
        &ws.root.join("apps"),
        &["clone", "-q", "--depth=1", "-o", "upstream", "-b", branch, &url, app],
    )?;
    configure_user(&target)?;
    Ok(target)
}

/// A plain git repository under `apps/` with no upstream and the given files
pub fn install_local_repo(ws: &TestWorkspace, app: &str, files: &[(&str, &str)]) -> Result<PathBuf> {
    let target = ws.app_path(app);
    fs::create_dir_all(&target)?;
    git(&target, &["init", "-q", "-b", "develop"])?;
    configure_user(&target)?;
    for (path, content) in files {
        let file = target.join(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file, content)?;
    }
    fs::write(target.join("README.md"), app)?;
    git(&target, &["add", "."])?;
    git(&target, &["commit", "-q", "-m", "init"])?;
    Ok(target)
}

pub fn active_branch(repo: &Path) -> Result<String> {
    git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// A site directory carrying a site config
pub fn create_site(ws: &TestWorkspace, site: &str) -> Result<()> {
    let dir = ws.root.join("sites").join(site);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("site_config.json"), "{}")?;
    Ok(())
}
