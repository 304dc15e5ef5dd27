//! Git repository reads and git command invocations for a single app.
//!
//! [`GitRepo`] wraps the `git2` library for local metadata reads (active branch, HEAD
//! commit, remotes, files at a remote-tracking ref) and shells out to the `git` binary
//! for anything that talks to a remote or mutates the working tree, exactly the way the
//! user would type it.
//!
//! # Public API
//! - [`GitRepo`]: Interface for one app repository
//! - [`RefFile`]: Outcome of reading a file at a remote-tracking ref
//! - [`run_git`]: Run a git command outside of any repository (e.g. `ls-remote`)
//!
//! # Key Features
//! - **Structured absence**: a missing ref is reported through git2 error codes, never by
//!   inspecting command output
//! - **Typed failures**: non-zero exits become [`AppyardError::CommandFailed`] with the
//!   exit code and stderr
//! - **Network timeouts**: network invocations receive the configured low-speed limits

use crate::core::{
    config::NetworkConfig,
    error::{AppyardError, Result},
};
use git2::{ErrorCode, Repository};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Content of a file looked up at `refs/remotes/<remote>/<branch>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefFile {
    /// The remote-tracking ref does not exist
    MissingRef,
    /// The ref exists but the path is not in its tree
    MissingFile,
    Content(String),
}

pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
    network: NetworkConfig,
}

/// Run `git <args>` in `cwd` and return its trimmed stdout
pub fn run_git(cwd: Option<&Path>, args: &[&str], env: &[(&'static str, String)]) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }

    let rendered = format!("git {}", args.join(" "));
    match cwd {
        Some(cwd) => log::debug!("$ cd {} && {rendered}", cwd.display()),
        None => log::debug!("$ {rendered}"),
    }

    let output = cmd.output().map_err(AppyardError::Io)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        log::warn!(
            "{rendered} executed with exit code {}",
            output.status.code().unwrap_or(-1)
        );
        return Err(AppyardError::command_failed(
            rendered,
            output.status.code(),
            stderr,
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl GitRepo {
    /// Open the repository rooted exactly at `path` (no upward discovery)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path.as_ref())?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.as_ref().to_path_buf());
        Ok(GitRepo {
            repo,
            workdir,
            network: NetworkConfig::default(),
        })
    }

    pub fn with_network(mut self, network: &NetworkConfig) -> Self {
        self.network = network.clone();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn get_repository(&self) -> &Repository {
        &self.repo
    }

    /// Execute a local git command in the repository's working directory
    fn git(&self, args: &[&str]) -> Result<String> {
        run_git(Some(&self.workdir), args, &[])
    }

    /// Execute a git command that talks to a remote
    fn git_network(&self, args: &[&str]) -> Result<String> {
        run_git(Some(&self.workdir), args, &self.network.git_env())
    }

    /// Branch HEAD points at, or `None` when HEAD is detached
    pub fn active_branch(&self) -> Result<Option<String>> {
        let head = self.repo.find_reference("HEAD")?;
        let Some(target) = head.symbolic_target() else {
            return Ok(None);
        };

        let name = target
            .strip_prefix("refs/heads/")
            .or_else(|| target.rsplit('/').next())
            .unwrap_or(target);
        Ok(Some(name.to_string()))
    }

    /// Like [`GitRepo::active_branch`] but a detached HEAD is an error
    pub fn current_branch(&self) -> Result<String> {
        self.active_branch()?
            .ok_or_else(|| AppyardError::DetachedHead {
                path: self.workdir.clone(),
            })
    }

    /// Full hash of the commit HEAD resolves to
    pub fn head_commit(&self) -> Result<String> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// A shallow clone carries a `shallow` marker file in its git directory
    pub fn is_shallow(&self) -> bool {
        self.repo.path().join("shallow").exists()
    }

    pub fn remotes(&self) -> Result<Vec<String>> {
        let remotes = self.repo.remotes()?;
        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    /// `preferred` when configured, otherwise the first listed remote
    pub fn remote_ref(&self, preferred: &str) -> Result<Option<String>> {
        let remotes = self.remotes()?;
        if remotes.iter().any(|name| name == preferred) {
            return Ok(Some(preferred.to_string()));
        }
        Ok(remotes.into_iter().next())
    }

    pub fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        match self.repo.find_remote(remote) {
            Ok(found) => Ok(found.url().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        self.git(&["remote", "set-url", remote, url]).map(|_| ())
    }

    /// Make `remote` track every branch instead of the ones chosen at clone time
    pub fn track_all_branches(&self, remote: &str) -> Result<()> {
        self.git(&["remote", "set-branches", remote, "*"]).map(|_| ())
    }

    /// Fetch every ref from `remote`, deepening the history first if the clone is shallow
    pub fn fetch_all(&self, remote: &str) -> Result<()> {
        let mut args = vec!["fetch", remote, "--quiet"];
        if self.is_shallow() {
            args.push("--unshallow");
        }
        self.git_network(&args).map(|_| ())
    }

    /// Depth-1, tag-less fetch of a single branch, enough to read its manifest
    pub fn fetch_branch_shallow(&self, remote: &str, branch: &str) -> Result<()> {
        self.git_network(&["fetch", "--depth=1", "--no-tags", remote, branch])
            .map(|_| ())
    }

    /// Read `path` from the tree of `refs/remotes/<remote>/<branch>` without checking it out
    pub fn read_file_at_remote_ref(&self, remote: &str, branch: &str, path: &str) -> Result<RefFile> {
        let refname = format!("refs/remotes/{remote}/{branch}");
        let reference = match self.repo.find_reference(&refname) {
            Ok(reference) => reference,
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                log::debug!("{refname} does not exist in {}", self.workdir.display());
                return Ok(RefFile::MissingRef);
            }
            Err(e) => return Err(e.into()),
        };

        let tree = reference.peel_to_tree()?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(RefFile::MissingFile),
            Err(e) => return Err(e.into()),
        };

        let object = entry.to_object(&self.repo)?;
        let Some(blob) = object.as_blob() else {
            return Ok(RefFile::MissingFile);
        };

        Ok(RefFile::Content(String::from_utf8(blob.content().to_vec())?))
    }

    /// `git checkout -f <branch>`, discarding local modifications
    pub fn checkout_force(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", "-f", branch]).map(|_| ())
    }
}
