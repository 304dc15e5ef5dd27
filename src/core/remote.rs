//! Validation that a branch or tag exists on a remote before anything is cloned
//! or switched.
//!
//! Answers are cached per `(remote, branch)` for the life of the validator. Only
//! definitive answers are cached; a transport failure is returned every time so a
//! transient outage can be retried.

use crate::core::{
    config::NetworkConfig,
    error::{AppyardError, Result},
    git::run_git,
};
use std::collections::HashMap;

/// Lists the heads and tags of a remote that match a name
pub trait RefLister {
    /// Raw listing, one ref per line; empty when nothing matched
    fn list_refs(&self, remote: &str, name: &str) -> Result<String>;
}

/// `git ls-remote --heads --tags <remote> <name>`
pub struct GitLsRemote {
    network: NetworkConfig,
}

impl GitLsRemote {
    pub fn new(network: &NetworkConfig) -> Self {
        Self {
            network: network.clone(),
        }
    }
}

impl RefLister for GitLsRemote {
    fn list_refs(&self, remote: &str, name: &str) -> Result<String> {
        run_git(
            None,
            &["ls-remote", "--heads", "--tags", remote, name],
            &self.network.git_env(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Found,
    NotFound,
}

pub struct RemoteBranchValidator<L: RefLister> {
    lister: L,
    cache: HashMap<(String, String), Outcome>,
}

impl RemoteBranchValidator<GitLsRemote> {
    pub fn with_git(network: &NetworkConfig) -> Self {
        Self::new(GitLsRemote::new(network))
    }
}

impl<L: RefLister> RemoteBranchValidator<L> {
    pub fn new(lister: L) -> Self {
        Self {
            lister,
            cache: HashMap::new(),
        }
    }

    /// Check that `branch` is a head or tag of `remote`; no branch always validates
    pub fn validate(&mut self, remote: &str, branch: Option<&str>) -> Result<()> {
        let Some(branch) = branch.filter(|branch| !branch.is_empty()) else {
            return Ok(());
        };

        let key = (remote.to_string(), branch.to_string());
        let outcome = match self.cache.get(&key) {
            Some(outcome) => *outcome,
            None => {
                let listing = self.lister.list_refs(remote, branch).map_err(|e| {
                    log::debug!("Listing refs of {remote} failed: {e}");
                    AppyardError::remote_unreachable(remote, unreachable_detail(&e))
                })?;

                let outcome = if listing.trim().is_empty() {
                    Outcome::NotFound
                } else {
                    Outcome::Found
                };
                self.cache.insert(key, outcome);
                outcome
            }
        };

        match outcome {
            Outcome::Found => Ok(()),
            Outcome::NotFound => Err(AppyardError::branch_not_on_remote(remote, branch)),
        }
    }
}

fn unreachable_detail(error: &AppyardError) -> String {
    match error {
        AppyardError::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
            stderr.trim().to_string()
        }
        other => other.to_string(),
    }
}
