//! Coordinated branch switching across the apps of a workspace.
//!
//! Apps are processed one at a time in input order (all apps: sorted folder
//! listing). For each app the upstream refs are fetched, the switch is gated on a
//! major-version upgrade, the branch is force-checked-out and the resulting active
//! branch is read back.
//!
//! # Failure semantics
//! - A missing app directory is a failed outcome; the batch continues
//! - A failing fetch or checkout command aborts the batch
//! - An unconfirmed upgrade aborts the batch with [`AppyardError::UpgradeRequired`].
//!   Apps switched before the abort stay switched; the error lists them
//! - A checkout that leaves HEAD elsewhere (a tag, for instance) is a failed outcome
//!
//! After the loop, the post-upgrade pipeline runs once if any app crossed a major
//! version, with the first decision that fired.

use crate::core::{
    error::{AppyardError, Result},
    git::GitRepo,
    pipeline::UpgradePipeline,
    version::{UpgradeDecision, VersionResolver},
    workspace::Workspace,
};

pub const DEVELOP_BRANCH: &str = "develop";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchRequest {
    pub branch: String,
    /// `None` switches every installed app
    pub apps: Option<Vec<String>>,
    pub upgrade_allowed: bool,
    pub check_upgrade: bool,
}

impl SwitchRequest {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            apps: None,
            upgrade_allowed: false,
            check_upgrade: true,
        }
    }

    pub fn develop(apps: Option<Vec<String>>) -> Self {
        Self {
            branch: DEVELOP_BRANCH.to_string(),
            apps,
            upgrade_allowed: true,
            check_upgrade: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    pub app: String,
    pub requested_branch: String,
    pub success: bool,
    pub active_branch: Option<String>,
    pub note: Option<String>,
}

impl SwitchOutcome {
    fn failed(app: &str, branch: &str, active_branch: Option<String>, note: impl Into<String>) -> Self {
        Self {
            app: app.to_string(),
            requested_branch: branch.to_string(),
            success: false,
            active_branch,
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchReport {
    pub outcomes: Vec<SwitchOutcome>,
    /// First upgrade that fired in the batch
    pub upgrade: Option<UpgradeDecision>,
    pub pipeline_ran: bool,
}

impl SwitchReport {
    pub fn switched(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.success)
            .map(|outcome| outcome.app.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<&SwitchOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.success).collect()
    }
}

pub struct BranchSwitcher<'a, P: UpgradePipeline> {
    workspace: &'a Workspace,
    resolver: VersionResolver,
    pipeline: P,
}

impl<'a, P: UpgradePipeline> BranchSwitcher<'a, P> {
    pub fn new(workspace: &'a Workspace, pipeline: P) -> Self {
        Self {
            workspace,
            resolver: VersionResolver::new(workspace.config()),
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn switch_to_develop(&mut self, apps: Option<Vec<String>>) -> Result<SwitchReport> {
        self.switch(&SwitchRequest::develop(apps))
    }

    pub fn switch(&mut self, request: &SwitchRequest) -> Result<SwitchReport> {
        let workspace = self.workspace;
        let targets = match &request.apps {
            Some(apps) => apps.clone(),
            None => workspace.app_folders()?,
        };
        let remote = &workspace.config().upstream_remote;
        let branch = request.branch.as_str();

        let mut report = SwitchReport::default();
        let mut switched: Vec<String> = Vec::new();

        for name in &targets {
            let app = match workspace.app(name) {
                Ok(app) => app,
                Err(AppyardError::AppNotFound { .. }) => {
                    log::warn!("App directory of {name} does not exist, skipping");
                    report
                        .outcomes
                        .push(SwitchOutcome::failed(name, branch, None, "app directory missing"));
                    continue;
                }
                Err(e) => return Err(e),
            };

            let repo = GitRepo::open(&app.path)?.with_network(&workspace.config().network);

            if repo.is_shallow() {
                log::info!("Fetching upstream and unshallowing {name}");
            } else {
                log::info!("Fetching upstream for {name}");
            }
            repo.track_all_branches(remote)?;
            repo.fetch_all(remote)?;

            if request.check_upgrade {
                let decision = self.resolver.upgrade_decision(&app, branch)?;
                if decision.is_upgrade {
                    if !request.upgrade_allowed {
                        log::error!(
                            "Switching {name} to {branch} requires an upgrade from {} to {}",
                            decision.current_major,
                            decision.upstream_major
                        );
                        return Err(AppyardError::UpgradeRequired {
                            app: name.clone(),
                            branch: branch.to_string(),
                            current_major: decision.current_major,
                            upstream_major: decision.upstream_major,
                            switched,
                        });
                    }
                    report.upgrade.get_or_insert(decision);
                }
            }

            log::info!("Switching {name} to {branch}");
            repo.checkout_force(branch)?;

            let active = repo.active_branch()?;
            if active.as_deref() == Some(branch) {
                switched.push(name.clone());
                report.outcomes.push(SwitchOutcome {
                    app: name.clone(),
                    requested_branch: branch.to_string(),
                    success: true,
                    active_branch: active,
                    note: None,
                });
            } else {
                let note = match &active {
                    Some(other) => format!("still on {other}"),
                    None => "left on detached HEAD".to_string(),
                };
                log::warn!("{name} did not switch to {branch}: {note}");
                report
                    .outcomes
                    .push(SwitchOutcome::failed(name, branch, active, note));
            }
        }

        if !switched.is_empty() {
            log::info!("Successfully switched branches for: {}", switched.join(", "));
            log::info!("Please run `update --patch` to be safe from any differences in database schema");
        }

        if let Some(decision) = report.upgrade {
            self.pipeline.run(&decision)?;
            report.pipeline_ran = true;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WorkspaceConfig;
    use crate::core::workspace::WORKSPACE_DIRS;
    use tempfile::TempDir;

    #[derive(Default)]
    struct NoopPipeline {
        runs: usize,
    }

    impl UpgradePipeline for NoopPipeline {
        fn install_requirements(&mut self) -> Result<()> {
            self.runs += 1;
            Ok(())
        }
        fn backup_all_sites(&mut self) -> Result<()> {
            Ok(())
        }
        fn patch_sites(&mut self) -> Result<()> {
            Ok(())
        }
        fn build_assets(&mut self) -> Result<()> {
            Ok(())
        }
        fn post_upgrade(&mut self, _decision: &UpgradeDecision) -> Result<()> {
            Ok(())
        }
    }

    fn empty_workspace() -> (TempDir, Workspace) {
        let temp_dir = TempDir::new().unwrap();
        for dir in WORKSPACE_DIRS {
            std::fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        let workspace =
            Workspace::with_config(temp_dir.path().to_path_buf(), WorkspaceConfig::default()).unwrap();
        (temp_dir, workspace)
    }

    #[test]
    fn test_develop_request_allows_upgrades() {
        let request = SwitchRequest::develop(Some(vec!["hrms".to_string()]));
        assert_eq!(request.branch, "develop");
        assert!(request.upgrade_allowed);
        assert!(request.check_upgrade);

        let request = SwitchRequest::new("version-15");
        assert!(!request.upgrade_allowed);
        assert!(request.apps.is_none());
    }

    #[test]
    fn test_missing_app_directories_are_failed_outcomes() {
        let (_temp_dir, workspace) = empty_workspace();
        let mut switcher = BranchSwitcher::new(&workspace, NoopPipeline::default());

        let mut request = SwitchRequest::new("version-15");
        request.apps = Some(vec!["ghost".to_string(), "phantom".to_string()]);
        let report = switcher.switch(&request).unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.switched().is_empty());
        assert_eq!(report.failed()[0].note.as_deref(), Some("app directory missing"));
        assert!(!report.pipeline_ran);
        assert_eq!(switcher.pipeline().runs, 0);
    }

    #[test]
    fn test_empty_workspace_switches_nothing() {
        let (_temp_dir, workspace) = empty_workspace();
        let mut switcher = BranchSwitcher::new(&workspace, NoopPipeline::default());

        let report = switcher.switch_to_develop(None).unwrap();
        assert!(report.outcomes.is_empty());
        assert!(report.upgrade.is_none());
    }
}
