//! The post-upgrade pipeline run once after a batch of branch switches crossed a
//! major version.
//!
//! Steps, in order: install requirements, back up every site, patch every site,
//! build assets, then the post-upgrade hook with the old and new majors. The steps
//! are opaque external commands; [`CommandPipeline`] renders them from the
//! workspace configuration.

use crate::core::{
    config::{CommandDir, CommandTemplate},
    error::{AppyardError, Result},
    version::UpgradeDecision,
    workspace::Workspace,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;

pub trait UpgradePipeline {
    fn install_requirements(&mut self) -> Result<()>;
    fn backup_all_sites(&mut self) -> Result<()>;
    fn patch_sites(&mut self) -> Result<()>;
    fn build_assets(&mut self) -> Result<()>;
    fn post_upgrade(&mut self, decision: &UpgradeDecision) -> Result<()>;

    /// Run every step in order, stopping at the first failure
    fn run(&mut self, decision: &UpgradeDecision) -> Result<()> {
        log::info!(
            "Running post-upgrade pipeline ({} -> {})",
            decision.current_major,
            decision.upstream_major
        );
        self.install_requirements()?;
        self.backup_all_sites()?;
        self.patch_sites()?;
        self.build_assets()?;
        self.post_upgrade(decision)
    }
}

/// Pipeline made of the command templates in the workspace configuration
pub struct CommandPipeline {
    root: PathBuf,
    python: String,
    framework: String,
    apps: Vec<String>,
    sites: Vec<String>,
    install_requirements: CommandTemplate,
    backup_site: CommandTemplate,
    patch_site: CommandTemplate,
    build_assets: CommandTemplate,
    post_upgrade: Option<CommandTemplate>,
}

impl CommandPipeline {
    pub fn from_workspace(workspace: &Workspace) -> Result<Self> {
        let config = workspace.config();
        let pipeline = &config.pipeline;

        Ok(Self {
            root: workspace.root().to_path_buf(),
            python: config.python_path(workspace.root()).display().to_string(),
            framework: config.framework_app.clone(),
            apps: workspace.app_folders()?,
            sites: workspace.sites()?,
            install_requirements: pipeline.install_requirements.clone(),
            backup_site: pipeline.backup_site.clone(),
            patch_site: pipeline.patch_site.clone(),
            build_assets: pipeline.build_assets.clone(),
            post_upgrade: pipeline.post_upgrade.clone(),
        })
    }

    fn base_vars(&self) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        vars.insert("python", self.python.clone());
        vars.insert("framework", self.framework.clone());
        vars
    }

    fn execute(&self, template: &CommandTemplate, vars: &HashMap<&str, String>) -> Result<()> {
        let argv = template.render(vars);
        let Some((program, args)) = argv.split_first() else {
            return Ok(());
        };

        let cwd = match template.cwd {
            CommandDir::Root => self.root.clone(),
            CommandDir::Sites => self.root.join("sites"),
        };

        let command_line = argv.join(" ");
        log::info!("$ {command_line}");

        let status = Command::new(program).args(args).current_dir(&cwd).status()?;
        if !status.success() {
            log::error!("`{command_line}` exited with {status}");
            return Err(AppyardError::command_failed(command_line, status.code(), ""));
        }
        Ok(())
    }

    fn for_each_site(&self, template: &CommandTemplate) -> Result<()> {
        for site in &self.sites {
            let mut vars = self.base_vars();
            vars.insert("site", site.clone());
            self.execute(template, &vars)?;
        }
        Ok(())
    }
}

impl UpgradePipeline for CommandPipeline {
    fn install_requirements(&mut self) -> Result<()> {
        for app in &self.apps {
            let mut vars = self.base_vars();
            vars.insert("app", app.clone());
            self.execute(&self.install_requirements, &vars)?;
        }
        Ok(())
    }

    fn backup_all_sites(&mut self) -> Result<()> {
        self.for_each_site(&self.backup_site)
    }

    fn patch_sites(&mut self) -> Result<()> {
        self.for_each_site(&self.patch_site)
    }

    fn build_assets(&mut self) -> Result<()> {
        self.execute(&self.build_assets, &self.base_vars())
    }

    fn post_upgrade(&mut self, decision: &UpgradeDecision) -> Result<()> {
        let Some(template) = &self.post_upgrade else {
            return Ok(());
        };

        let mut vars = self.base_vars();
        vars.insert("from", decision.current_major.to_string());
        vars.insert("to", decision.upstream_major.to_string());
        self.execute(template, &vars)
    }
}
