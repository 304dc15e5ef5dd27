//! Predefined workspace scenarios

#![allow(dead_code)]

use super::repository::*;
use appyard::core::error::Result;
use appyard::core::pipeline::UpgradePipeline;
use appyard::core::version::UpgradeDecision;

/// Scenario: one app on `version-14` whose upstream `release` branch is at 15
pub fn app_behind_major(ws: &TestWorkspace, app: &str) -> Result<()> {
    create_upstream(ws, app, &[("version-14", "14.2.0"), ("release", "15.0.0")])?;
    install_app(ws, app, "version-14")?;
    Ok(())
}

/// Scenario: one app on `version-15` whose upstream `release` branch is also at 15
pub fn app_on_same_major(ws: &TestWorkspace, app: &str) -> Result<()> {
    create_upstream(ws, app, &[("version-15", "15.1.0"), ("release", "15.3.0")])?;
    install_app(ws, app, "version-15")?;
    Ok(())
}

/// Pipeline that records the steps it was asked to run
#[derive(Default)]
pub struct RecordingPipeline {
    pub steps: Vec<String>,
}

impl UpgradePipeline for RecordingPipeline {
    fn install_requirements(&mut self) -> Result<()> {
        self.steps.push("install_requirements".to_string());
        Ok(())
    }

    fn backup_all_sites(&mut self) -> Result<()> {
        self.steps.push("backup_all_sites".to_string());
        Ok(())
    }

    fn patch_sites(&mut self) -> Result<()> {
        self.steps.push("patch_sites".to_string());
        Ok(())
    }

    fn build_assets(&mut self) -> Result<()> {
        self.steps.push("build_assets".to_string());
        Ok(())
    }

    fn post_upgrade(&mut self, decision: &UpgradeDecision) -> Result<()> {
        self.steps.push(format!(
            "post_upgrade {} {}",
            decision.current_major, decision.upstream_major
        ));
        Ok(())
    }
}
