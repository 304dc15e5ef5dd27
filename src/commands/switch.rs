use crate::core::{
    error::{AppyardError, Result},
    pipeline::CommandPipeline,
    print_info, print_success, print_warning,
    switch::{BranchSwitcher, SwitchReport, SwitchRequest},
    workspace::Workspace,
};
use std::path::Path;

pub fn execute_switch_to_branch(
    start: &Path,
    branch: String,
    apps: Vec<String>,
    upgrade: bool,
    check_upgrade: bool,
) -> Result<()> {
    let request = SwitchRequest {
        branch,
        apps: (!apps.is_empty()).then_some(apps),
        upgrade_allowed: upgrade,
        check_upgrade,
    };
    run_switch(start, &request)
}

pub fn execute_switch_to_develop(start: &Path, apps: Vec<String>) -> Result<()> {
    run_switch(start, &SwitchRequest::develop((!apps.is_empty()).then_some(apps)))
}

fn run_switch(start: &Path, request: &SwitchRequest) -> Result<()> {
    let workspace = Workspace::discover(start)?;
    let pipeline = CommandPipeline::from_workspace(&workspace)?;
    let mut switcher = BranchSwitcher::new(&workspace, pipeline);

    let report = switcher.switch(request).inspect_err(|e| {
        if let AppyardError::UpgradeRequired { switched, .. } = e {
            if !switched.is_empty() {
                print_warning(&format!(
                    "Already switched to {} before aborting: {}",
                    request.branch,
                    switched.join(", ")
                ));
            }
        }
    })?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &SwitchReport) {
    for outcome in report.failed() {
        let note = outcome.note.as_deref().unwrap_or("not switched");
        print_warning(&format!("{}: {note}", outcome.app));
    }

    let switched = report.switched();
    if switched.is_empty() {
        print_info("No apps were switched.");
        return;
    }

    if let Some(outcome) = report.outcomes.iter().find(|outcome| outcome.success) {
        print_success(&format!(
            "Switched to {}: {}",
            outcome.requested_branch,
            switched.join(", ")
        ));
    }
    if let Some(decision) = &report.upgrade {
        print_success(&format!(
            "Upgraded from version {} to {}",
            decision.current_major, decision.upstream_major
        ));
    }
    print_info("Please run `update --patch` to be safe from any differences in database schema");
}
