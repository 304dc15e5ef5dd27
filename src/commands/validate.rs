use crate::core::{
    config::WorkspaceConfig,
    error::Result,
    print_success,
    remote::RemoteBranchValidator,
    workspace::find_parent_workspace,
};
use std::path::Path;

pub fn execute_validate_branch(start: &Path, remote: &str, branch: Option<&str>) -> Result<()> {
    // validation also works outside a workspace, with default network settings
    let config = match find_parent_workspace(start) {
        Some(root) => WorkspaceConfig::load(&root)?,
        None => WorkspaceConfig::default(),
    };

    let mut validator = RemoteBranchValidator::with_git(&config.network);
    validator.validate(remote, branch)?;

    match branch.filter(|branch| !branch.is_empty()) {
        Some(branch) => print_success(&format!("{branch} exists on {remote}")),
        None => print_success(&format!("No branch given, nothing to validate on {remote}")),
    }
    Ok(())
}
