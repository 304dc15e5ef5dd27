use crate::core::{
    error::{AppyardError, Result},
    fetch::is_git_url,
    print_success,
    workspace::Workspace,
};
use std::path::Path;

pub fn execute_remote_set_url(start: &Path, git_url: &str) -> Result<()> {
    if !is_git_url(git_url) {
        return Err(AppyardError::config_error(format!("{git_url} is not a git URL")));
    }

    let workspace = Workspace::discover(start)?;
    let app = workspace.set_git_remote_url(git_url)?;
    print_success(&format!(
        "{} remote of {app} now points at {git_url}",
        workspace.config().upstream_remote
    ));
    Ok(())
}
