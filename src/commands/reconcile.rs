use crate::core::{error::Result, print_info, print_success, workspace::Workspace};
use std::path::Path;

pub fn execute_reconcile_name(start: &Path, folder: &str) -> Result<()> {
    let workspace = Workspace::discover(start)?;
    let name = workspace.reconcile_directory_name(folder)?;

    if name == folder {
        print_info(&format!("{folder} already matches its app name."));
    } else {
        print_success(&format!("Renamed apps/{folder} to apps/{name}"));
    }
    Ok(())
}
