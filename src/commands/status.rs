use crate::core::{
    app_state::{AppSelection, StateDiff},
    error::Result,
    output::format_row,
    print_info, print_section_header, print_warning,
    version::VersionResolver,
    workspace::Workspace,
};
use colored::*;
use std::path::Path;

const SHORT_HASH: usize = 7;

pub fn execute_status(start: &Path, app: Option<String>) -> Result<()> {
    let mut workspace = Workspace::discover(start)?;
    let selection = AppSelection::from_option(app);
    let diff = workspace.update_states(&selection)?;

    let names = match &selection {
        AppSelection::All => workspace.app_folders()?,
        AppSelection::One(name) => vec![name.clone()],
    };

    if names.is_empty() {
        print_info("No apps installed in this workspace.");
        return Ok(());
    }

    print_section_header("Apps");

    let framework = VersionResolver::new(workspace.config()).framework_major_version(&workspace);
    if framework > 0 {
        print_info(&format!("{} major version {framework}", workspace.config().framework_app));
    }

    let width = names.iter().map(String::len).max().unwrap_or(0);
    for name in &names {
        match workspace.states().get(name) {
            Some(state) => {
                let short = &state.commit_hash[..state.commit_hash.len().min(SHORT_HASH)];
                println!(
                    "{}  {}  {}",
                    format_row(name, width, Some(state.version.as_str())),
                    state.branch.cyan(),
                    short.bright_black()
                );
            }
            None => println!("{}", format_row(name, width, None)),
        }
    }

    print_diff(&diff);
    Ok(())
}

fn print_diff(diff: &StateDiff) {
    if diff.is_empty() {
        return;
    }

    print_section_header("Changes since last status");
    for app in &diff.added {
        println!("  {} {}", "+".green(), app.white());
    }
    for app in &diff.removed {
        print_warning(&format!("{app} is no longer recorded"));
    }
    for change in &diff.changed {
        println!(
            "  {} {} {}: {} {} {}",
            "~".yellow(),
            change.app.white(),
            change.field.bright_black(),
            change.before.bright_black(),
            "→".bright_black(),
            change.after.white()
        );
    }
}
