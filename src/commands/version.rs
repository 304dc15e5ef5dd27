use crate::core::{
    error::Result,
    output::format_row,
    print_section_header,
    version::{major_version, UpgradeDecision, VersionResolver},
    workspace::Workspace,
};
use colored::*;
use std::path::Path;

pub fn execute_version(start: &Path, app_name: &str, upstream: Option<&str>) -> Result<()> {
    let workspace = Workspace::discover(start)?;
    let app = workspace.app(app_name)?;
    let resolver = VersionResolver::new(workspace.config());

    let (current, source) = resolver.resolve_current_version_with_source(&app)?;
    let develop = resolver.resolve_develop_version(&app)?;

    print_section_header(app_name);
    println!(
        "{}  {}",
        format_row("current", 8, Some(current.as_str())),
        format!("({source:?})").bright_black()
    );
    println!("{}", format_row("develop", 8, develop.as_deref()));

    let Some(branch) = upstream else {
        return Ok(());
    };

    let upstream_version = resolver.resolve_upstream_version(&app, Some(branch))?;
    println!("{}", format_row(branch, 8, upstream_version.as_deref()));

    if let Some(upstream_version) = upstream_version {
        let decision = UpgradeDecision::new(major_version(&current)?, major_version(&upstream_version)?);
        if decision.is_upgrade {
            println!(
                "\n  {} switching to {branch} upgrades {} to {}",
                "!".yellow(),
                decision.current_major,
                decision.upstream_major
            );
        }
    }
    Ok(())
}
