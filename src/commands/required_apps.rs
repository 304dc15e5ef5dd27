use crate::core::{
    config::WorkspaceConfig,
    deps::{required_apps, ManifestSource},
    error::Result,
    fetch::{AppSpec, ManifestFetcher},
    print_info, print_section_header,
    workspace::find_parent_workspace,
};
use std::path::{Path, PathBuf};

pub fn execute_required_apps(start: &Path, source: &str, local: bool) -> Result<()> {
    let apps = if local {
        required_apps(&ManifestSource::Local(PathBuf::from(source)))?
    } else {
        let config = match find_parent_workspace(start) {
            Some(root) => WorkspaceConfig::load(&root)?,
            None => WorkspaceConfig::default(),
        };
        let spec = AppSpec::parse(source)?;
        ManifestFetcher::new(&config)?.required_apps(&spec)?
    };

    if apps.is_empty() {
        print_info(&format!("{source} requires no other apps."));
        return Ok(());
    }

    print_section_header("Required apps");
    for app in &apps {
        println!("  {app}");
    }
    Ok(())
}
