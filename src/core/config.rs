//! Typed workspace configuration.
//!
//! Configuration is read from `<workspace>/config/appyard.json`, falling back to the
//! per-user `appyard/config.json` and finally to built-in defaults. Every field is
//! optional in the file; unknown keys are ignored.

use crate::core::dirs::user_config_file;
use crate::core::error::{AppyardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const WORKSPACE_CONFIG_FILE: &str = "appyard.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Upper bound for every HTTP request, in seconds
    pub http_timeout_secs: u64,
    /// Git aborts a transfer slower than `low_speed_limit` bytes/s for this many seconds
    pub low_speed_time_secs: u64,
    pub low_speed_limit: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            low_speed_time_secs: 60,
            low_speed_limit: 1000,
        }
    }
}

impl NetworkConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Environment handed to git network invocations
    pub fn git_env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("GIT_HTTP_LOW_SPEED_LIMIT", self.low_speed_limit.to_string()),
            ("GIT_HTTP_LOW_SPEED_TIME", self.low_speed_time_secs.to_string()),
            ("GIT_TERMINAL_PROMPT", "0".to_string()),
        ]
    }
}

/// Where a pipeline command runs, relative to the workspace root
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandDir {
    Root,
    Sites,
}

/// An argv template with `{placeholder}` substitution
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommandTemplate {
    pub argv: Vec<String>,
    #[serde(default = "default_command_dir")]
    pub cwd: CommandDir,
}

fn default_command_dir() -> CommandDir {
    CommandDir::Root
}

impl CommandTemplate {
    pub fn new(argv: &[&str], cwd: CommandDir) -> Self {
        Self {
            argv: argv.iter().map(|arg| arg.to_string()).collect(),
            cwd,
        }
    }

    /// Substitute `{key}` occurrences in every argument
    pub fn render(&self, vars: &HashMap<&str, String>) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (key, value)| {
                    acc.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect()
    }
}

/// External commands making up the post-upgrade pipeline
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run once per installed app
    pub install_requirements: CommandTemplate,
    /// Run once per site
    pub backup_site: CommandTemplate,
    /// Run once per site
    pub patch_site: CommandTemplate,
    pub build_assets: CommandTemplate,
    pub post_upgrade: Option<CommandTemplate>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            install_requirements: CommandTemplate::new(
                &["{python}", "-m", "pip", "install", "--quiet", "--upgrade", "-e", "apps/{app}"],
                CommandDir::Root,
            ),
            backup_site: CommandTemplate::new(
                &["{python}", "-m", "{framework}.utils.bench_helper", "{framework}", "--site", "{site}", "backup"],
                CommandDir::Sites,
            ),
            patch_site: CommandTemplate::new(
                &["{python}", "-m", "{framework}.utils.bench_helper", "{framework}", "--site", "{site}", "migrate"],
                CommandDir::Sites,
            ),
            build_assets: CommandTemplate::new(
                &["{python}", "-m", "{framework}.utils.bench_helper", "{framework}", "build"],
                CommandDir::Sites,
            ),
            post_upgrade: Some(CommandTemplate::new(
                &["{python}", "-m", "{framework}.utils.bench_helper", "{framework}", "post-upgrade", "{from}", "{to}"],
                CommandDir::Sites,
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// The app every other app builds on; its major version is the workspace version
    pub framework_app: String,
    /// Interpreter used by pipeline commands, relative to the workspace root
    pub python: PathBuf,
    pub upstream_remote: String,
    /// Organisations searched when an app specifier carries no org
    pub organisations: Vec<String>,
    pub github_api_url: String,
    pub github_raw_url: String,
    /// Web host probed when the API refuses an organisation lookup
    pub github_url: String,
    pub network: NetworkConfig,
    pub pipeline: PipelineConfig,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            framework_app: "frappe".to_string(),
            python: PathBuf::from("env/bin/python"),
            upstream_remote: "upstream".to_string(),
            organisations: vec!["frappe".to_string()],
            github_api_url: "https://api.github.com".to_string(),
            github_raw_url: "https://raw.githubusercontent.com".to_string(),
            github_url: "https://github.com".to_string(),
            network: NetworkConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl WorkspaceConfig {
    /// Load the workspace config, then the user config, then defaults
    pub fn load(root: &Path) -> Result<Self> {
        let workspace_file = root.join("config").join(WORKSPACE_CONFIG_FILE);
        if workspace_file.exists() {
            log::debug!("Loading workspace config from {}", workspace_file.display());
            return Self::from_file(&workspace_file);
        }

        match user_config_file() {
            Some(user_file) if user_file.exists() => {
                log::debug!("Loading user config from {}", user_file.display());
                return Self::from_file(&user_file);
            }
            Some(_) => {}
            None => log::debug!("No user config directory on this platform"),
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AppyardError::config_error(format!("Failed to parse '{}': {e}", path.display()))
        })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = root.join("config");
        std::fs::create_dir_all(&config_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_dir.join(WORKSPACE_CONFIG_FILE), content)?;

        Ok(())
    }

    /// Absolute interpreter path for pipeline commands
    pub fn python_path(&self, root: &Path) -> PathBuf {
        if self.python.is_absolute() {
            self.python.clone()
        } else {
            root.join(&self.python)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: WorkspaceConfig =
            serde_json::from_str(r#"{"framework_app": "saps", "unknown_key": 1}"#).unwrap();
        assert_eq!(config.framework_app, "saps");
        assert_eq!(config.upstream_remote, "upstream");
        assert_eq!(config.network, NetworkConfig::default());
        assert!(config.pipeline.post_upgrade.is_some());
    }

    #[test]
    fn test_post_upgrade_can_be_disabled() {
        let config: WorkspaceConfig =
            serde_json::from_str(r#"{"pipeline": {"post_upgrade": null}}"#).unwrap();
        assert!(config.pipeline.post_upgrade.is_none());
        assert_eq!(
            config.pipeline.backup_site,
            PipelineConfig::default().backup_site
        );
    }

    #[test]
    fn test_render_template() {
        let template = CommandTemplate::new(&["{python}", "--site", "{site}", "{site}.bak"], CommandDir::Sites);
        let mut vars = HashMap::new();
        vars.insert("python", "/ws/env/bin/python".to_string());
        vars.insert("site", "site1.local".to_string());

        assert_eq!(
            template.render(&vars),
            vec!["/ws/env/bin/python", "--site", "site1.local", "site1.local.bak"]
        );
    }

    #[test]
    fn test_save_and_load_workspace_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = WorkspaceConfig::default();
        config.organisations = vec!["acme".to_string(), "frappe".to_string()];
        config.save(temp_dir.path()).unwrap();

        let loaded = WorkspaceConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join(WORKSPACE_CONFIG_FILE), "{ not json").unwrap();

        let err = WorkspaceConfig::load(temp_dir.path()).unwrap_err();
        assert!(matches!(err, AppyardError::Config { .. }));
    }

    #[test]
    fn test_python_path_is_resolved_against_root() {
        let config = WorkspaceConfig::default();
        assert_eq!(
            config.python_path(Path::new("/srv/ws")),
            PathBuf::from("/srv/ws/env/bin/python")
        );
    }

    #[test]
    fn test_git_env_carries_timeouts() {
        let network = NetworkConfig {
            http_timeout_secs: 5,
            low_speed_time_secs: 12,
            low_speed_limit: 500,
        };
        let env = network.git_env();
        assert!(env.contains(&("GIT_HTTP_LOW_SPEED_TIME", "12".to_string())));
        assert!(env.contains(&("GIT_HTTP_LOW_SPEED_LIMIT", "500".to_string())));
        assert_eq!(network.http_timeout(), Duration::from_secs(5));
    }
}
