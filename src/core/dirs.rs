use std::path::PathBuf;

const USER_CONFIG_DIR: &str = "appyard";
const USER_CONFIG_FILE: &str = "config.json";

/// Per-user `appyard/config.json`, read when a workspace carries no config of its own
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE))
}

/// Directory where the upward workspace search stops
pub fn get_home_directory() -> Option<PathBuf> {
    dirs::home_dir()
}
