//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`AppyardError`], the single error type for every appyard
//! operation. It uses `thiserror` for ergonomic error definitions and includes
//! constructors for the failure scenarios the subsystem distinguishes.
//!
//! # Public API
//! - [`AppyardError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, AppyardError>`
//!
//! # Error Categories
//! - **Remote validation**: branch/tag missing on a remote, remote unreachable
//! - **Version resolution**: no manifest version, non-semantic versions, branch
//!   without an upstream version
//! - **Command execution**: git or pipeline commands exiting non-zero
//! - **Branch switching**: major-version upgrades that were not confirmed
//! - **Dependency manifests**: missing or malformed `required_apps`
//! - **Workspace**: unknown apps, not in a workspace, configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for appyard
#[derive(Error, Debug)]
pub enum AppyardError {
    // Workspace errors
    #[error("Not in a workspace directory")]
    NotInWorkspace,

    #[error("No app named {app} in this workspace")]
    AppNotFound { app: String },

    #[error("App directory does not exist: {path}")]
    AppDirectoryMissing { path: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HEAD is not on a branch in {path}")]
    DetachedHead { path: PathBuf },

    // Remote validation errors
    #[error("Invalid branch or tag: {branch} for the remote {remote}")]
    BranchNotOnRemote { remote: String, branch: String },

    #[error("Invalid remote {remote}: {detail}")]
    RemoteUnreachable { remote: String, detail: String },

    // Version resolution errors
    #[error("Specified branch {branch} of app {app} is not in the upstream remote")]
    InvalidBranch { app: String, branch: String },

    #[error("No version found in {source_name}")]
    VersionNotFound { source_name: String },

    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },

    // Command execution errors
    #[error("Command `{command}` failed with {}{}", describe_exit(.code), describe_stderr(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    // Branch switching errors
    #[error(
        "Switching {app} to {branch} will cause upgrade from {current_major} to {upstream_major}. Pass --upgrade to confirm"
    )]
    UpgradeRequired {
        app: String,
        branch: String,
        current_major: u64,
        upstream_major: u64,
        switched: Vec<String>,
    },

    // Dependency manifest errors
    #[error("Malformed dependency manifest {source_name}: {detail}")]
    DependencyManifest { source_name: String, detail: String },

    #[error("Could not find {repo} in any of the organisations: {}", .organisations.join(", "))]
    OrganisationNotFound {
        repo: String,
        organisations: Vec<String>,
    },

    // Wrapped library errors
    #[error("Git repository error: {0}")]
    GitRepo(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid UTF-8 in file content: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Convenience type alias for Results using AppyardError
pub type Result<T> = std::result::Result<T, AppyardError>;

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl AppyardError {
    /// True for both flavours of invalid remote: missing branch/tag and unreachable remote
    pub fn is_invalid_remote(&self) -> bool {
        matches!(
            self,
            Self::BranchNotOnRemote { .. } | Self::RemoteUnreachable { .. }
        )
    }

    pub fn app_not_found(app: impl Into<String>) -> Self {
        Self::AppNotFound { app: app.into() }
    }

    pub fn app_directory_missing(path: impl Into<PathBuf>) -> Self {
        Self::AppDirectoryMissing { path: path.into() }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn branch_not_on_remote(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::BranchNotOnRemote {
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    pub fn remote_unreachable(remote: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RemoteUnreachable {
            remote: remote.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_branch(app: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::InvalidBranch {
            app: app.into(),
            branch: branch.into(),
        }
    }

    pub fn version_not_found(source_name: impl Into<String>) -> Self {
        Self::VersionNotFound {
            source_name: source_name.into(),
        }
    }

    pub fn invalid_version(version: impl Into<String>, source: semver::Error) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            source,
        }
    }

    /// Create a command failure from the rendered command line and its process output
    pub fn command_failed(
        command: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    pub fn dependency_manifest(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DependencyManifest {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}
