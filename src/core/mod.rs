//! Core functionality for appyard.
//!
//! This module provides the building blocks for managing the apps of a workspace:
//! git access, manifest and version resolution, state tracking, remote validation,
//! dependency extraction and branch switching.

pub mod app_state;
pub mod config;
pub mod deps;
pub mod dirs;
pub mod error;
pub mod fetch;
pub mod git;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod remote;
pub mod switch;
pub mod version;
pub mod workspace;

// === Error handling ===
pub use error::{AppyardError, Result};

// === Workspace context ===
pub use config::WorkspaceConfig;
pub use workspace::{App, Workspace};

// === Git operations ===
pub use git::GitRepo;

// === App state ===
pub use app_state::{AppSelection, AppState, AppStateTracker, AppStates, StateDiff};

// === Versions ===
pub use version::{UpgradeDecision, VersionResolver};

// === Remote validation and dependencies ===
pub use deps::{required_apps, ManifestSource};
pub use fetch::{is_git_url, AppSpec, ManifestFetcher};
pub use remote::{RefLister, RemoteBranchValidator};

// === Branch switching ===
pub use pipeline::{CommandPipeline, UpgradePipeline};
pub use switch::{BranchSwitcher, SwitchOutcome, SwitchReport, SwitchRequest};

// === Output formatting ===
pub use output::{print_error, print_info, print_section_header, print_success, print_warning};
