//! appyard - app state and branch management for multi-app workspaces.
//!
//! A workspace holds several independently versioned app repositories under `apps/`.
//! This library keeps their branches, versions and dependency declarations
//! consistent: it resolves versions from heterogeneous manifests, validates remote
//! branches, records per-app state, extracts declared dependencies and switches
//! branches across apps with major-version upgrade gating.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module.

pub mod commands;
pub mod core;

pub use core::{
    // Error handling
    AppyardError,
    Result,
    // Workspace context
    App,
    Workspace,
    WorkspaceConfig,
    GitRepo,
    // State tracking
    AppSelection,
    AppState,
    AppStateTracker,
    AppStates,
    StateDiff,
    // Versions
    UpgradeDecision,
    VersionResolver,
    // Remote validation and dependencies
    AppSpec,
    ManifestFetcher,
    ManifestSource,
    RefLister,
    RemoteBranchValidator,
    // Branch switching
    BranchSwitcher,
    CommandPipeline,
    SwitchOutcome,
    SwitchReport,
    SwitchRequest,
    UpgradePipeline,
};
