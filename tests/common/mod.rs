//! Shared utilities for the appyard integration tests
//!
//! Tests run against real git repositories: every app in a test workspace is a
//! clone of a local bare repository acting as its `upstream` remote, so no network
//! access is needed.

pub mod assertions;
pub mod fixtures;
pub mod repository;
