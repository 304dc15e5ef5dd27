//! Common assertion helpers for command output validation

#![allow(dead_code)]

use predicates::prelude::*;

pub fn not_in_workspace() -> impl Predicate<str> {
    predicates::str::contains("Not in a workspace directory")
}

pub fn upgrade_required(from: u64, to: u64) -> impl Predicate<str> {
    predicates::str::contains(format!("upgrade from {from} to {to}"))
        .and(predicates::str::contains("--upgrade"))
}

pub fn branch_not_on_remote(branch: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("Invalid branch or tag: {branch}"))
}

pub fn has_success() -> impl Predicate<str> {
    predicates::str::contains("✓")
}
