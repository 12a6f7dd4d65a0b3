//! tlsetup - TeX Live for CI jobs
//!
//! Acquires a TeX Live release with repository fallback, caches the
//! installation between jobs and keeps restored installations current.
//! The two phases of a job live in [`workflow`]; everything that talks to
//! the outside world sits behind a trait so the orchestrators can be tested
//! with fakes.

pub mod acquire;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod http;
pub mod install;
pub mod packages;
pub mod platform;
pub mod repository;
pub mod tlmgr;
pub mod ui;
pub mod update;
pub mod version;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use error::{TlsetupError, TlsetupResult};
