//! Snapshot cache core.
//!
//! Storage, freshness policy and the fetch-or-reuse orchestrator. Nothing in
//! here knows about cloud providers.

pub mod cache;
pub mod config;
pub mod error;
pub mod freshness;
pub mod store;
pub mod time;
