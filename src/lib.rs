//! cascade-select
//!
//! Cascading dependent selection for portal forms (company → branch → area →
//! manager and similar chains):
//! - Per-level option stores with stale-while-loading semantics
//! - A chain resolver that resets descendants and discards stale responses
//! - A guarded empty-level notification policy
//! - In-memory and REST-backed level fetchers

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{ChainResolver, ChainResolverConfig, DomainError};
