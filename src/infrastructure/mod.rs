//! Infrastructure layer - Fetcher and notifier adapters, observability

pub mod fetcher;
pub mod notifier;
pub mod observability;
