//! Level fetcher implementations

mod factory;
mod http;
mod in_memory;
mod instrumented;

pub use factory::create_fetcher;
pub use http::HttpLevelFetcher;
pub use in_memory::{InMemoryLevelFetcher, LevelCatalog};
pub use instrumented::InstrumentedFetcher;
