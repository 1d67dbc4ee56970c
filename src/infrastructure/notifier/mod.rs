//! Empty-level notifier implementations

mod channel;
mod tracing_notifier;

pub use channel::{ChannelNotifier, EmptyLevelMessage};
pub use tracing_notifier::TracingNotifier;
