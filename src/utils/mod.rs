/// Shared helpers
pub mod names;
pub mod polling;

pub use polling::{PollTimeout, PollingConfig};
