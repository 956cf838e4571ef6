pub mod args;
pub mod browser;
pub mod categorize;
pub mod category;
pub mod checkpoint;
pub mod domain;
pub mod liveness;
pub mod output;
pub mod stats;
pub mod tranco;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use args::Args;
pub use categorize::{run_categorizer, RunContext, StopPrompt};
pub use category::{CategorySource, LookupError, LookupOutcome};
pub use stats::{RunStats, StopReason};
