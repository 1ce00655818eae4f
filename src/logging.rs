//! Setting up a log subscriber.
//!
//! The crate reports events through [`tracing`]. Applications usually set
//! up their own subscriber. For tests and small tools, [`init_logging`]
//! installs a simple one.

use tracing_subscriber::EnvFilter;

/// Sets up logging of events reported by this crate.
///
/// Use the RUST_LOG environment variable to override the defaults.
///
/// E.g. to see why received cookies are rejected:
///   RUST_LOG=edns_base::edns::cookies=TRACE
///
/// Calling this more than once, or after another subscriber has been
/// installed, has no effect.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();
}
