//! Logging setup for host applications

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a formatted subscriber at INFO level
pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// Install a formatted subscriber at the given level.
///
/// Does nothing if the host already installed a global subscriber.
pub fn init_with_level(level: LevelFilter) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(level)
        .try_init();
}
