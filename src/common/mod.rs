pub mod errors;
pub mod utils;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Default maximum age of a tweet the bot will reply to, in minutes.
pub const DEFAULT_MAX_AGE_MINUTES: u64 = 6 * 60;

/// Number of tweets fetched from a timeline per call.
pub const TIMELINE_COUNT: u32 = 20;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(false)
        .without_time() // CloudWatch will add the ingestion time
        .with_target(false)
        .init();
}
