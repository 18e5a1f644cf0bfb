use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const CRATE_TARGET: &str = "fundflow";

/// Filters for this crate's events: everything at DEBUG with `--verbose`, nothing otherwise.
/// `RUST_LOG` still overrides the level through the env filter.
fn crate_filter(verbose: bool) -> (Targets, &'static str) {
    if verbose {
        (
            Targets::new().with_target(CRATE_TARGET, LevelFilter::DEBUG),
            "debug",
        )
    } else {
        (
            Targets::new().with_target(CRATE_TARGET, LevelFilter::OFF),
            "off",
        )
    }
}

/// Installs the global subscriber.
///
/// stdout is reserved for the flow tables so it can be redirected cleanly.
/// Log events go to stderr next to the progress bar and the per-fund
/// diagnostics.
pub fn init_logging(verbose: bool) {
    let (app_filter, default_level) = crate_filter(verbose);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(app_filter)
        .with(env_filter)
        .init();
}
