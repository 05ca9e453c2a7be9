use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::TracingFormat;
use crate::config::Config;

/// Configure and initialize logging for the crawler.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at the configured
/// level (or debug with `--verbose`) and dependencies stay at warn.
pub fn setup_logging(config: &Config, format: TracingFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let base_level = if verbose { "debug" } else { &config.log_level };
        EnvFilter::new(format!("warn,auscrawl={base_level}"))
    });

    match format {
        TracingFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .compact(),
                )
                .init();
        }
        TracingFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true).json())
                .init();
        }
    }
}
