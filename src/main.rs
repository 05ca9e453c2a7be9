use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::banner::BannerClient;
use crate::cli::Args;
use crate::config::Config;
use crate::crawl::{CrawlOptions, Crawler};
use crate::logging::setup_logging;

mod banner;
mod cli;
mod config;
mod crawl;
mod data;
mod error;
mod logging;
mod parse;
mod utils;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and set up logging first so nothing is silently dropped.
    let config = Config::load().expect("Failed to load config");
    setup_logging(&config, args.format, args.verbose);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        output = %args.output.display(),
        workers = args.workers,
        "auscrawl starting"
    );

    let pool = match data::init_db(&args.output, args.force).await {
        Ok(pool) => pool,
        Err(err) => {
            error!(error = %err, "Failed to open database");
            return ExitCode::FAILURE;
        }
    };

    let delay = (args.delay > 0.0).then(|| Duration::from_secs_f64(args.delay));
    let client = Arc::new(BannerClient::new(&config, delay));

    let crawler = Crawler::new(
        client,
        pool.clone(),
        CrawlOptions {
            terms: args.terms,
            latest: args.latest,
            workers: args.workers,
            resume: args.resume,
            no_catalog: args.no_catalog,
            no_details: args.no_details,
        },
    );

    let code = tokio::select! {
        result = crawler.run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!(error = %err, "Crawl failed");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down");
            ExitCode::FAILURE
        }
    };

    pool.close().await;
    code
}
