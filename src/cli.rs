use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Historical course-data crawler for the AUS Banner system.
#[derive(Parser, Debug)]
#[command(name = "auscrawl", version, about)]
pub struct Args {
    /// Path of the SQLite database to write.
    #[arg(short, long, default_value = "auscrawl.db")]
    pub output: PathBuf,

    /// Crawl only these term ids (repeatable).
    #[arg(short, long)]
    pub terms: Vec<String>,

    /// Crawl only the most recent term.
    #[arg(long, conflicts_with = "terms")]
    pub latest: bool,

    /// Concurrent term fetches.
    #[arg(short, long, default_value_t = 50)]
    pub workers: usize,

    /// Seconds to wait between requests.
    #[arg(short, long, default_value_t = 0.0)]
    pub delay: f64,

    /// Skip terms already present in the database.
    #[arg(long)]
    pub resume: bool,

    /// Delete any existing database before crawling.
    #[arg(long, conflicts_with = "resume")]
    pub force: bool,

    /// Skip the catalog-description phase.
    #[arg(long)]
    pub no_catalog: bool,

    /// Skip the section-detail phase.
    #[arg(long)]
    pub no_details: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub format: TracingFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TracingFormat {
    Pretty,
    Json,
}
