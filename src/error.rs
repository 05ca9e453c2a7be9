//! Error taxonomy for the crawl pipeline.
//!
//! The variants map onto how failures are scoped: `Discovery` during term
//! enumeration is fatal to the whole run, `Fetch` is retried with backoff
//! before being promoted to a term-scoped failure, `Parse` aborts only the
//! offending record or term, and `Persistence` is surfaced without retry
//! (retrying a write could duplicate data).

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("request failed: {url}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to parse {context}: {detail}")]
    Parse {
        context: &'static str,
        detail: String,
    },

    #[error("database write failed")]
    Persistence(#[from] sqlx::Error),
}

impl CrawlError {
    pub fn parse(context: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            context,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
