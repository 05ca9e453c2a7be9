use figment::{Figment, providers::Env};
use serde::Deserialize;
use url::Url;

/// Environment-driven configuration, prefixed `AUSCRAWL_`.
///
/// Everything has a default; the crawler runs with no environment at all.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the Banner self-service procedures.
    #[serde(default = "default_base_url")]
    pub banner_base_url: Url,

    /// Base log level for this crate's own events.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> Url {
    Url::parse("https://banner.aus.edu/axp3b21h/owa").expect("valid default base URL")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_user_agent() -> String {
    "AUSCrawl/2.0 (academic-data-project)".to_string()
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("AUSCRAWL_"))
            .extract()
    }
}
