//! HTTP client for the Banner self-service pages.
//!
//! Banner sits behind a WAF that answers blocked requests with a 200 page
//! asking the visitor to open a support ticket, so retry handling inspects
//! bodies as well as status codes. All requests go through
//! [`BannerClient::send_with_retry`], which applies exponential backoff with
//! jitter and an optional fixed-rate limiter.

pub mod session;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rand::Rng;
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::data::models::{SubjectPair, Term};
use crate::error::{CrawlError, Result};
use crate::parse;

pub use session::SearchSession;

const MAX_RETRIES: u32 = 5;
const RETRY_BASE_SECS: f64 = 2.0;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Server-side procedures, relative to the base URL.
const PROC_TERMS: &str = "bwckschd.p_disp_dyn_sched";
const PROC_SUBJECTS: &str = "bwckgens.p_proc_term_date";
const PROC_COURSES: &str = "bwckschd.p_get_crse_unsec";
const PROC_CATALOG: &str = "bwckctlg.p_display_courses";
const PROC_DETAIL: &str = "bwckschd.p_disp_detail_sched";

pub struct BannerClient {
    http: reqwest::Client,
    base: Url,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl BannerClient {
    /// Build a client from config plus the per-request delay, if any.
    pub fn new(config: &Config, delay: Option<Duration>) -> Self {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(&config.user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest client");

        // Url::join treats a path without a trailing slash as a file and
        // would replace its last segment.
        let mut base = config.banner_base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let limiter = delay
            .filter(|d| !d.is_zero())
            .and_then(Quota::with_period)
            .map(RateLimiter::direct);

        Self {
            http,
            base,
            limiter,
        }
    }

    fn endpoint(&self, proc: &str) -> Url {
        self.base.join(proc).expect("valid endpoint path")
    }

    fn fetch_error(url: &Url, source: impl Into<anyhow::Error>) -> CrawlError {
        CrawlError::Fetch {
            url: url.to_string(),
            source: source.into(),
        }
    }

    fn retryable(status: StatusCode) -> bool {
        status == StatusCode::FORBIDDEN
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
    }

    async fn backoff(attempt: u32) {
        let jitter: f64 = rand::rng().random_range(0.0..1.0);
        let wait = RETRY_BASE_SECS * f64::from(2u32.pow(attempt)) + jitter;
        tokio::time::sleep(Duration::from_secs_f64(wait)).await;
    }

    /// Issue one request with retry, WAF detection, and rate limiting.
    ///
    /// Returns the response body. Non-retryable statuses and exhausted
    /// retries surface as [`CrawlError::Fetch`].
    async fn send_with_retry(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(&'static str, String)]>,
        query: Option<&[(&'static str, &str)]>,
    ) -> Result<String> {
        for attempt in 1..=MAX_RETRIES {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(form) = form {
                request = request.form(form);
            }
            if let Some(query) = query {
                request = request.query(query);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    if attempt == MAX_RETRIES {
                        return Err(Self::fetch_error(&url, err));
                    }
                    warn!(%url, attempt, error = %err, "Network error, retrying");
                    Self::backoff(attempt).await;
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                if Self::retryable(status) && attempt < MAX_RETRIES {
                    warn!(%url, attempt, %status, "Retryable HTTP status");
                    Self::backoff(attempt).await;
                    continue;
                }
                return Err(Self::fetch_error(
                    &url,
                    anyhow::anyhow!("HTTP {status} after {attempt} attempt(s)"),
                ));
            }

            let body = response
                .text()
                .await
                .map_err(|err| Self::fetch_error(&url, err))?;

            // The WAF answers blocked requests with a 200 interstitial.
            if body.to_lowercase().contains("support ticket") {
                if attempt == MAX_RETRIES {
                    return Err(Self::fetch_error(
                        &url,
                        anyhow::anyhow!("WAF block persisted through {MAX_RETRIES} attempts"),
                    ));
                }
                warn!(%url, attempt, "WAF block page, backing off");
                Self::backoff(attempt).await;
                continue;
            }

            return Ok(body);
        }

        Err(Self::fetch_error(
            &url,
            anyhow::anyhow!("exhausted {MAX_RETRIES} retries"),
        ))
    }

    /// Enumerate every selectable term, ascending by term id.
    pub async fn get_terms(&self) -> Result<Vec<Term>> {
        let url = self.endpoint(PROC_TERMS);
        let body = self.send_with_retry(Method::GET, url, None, None).await?;
        parse::options::parse_term_options(&body)
    }

    /// Fetch the subject list for one term.
    pub async fn get_subjects(&self, term_id: &str) -> Result<Vec<SubjectPair>> {
        let url = self.endpoint(PROC_SUBJECTS);
        let form = [
            ("p_calling_proc", PROC_TERMS.to_string()),
            ("p_term", term_id.to_string()),
        ];
        let body = self
            .send_with_retry(Method::POST, url, Some(&form), None)
            .await?;
        let columns = parse::options::parse_subject_columns(&body);
        parse::options::align_subjects(&columns)
    }

    /// Run one course-search POST and return the raw listing page.
    pub async fn get_listing(&self, session: &SearchSession) -> Result<String> {
        let url = self.endpoint(PROC_COURSES);
        let form = session.form_params();
        self.send_with_retry(Method::POST, url, Some(&form), None)
            .await
    }

    /// Fetch the catalog page listing every course under one subject.
    pub async fn get_catalog(&self, term_id: &str, subject: &str) -> Result<String> {
        let url = self.endpoint(PROC_CATALOG);
        let query = [
            ("term_in", term_id),
            ("one_subj", subject),
            ("sel_crse_strt", "0"),
            ("sel_crse_end", "9999"),
            ("sel_subj", ""),
            ("sel_levl", ""),
            ("sel_schd", ""),
            ("sel_coll", ""),
            ("sel_divs", ""),
            ("sel_dept", ""),
            ("sel_attr", ""),
        ];
        self.send_with_retry(Method::GET, url, None, Some(&query))
            .await
    }

    /// Fetch the detail page for one section.
    pub async fn get_detail(&self, term_id: &str, crn: &str) -> Result<String> {
        let url = self.endpoint(PROC_DETAIL);
        let query = [("term_in", term_id), ("crn_in", crn)];
        self.send_with_retry(Method::GET, url, None, Some(&query))
            .await
    }
}
