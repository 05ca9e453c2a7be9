//! The crawl pipeline: term discovery, per-term harvesting, and the
//! catalog and section-detail passes.
//!
//! Fetching is concurrent but persistence is a single sequential writer in
//! ascending term order, so first-seen stamps always land on the earliest
//! term that mentions a value.

pub mod stats;

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::banner::{BannerClient, SearchSession};
use crate::data;
use crate::data::models::{ExtractedSection, SubjectPair, Term};
use crate::error::Result;
use crate::parse;
use crate::utils::fmt_duration;
use stats::{summary_lines, RunStats, TermStats};

/// Cap on subject codes per listing request; larger form bodies trip the
/// upstream WAF.
const SUBJECT_BATCH_SIZE: usize = 250;

/// Catalog pages barely change term to term, so only this many
/// evenly-spaced terms are sampled.
const CATALOG_SAMPLE_COUNT: usize = 6;

/// Detail rows accumulated before an intermediate save.
const DETAIL_BATCH_SIZE: usize = 5000;

/// The GET endpoints rate-limit much sooner than the search POST.
const DETAIL_WORKER_CAP: usize = 10;

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub terms: Vec<String>,
    pub latest: bool,
    pub workers: usize,
    pub resume: bool,
    pub no_catalog: bool,
    pub no_details: bool,
}

pub struct Crawler {
    client: Arc<BannerClient>,
    pool: SqlitePool,
    opts: CrawlOptions,
}

impl Crawler {
    pub fn new(client: Arc<BannerClient>, pool: SqlitePool, opts: CrawlOptions) -> Self {
        Self { client, pool, opts }
    }

    /// Run the full pipeline. Only discovery failures and database errors
    /// outside a term's scope abort the run.
    pub async fn run(&self) -> Result<()> {
        let started = Instant::now();

        let terms = self.discover_terms().await?;
        if terms.is_empty() {
            info!("Nothing to crawl");
            return Ok(());
        }

        let run = self.harvest_terms(terms).await?;
        data::subjects::backfill_first_seen(&self.pool).await?;

        info!(
            terms = run.terms_crawled,
            failed = run.terms_failed,
            courses = run.courses,
            new_subjects = run.new_subjects,
            new_instructors = run.reference.instructors,
            "Course harvest finished"
        );

        if !self.opts.no_catalog {
            self.run_catalog_phase().await?;
        }
        if !self.opts.no_details {
            self.run_detail_phase().await?;
        }

        let counts = data::summary_counts(&self.pool).await?;
        for (table, count) in summary_lines(&counts) {
            info!(table, count, "Final row count");
        }
        info!(elapsed = fmt_duration(started.elapsed()), "Crawl complete");

        Ok(())
    }

    /// Enumerate terms and apply the `--terms`/`--latest`/`--resume`
    /// filters. An empty upstream list is fatal; an empty filtered list
    /// is not.
    async fn discover_terms(&self) -> Result<Vec<Term>> {
        let mut terms = self.client.get_terms().await?;
        info!(count = terms.len(), "Discovered terms");

        if !self.opts.terms.is_empty() {
            terms.retain(|t| self.opts.terms.contains(&t.term_id));
            info!(count = terms.len(), "Filtered to requested terms");
        }

        if self.opts.latest
            && let Some(last) = terms.pop()
        {
            info!(term = %last.term_name, "Latest term only");
            terms = vec![last];
        }

        if self.opts.resume {
            let existing = data::terms::existing_term_ids(&self.pool).await?;
            let before = terms.len();
            terms.retain(|t| !existing.contains(&t.term_id));
            info!(
                skipped = before - terms.len(),
                remaining = terms.len(),
                "Resuming, already-crawled terms skipped"
            );
        }

        Ok(terms)
    }

    /// Fetch every term's subjects and listings concurrently, persisting
    /// results in ascending term order as they complete.
    async fn harvest_terms(&self, terms: Vec<Term>) -> Result<RunStats> {
        info!(
            terms = terms.len(),
            workers = self.opts.workers,
            "Harvesting course listings"
        );

        let mut harvests = stream::iter(terms.into_iter().map(|term| {
            let client = Arc::clone(&self.client);
            async move {
                let harvest = harvest_term(&client, &term.term_id).await;
                (term, harvest)
            }
        }))
        .buffered(self.opts.workers.max(1));

        let mut run = RunStats::default();
        while let Some((term, harvest)) = harvests.next().await {
            let (subjects, sections) = match harvest {
                Ok(harvest) => harvest,
                Err(err) => {
                    error!(term = %term.term_id, error = %err, "Term crawl failed, skipping");
                    run.terms_failed += 1;
                    continue;
                }
            };

            match persist_term(&self.pool, &term, &subjects, &sections).await {
                Ok(term_stats) => {
                    info!(
                        term = %term.term_id,
                        name = %term.term_name,
                        courses = term_stats.courses,
                        new_subjects = term_stats.new_subjects,
                        new_instructors = term_stats.reference.instructors,
                        new_levels = term_stats.reference.levels,
                        new_attributes = term_stats.reference.attributes,
                        "Term persisted"
                    );
                    run.absorb(&term_stats);
                }
                Err(err) => {
                    error!(term = %term.term_id, error = %err, "Term persistence failed, skipping");
                    run.terms_failed += 1;
                }
            }
        }

        Ok(run)
    }

    fn detail_workers(&self) -> usize {
        self.opts.workers.clamp(1, DETAIL_WORKER_CAP)
    }

    /// Phase 4: per-course descriptions from the catalog pages of a small
    /// term sample.
    async fn run_catalog_phase(&self) -> Result<()> {
        let term_ids = data::terms::crawled_term_ids(&self.pool).await?;
        let subjects = data::subjects::crawled_subject_codes(&self.pool).await?;
        if term_ids.is_empty() || subjects.is_empty() {
            return Ok(());
        }

        let sample = sample_evenly(&term_ids, CATALOG_SAMPLE_COUNT);
        let pairs: Vec<(String, String)> = sample
            .iter()
            .flat_map(|term_id| {
                subjects
                    .iter()
                    .map(move |subject| (subject.clone(), term_id.clone()))
            })
            .collect();

        info!(
            requests = pairs.len(),
            sampled_terms = sample.len(),
            "Fetching catalog descriptions"
        );

        let mut fetches = stream::iter(pairs.into_iter().map(|(subject, term_id)| {
            let client = Arc::clone(&self.client);
            async move {
                let page = client.get_catalog(&term_id, &subject).await;
                (subject, term_id, page)
            }
        }))
        .buffer_unordered(self.detail_workers());

        let mut entries = Vec::new();
        let mut errors = 0u64;
        while let Some((subject, term_id, page)) = fetches.next().await {
            match page {
                Ok(body) => entries.extend(parse::catalog::parse_catalog_page(&body)),
                Err(err) => {
                    errors += 1;
                    warn!(subject, term = %term_id, error = %err, "Catalog fetch failed");
                }
            }
        }

        let written = data::catalog::save_catalog(&self.pool, &entries).await?;
        info!(entries = written, errors, "Catalog phase finished");
        Ok(())
    }

    /// Phase 5: one detail page per (crn, term) pair not yet detailed,
    /// batch-saved for crash resilience.
    async fn run_detail_phase(&self) -> Result<()> {
        let existing = data::details::existing_detail_keys(&self.pool).await?;
        let pending: Vec<(String, String)> = data::courses::all_section_keys(&self.pool)
            .await?
            .into_iter()
            .filter(|key| !existing.contains(key))
            .collect();
        if pending.is_empty() {
            info!("Section details already complete");
            return Ok(());
        }

        info!(
            sections = pending.len(),
            workers = self.detail_workers(),
            "Fetching section details"
        );

        let mut fetches = stream::iter(pending.into_iter().map(|(crn, term_id)| {
            let client = Arc::clone(&self.client);
            async move {
                let page = client.get_detail(&term_id, &crn).await;
                (crn, term_id, page)
            }
        }))
        .buffer_unordered(self.detail_workers());

        let mut details = Vec::new();
        let mut deps = Vec::new();
        let mut errors = 0u64;
        let mut fetched = 0u64;

        while let Some((crn, term_id, page)) = fetches.next().await {
            match page {
                Ok(body) => {
                    let (detail, section_deps) =
                        parse::detail::parse_detail_page(&body, &crn, &term_id);
                    details.push(detail);
                    deps.extend(section_deps);
                    fetched += 1;
                }
                Err(err) => {
                    errors += 1;
                    warn!(crn, term = %term_id, error = %err, "Detail fetch failed");
                }
            }

            if details.len() >= DETAIL_BATCH_SIZE {
                data::details::save_details(&self.pool, &details, &deps).await?;
                details.clear();
                deps.clear();
            }
        }

        data::details::save_details(&self.pool, &details, &deps).await?;
        info!(sections = fetched, errors, "Detail phase finished");
        Ok(())
    }
}

/// Fetch one term's subjects and full course listing.
async fn harvest_term(
    client: &BannerClient,
    term_id: &str,
) -> Result<(Vec<SubjectPair>, Vec<ExtractedSection>)> {
    let subjects = client.get_subjects(term_id).await?;

    let mut sections = Vec::new();
    for batch in subjects.chunks(SUBJECT_BATCH_SIZE) {
        let codes = batch.iter().map(|s| s.short_name.clone()).collect();
        let session = SearchSession::new(term_id, codes);
        let body = client.get_listing(&session).await?;
        sections.extend(parse::listing::extract_sections(&body));
    }

    Ok((subjects, sections))
}

/// Write one term's harvest: semester row, then subjects, then the
/// reference rows and course row of each section.
async fn persist_term(
    pool: &SqlitePool,
    term: &Term,
    subjects: &[SubjectPair],
    sections: &[ExtractedSection],
) -> Result<TermStats> {
    data::terms::insert_term(pool, term).await?;

    let mut stats = TermStats::default();
    for subject in subjects {
        if data::subjects::upsert_subject(pool, subject, &term.term_id).await? {
            stats.new_subjects += 1;
        }
    }

    for section in sections {
        let counts = data::reference::upsert_for_section(pool, section, &term.term_id).await?;
        stats.reference.add(counts);
        data::courses::upsert_course(pool, &term.term_id, &section.course).await?;
        stats.courses += 1;
    }

    Ok(stats)
}

/// Pick up to roughly `count` evenly-spaced items, always including the
/// last.
fn sample_evenly(items: &[String], count: usize) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }
    let step = (items.len() / count).max(1);
    let mut sample: Vec<String> = items.iter().step_by(step).cloned().collect();
    if let Some(last) = items.last()
        && sample.last() != Some(last)
    {
        sample.push(last.clone());
    }
    sample
}
