// 📄 Pagination Driver - walk the member table page by page
//
// Idle → Scraping → (NextPage | Terminal). Pages are strictly sequential:
// the extractor's parent slot has to see them in order. A failing page is
// never retried; it ends the traversal with whatever was collected so far.

use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{PipelineConfig, Timings};
use crate::error::RegistryError;
use crate::parser::TreeExtractor;
use crate::provider::{connect_first, NextControl, PageSession, PageSourceProvider};
use crate::records::RawEntityRecord;

/// Rows of the member table; their presence means the page has rendered
pub const ROW_SELECTOR: &str = "tr";

/// Links to the mill list file
pub const DOWNLOAD_LINK_SELECTOR: &str = r#"a[href*=".csv"]"#;

// ============================================================================
// TRAVERSAL RESULT
// ============================================================================

#[derive(Debug)]
pub enum TraversalOutcome {
    /// The next control was disabled or absent: normal end
    Exhausted,
    /// A page failed; `records` holds everything before the failure
    Interrupted(RegistryError),
}

#[derive(Debug)]
pub struct Traversal {
    pub records: Vec<RawEntityRecord>,
    /// Pages fully extracted
    pub pages: usize,
    pub outcome: TraversalOutcome,
}

impl Traversal {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, TraversalOutcome::Exhausted)
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// Extract every page reachable from the session's current page.
///
/// Never fails: a transient page error is logged and converts into an
/// `Interrupted` outcome carrying the partial result.
pub fn traverse<S: PageSession>(session: &mut S, timings: &Timings) -> Traversal {
    let mut extractor = TreeExtractor::new();
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let timeout = if page == 1 {
            timings.initial_timeout
        } else {
            timings.page_timeout
        };

        info!("Scraping page {}", page);
        let page_records = match load_page(session, &mut extractor, timeout) {
            Ok(page_records) => page_records,
            Err(e) => return interrupted(records, page - 1, page, e),
        };
        info!("Page {}: {} records", page, page_records.len());
        records.extend(page_records);

        match session.click_next(timings.page_timeout) {
            Ok(NextControl::Advanced) => {
                pause(timings.page_delay);
                page += 1;
            }
            Ok(NextControl::Disabled) => {
                info!("Reached last page ({}): next control disabled", page);
                return finished(records, page, extractor.dropped());
            }
            Ok(NextControl::Absent) => {
                info!("Reached last page ({}): next control missing or not clickable", page);
                return finished(records, page, extractor.dropped());
            }
            Err(e) => return interrupted(records, page, page, e),
        }
    }
}

fn load_page<S: PageSession>(
    session: &mut S,
    extractor: &mut TreeExtractor,
    timeout: Duration,
) -> Result<Vec<RawEntityRecord>> {
    session
        .wait_for(ROW_SELECTOR, timeout)
        .context("table rows never appeared")?;
    let markup = session.current_markup().context("failed to read page markup")?;
    Ok(extractor.extract_page(&markup))
}

fn finished(records: Vec<RawEntityRecord>, pages: usize, dropped: usize) -> Traversal {
    if dropped > 0 {
        warn!("{} sub-entities had no preceding parent row and were dropped", dropped);
    }
    Traversal {
        records,
        pages,
        outcome: TraversalOutcome::Exhausted,
    }
}

fn interrupted(records: Vec<RawEntityRecord>, pages: usize, page: usize, cause: anyhow::Error) -> Traversal {
    let err = RegistryError::TransientPage {
        page,
        reason: format!("{:#}", cause),
    };
    error!("Error during scraping: {}", err);
    Traversal {
        records,
        pages,
        outcome: TraversalOutcome::Interrupted(err),
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

// ============================================================================
// SOURCE FLOWS
// ============================================================================

/// Connect, open the member table and traverse all of its pages.
///
/// Fails only if no endpoint connects or the start page cannot be opened.
/// The session is released before returning on every path.
pub fn scrape_members<P: PageSourceProvider>(provider: &P, config: &PipelineConfig) -> Result<Traversal> {
    let mut session = connect_first(provider, &config.endpoints)?;

    session
        .navigate(&config.members_url)
        .with_context(|| format!("Failed to open member table: {}", config.members_url))?;
    pause(config.timings.navigation_delay);

    let traversal = traverse(&mut *session, &config.timings);
    info!(
        "Finished scraping: {} records from {} page(s)",
        traversal.records.len(),
        traversal.pages
    );
    Ok(traversal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The download link was clicked and the delay has elapsed
    Triggered,
    /// No download link could be clicked
    LinkMissing,
}

/// Open the mill list page and click its CSV download link.
///
/// The consent banner is dismissed on a best-effort basis. A missing link
/// is reported, not raised; the file check happens when the list is read.
pub fn fetch_mill_list<P: PageSourceProvider>(provider: &P, config: &PipelineConfig) -> Result<DownloadOutcome> {
    let mut session = connect_first(provider, &config.endpoints)?;
    let timings = &config.timings;

    session
        .navigate(&config.mill_list_url)
        .with_context(|| format!("Failed to open mill list page: {}", config.mill_list_url))?;
    pause(timings.navigation_delay);

    match session.dismiss_consent(timings.page_timeout) {
        Ok(()) => pause(timings.consent_delay),
        Err(e) => info!("No consent banner or already accepted ({:#})", e),
    }

    match session.click_download(DOWNLOAD_LINK_SELECTOR) {
        Ok(()) => {
            info!("Downloading mill list");
            pause(timings.download_delay);
            info!("Finished downloading mill list");
            Ok(DownloadOutcome::Triggered)
        }
        Err(e) => {
            error!("Error finding or clicking download link: {:#}", e);
            Ok(DownloadOutcome::LinkMissing)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
