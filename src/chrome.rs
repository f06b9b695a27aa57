//! Chrome DevTools page source.
//!
//! Attaches to an already running Chrome (local or in a sibling container)
//! through its remote debugging endpoint. Endpoints may be given either as a
//! full `ws://…/devtools/browser/<id>` URL or as an `http://host:port` base,
//! in which case the WebSocket URL is looked up from `/json/version`.
//!
//! Every new tab's browser is told to save downloads into the pipeline's
//! data directory, so the mill list lands where the build stage looks.
//! The path is interpreted by the Chrome host, not by this process.

use anyhow::{anyhow, Context, Result};
use headless_chrome::protocol::cdp::Browser::{SetDownloadBehavior, SetDownloadBehaviorBehaviorOption};
use headless_chrome::{Browser, Tab};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::provider::{NextControl, PageSession, PageSourceProvider};

/// Pagination "next" button of the member table
const NEXT_BUTTON_XPATH: &str = r#"//*[@id="lightning"]/div[4]/button[3]"#;

const CONSENT_BUTTON_SELECTOR: &str = ".coi-consent-banner__agree-button";

const VERSION_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionInfo {
    web_socket_debugger_url: String,
}

/// Connects to remote Chrome instances over the DevTools protocol
#[derive(Debug, Clone)]
pub struct ChromeProvider {
    download_dir: PathBuf,
}

impl ChromeProvider {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        ChromeProvider {
            download_dir: download_dir.into(),
        }
    }

    fn resolve_ws_url(endpoint: &str) -> Result<String> {
        if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            return Ok(endpoint.to_string());
        }

        let url = format!("{}/json/version", endpoint.trim_end_matches('/'));
        let client = reqwest::blocking::Client::builder()
            .timeout(VERSION_LOOKUP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let info: VersionInfo = client
            .get(&url)
            .send()
            .with_context(|| format!("DevTools endpoint unreachable: {}", url))?
            .error_for_status()?
            .json()
            .context("Unexpected /json/version response")?;

        debug!("Resolved {} to {}", endpoint, info.web_socket_debugger_url);
        Ok(info.web_socket_debugger_url)
    }
}

impl PageSourceProvider for ChromeProvider {
    type Session = ChromeSession;

    fn connect(&self, endpoint: &str) -> Result<ChromeSession> {
        let ws_url = Self::resolve_ws_url(endpoint)?;
        let browser = Browser::connect(ws_url).map_err(|e| anyhow!("Failed to attach to Chrome: {}", e))?;
        let tab = browser.new_tab().map_err(|e| anyhow!("Failed to open tab: {}", e))?;

        tab.call_method(download_behavior(&self.download_dir))
            .map_err(|e| anyhow!("Failed to set download directory {}: {}", self.download_dir.display(), e))?;
        debug!("Downloads directed to {}", self.download_dir.display());

        Ok(ChromeSession { _browser: browser, tab })
    }
}

/// `Browser.setDownloadBehavior` accepting downloads into `dir`
fn download_behavior(dir: &Path) -> SetDownloadBehavior {
    SetDownloadBehavior {
        behavior: SetDownloadBehaviorBehaviorOption::Allow,
        browser_context_id: None,
        download_path: Some(dir.display().to_string()),
        events_enabled: None,
    }
}

pub struct ChromeSession {
    // Keeps the DevTools connection open for the tab's lifetime
    _browser: Browser,
    tab: Arc<Tab>,
}

impl PageSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| anyhow!("Navigation to {} failed: {}", url, e))?
            .wait_until_navigated()
            .map_err(|e| anyhow!("Page {} never finished loading: {}", url, e))?;
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| anyhow!("Timed out waiting for '{}': {}", selector, e))?;
        Ok(())
    }

    fn current_markup(&mut self) -> Result<String> {
        self.tab.get_content().map_err(|e| anyhow!("Failed to read page content: {}", e))
    }

    fn click_next(&mut self, timeout: Duration) -> Result<NextControl> {
        let button = match self.tab.wait_for_xpath_with_custom_timeout(NEXT_BUTTON_XPATH, timeout) {
            Ok(button) => button,
            Err(e) => {
                debug!("Next button not found: {}", e);
                return Ok(NextControl::Absent);
            }
        };

        let disabled = button
            .get_attribute_value("disabled")
            .map_err(|e| anyhow!("Failed to inspect next button: {}", e))?;
        if disabled.is_some() {
            return Ok(NextControl::Disabled);
        }

        button.click().map_err(|e| anyhow!("Failed to click next button: {}", e))?;
        Ok(NextControl::Advanced)
    }

    fn click_download(&mut self, selector: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .map_err(|e| anyhow!("No element matches '{}': {}", selector, e))?
            .click()
            .map_err(|e| anyhow!("Failed to click '{}': {}", selector, e))?;
        Ok(())
    }

    fn dismiss_consent(&mut self, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(CONSENT_BUTTON_SELECTOR, timeout)
            .map_err(|e| anyhow!("Consent banner not found: {}", e))?
            .click()
            .map_err(|e| anyhow!("Failed to accept consent banner: {}", e))?;
        Ok(())
    }

    fn release(&mut self) {
        if let Err(e) = self.tab.close(true) {
            warn!("Failed to close Chrome tab: {}", e);
        }
    }
}
