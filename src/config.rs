// ⚙️ Pipeline configuration - fixed locations, endpoints and timings
//
// There are no CLI flags. Container deployments may override paths and
// DevTools endpoints through environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const MEMBERS_URL: &str = "https://rspo.my.salesforce-sites.com/membership/AT_SearchMember_VFPage";
pub const MILL_LIST_URL: &str =
    "https://www.rainforest-alliance.org/business/certification/the-universal-mill-list/";

/// Candidate DevTools endpoints, tried in order
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "http://localhost:9222",
    "http://172.17.0.3:9222",
    "http://host.docker.internal:9222",
];

pub const MEMBERS_FILE: &str = "rspo_members_raw.csv";
pub const MILL_LIST_PATTERN: &str = "UML*.csv";
pub const REGISTRY_FILE: &str = "supply_chain_entities.csv";
pub const REGISTRY_DB_FILE: &str = "supply_chain_entities.db";

// ============================================================================
// TIMINGS
// ============================================================================

/// Bounded waits and fixed delays used while driving the page source
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    /// Wait for the first page's rows
    pub initial_timeout: Duration,
    /// Wait for rows and the next control on every later page
    pub page_timeout: Duration,
    /// Pause after navigating to a start URL
    pub navigation_delay: Duration,
    /// Pause after advancing to the next page
    pub page_delay: Duration,
    pub consent_delay: Duration,
    /// Time given to the browser to materialize a download
    pub download_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            initial_timeout: Duration::from_secs(60),
            page_timeout: Duration::from_secs(10),
            navigation_delay: Duration::from_secs(5),
            page_delay: Duration::from_secs(5),
            consent_delay: Duration::from_secs(1),
            download_delay: Duration::from_secs(10),
        }
    }
}

impl Timings {
    #[cfg(test)]
    pub(crate) fn instant() -> Self {
        Timings {
            initial_timeout: Duration::from_millis(10),
            page_timeout: Duration::from_millis(10),
            navigation_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            consent_delay: Duration::ZERO,
            download_delay: Duration::ZERO,
        }
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Where raw extractions and downloads land
    pub data_dir: PathBuf,
    /// Where the final registry is written
    pub output_dir: PathBuf,
    pub members_url: String,
    pub mill_list_url: String,
    pub endpoints: Vec<String>,
    pub timings: Timings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: PathBuf::from("/project/data/csv"),
            output_dir: PathBuf::from("/project/output"),
            members_url: MEMBERS_URL.to_string(),
            mill_list_url: MILL_LIST_URL.to_string(),
            endpoints: DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            timings: Timings::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, overridden by REGISTRY_DATA_DIR, REGISTRY_OUTPUT_DIR and
    /// CHROME_DEBUG_ENDPOINTS (comma separated) when set
    pub fn from_env() -> Self {
        let mut config = PipelineConfig::default();

        if let Ok(dir) = env::var("REGISTRY_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("REGISTRY_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(endpoints) = env::var("CHROME_DEBUG_ENDPOINTS") {
            let parsed = parse_endpoints(&endpoints);
            if !parsed.is_empty() {
                config.endpoints = parsed;
            }
        }

        config
    }

    pub fn members_path(&self) -> PathBuf {
        self.data_dir.join(MEMBERS_FILE)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.output_dir.join(REGISTRY_FILE)
    }

    pub fn registry_db_path(&self) -> PathBuf {
        self.output_dir.join(REGISTRY_DB_FILE)
    }
}

fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.members_path(), PathBuf::from("/project/data/csv/rspo_members_raw.csv"));
        assert_eq!(config.registry_path(), PathBuf::from("/project/output/supply_chain_entities.csv"));
        assert_eq!(config.endpoints.len(), 3);
        assert_eq!(config.timings.initial_timeout, Duration::from_secs(60));
        assert_eq!(config.timings.page_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_endpoints_skips_blanks() {
        let parsed = parse_endpoints(" http://a:9222, ,ws://b:9222/devtools/browser/x ,");
        assert_eq!(parsed, vec!["http://a:9222", "ws://b:9222/devtools/browser/x"]);
    }
}
