// 🌐 Page Source Provider - the browser capability the scraper drives
//
// The pipeline only sees these traits. A concrete DevTools implementation
// lives in `chrome` behind the `chrome` feature.

use anyhow::Result;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::RegistryError;

/// Result of trying to advance to the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    /// The control was clicked; a new page is loading
    Advanced,
    /// The control exists but is disabled (last page)
    Disabled,
    /// The control is missing or never became clickable
    Absent,
}

/// One live browsing session. Exclusively owned for one traversal.
pub trait PageSession {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Block until `selector` matches, failing after `timeout`
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    fn current_markup(&mut self) -> Result<String>;

    /// Locate and click the "next page" control.
    /// Absence is reported as `NextControl::Absent`, not as an error.
    fn click_next(&mut self, timeout: Duration) -> Result<NextControl>;

    /// Click the first element matching `selector`, starting a download
    fn click_download(&mut self, selector: &str) -> Result<()>;

    /// Best effort; callers ignore failures
    fn dismiss_consent(&mut self, timeout: Duration) -> Result<()>;

    /// Tear the session down. Called exactly once, by `SessionGuard`.
    fn release(&mut self);
}

pub trait PageSourceProvider {
    type Session: PageSession;

    fn connect(&self, endpoint: &str) -> Result<Self::Session>;
}

// ============================================================================
// SCOPED SESSION
// ============================================================================

/// Owns a session and releases it on drop, on every exit path
pub struct SessionGuard<S: PageSession> {
    session: S,
}

impl<S: PageSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        SessionGuard { session }
    }
}

impl<S: PageSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: PageSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: PageSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.release();
        info!("Page source session released");
    }
}

/// Try each endpoint in order and keep the first session that connects
pub fn connect_first<P: PageSourceProvider>(
    provider: &P,
    endpoints: &[String],
) -> Result<SessionGuard<P::Session>, RegistryError> {
    let mut last_error = None;

    for endpoint in endpoints {
        match provider.connect(endpoint) {
            Ok(session) => {
                info!("Connected to page source at {}", endpoint);
                return Ok(SessionGuard::new(session));
            }
            Err(e) => {
                warn!("Page source endpoint {} unavailable: {:#}", endpoint, e);
                last_error = Some(format!("{:#}", e));
            }
        }
    }

    Err(RegistryError::Connection {
        attempts: endpoints.len(),
        last: last_error.unwrap_or_else(|| "no endpoints configured".to_string()),
    })
}

// ============================================================================
// SCRIPTED PROVIDER (tests)
// ============================================================================


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedPage, ScriptedProvider};
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    fn endpoints() -> Vec<String> {
        vec!["http://a:9222".to_string(), "http://b:9222".to_string(), "http://c:9222".to_string()]
    }

    #[test]
    fn test_connect_first_falls_over_to_next_endpoint() {
        let provider = ScriptedProvider {
            unreachable: vec!["http://a:9222".to_string()],
            ..Default::default()
        };

        let session = connect_first(&provider, &endpoints()).unwrap();
        assert_eq!(provider.connects.get(), 2);

        drop(session);
        assert_eq!(provider.releases.get(), 1);
    }

    #[test]
    fn test_connect_first_fails_when_all_endpoints_fail() {
        let provider = ScriptedProvider {
            unreachable: endpoints(),
            ..Default::default()
        };

        let err = connect_first(&provider, &endpoints()).err().unwrap();
        match err {
            RegistryError::Connection { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("http://c:9222"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(provider.releases.get(), 0);
    }

    #[test]
    fn test_session_released_when_traversal_panics() {
        let provider = ScriptedProvider::with_pages(vec![ScriptedPage::new("<table></table>", NextControl::Advanced)]);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut session = connect_first(&provider, &endpoints()).unwrap();
            session.wait_for("tr", Duration::from_millis(10)).unwrap();
            panic!("extractor blew up mid-page");
        }));

        assert!(result.is_err());
        assert_eq!(provider.releases.get(), 1);
    }

    #[test]
    fn test_connect_first_with_no_endpoints() {
        let provider = ScriptedProvider::default();
        let err = connect_first(&provider, &[]).err().unwrap();
        assert!(err.to_string().contains("no endpoints configured"));
    }
}
