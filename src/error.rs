// 🚨 Error taxonomy for extraction and resolution
//
// Connection and source errors are fatal. TransientPage is caught at the
// traversal boundary and becomes an early, partial termination.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No candidate endpoint accepted a connection
    #[error("failed to connect to any page source endpoint after {attempts} attempt(s): {last}")]
    Connection { attempts: usize, last: String },

    /// Timeout or missing element while processing one page
    #[error("page {page} could not be processed: {reason}")]
    TransientPage { page: usize, reason: String },

    #[error("unknown source '{0}': must be either 'rspo' or 'uml'")]
    UnknownSource(String),

    #[error("no file matching '{pattern}' in {}", .dir.display())]
    MissingDownload { dir: PathBuf, pattern: String },

    #[error("{} files match '{pattern}' in {}, expected exactly one", .matches.len(), .dir.display())]
    AmbiguousDownload {
        dir: PathBuf,
        pattern: String,
        matches: Vec<PathBuf>,
    },
}
