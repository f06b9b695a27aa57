// Supply Chain Registry - Core Library
// Exposes all modules for use in the build and scrape binaries, and tests

pub mod records;
pub mod error;
pub mod config;
pub mod provider;       // Page source abstraction + session lifecycle
pub mod parser;         // Tree extraction of the member table
pub mod pagination;     // Page traversal + mill list download
pub mod cleaning;       // Text cleaning, title case, stable ids
pub mod reshape;        // Mill list unpivot
pub mod rules;          // Classification rules
pub mod deduplication;  // Precedence-based resolver
pub mod files;
pub mod db;
pub mod pipeline;

#[cfg(feature = "chrome")]
pub mod chrome;

// Re-export commonly used types
pub use records::{
    RawEntityRecord, RawMillRecord,
    NormalizedEntityRecord, NormalizedMillRecord,
    UnpivotedRecord, UnifiedRegistryRecord,
    IdType, EntityClass, MillField,
};
pub use error::RegistryError;
pub use config::{PipelineConfig, Timings};
pub use provider::{NextControl, PageSession, PageSourceProvider, SessionGuard, connect_first};
pub use parser::{SourceKind, TreeExtractor, extract_entities};
pub use pagination::{
    Traversal, TraversalOutcome, DownloadOutcome,
    traverse, scrape_members, fetch_mill_list,
};
pub use cleaning::{
    TextCleaner, StandardCleaner,
    title_case, stable_id, normalize_members, normalize_mills,
};
pub use reshape::unpivot;
pub use rules::{classify_mill_field, classify_members, classify_mills};
pub use deduplication::{ResolutionReport, resolve, deduplicate};
pub use db::{
    RunInfo,
    open_registry_db, setup_database, replace_registry,
    get_registry, verify_count, get_run_ids,
};
pub use pipeline::{
    CleanedSource, BuildSummary, ScrapeSummary,
    clean_source, assemble_registry, build_registry, scrape_sources,
};

#[cfg(feature = "chrome")]
pub use chrome::ChromeProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
