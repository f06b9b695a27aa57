// 🔍 Resolver / Deduplication Engine - precedence-based merge of both sources
//
// Concatenate member rows and unpivoted mill rows, move every classified
// row ahead of every unclassified one (stable), then keep the first row
// per name. A classified row therefore always beats an unclassified one,
// and among equals the earliest inserted wins.

use std::collections::HashSet;
use tracing::info;

use crate::records::{NormalizedEntityRecord, UnifiedRegistryRecord, UnpivotedRecord};

// ============================================================================
// RESOLUTION REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Rows entering the resolver
    pub input: usize,
    /// Rows skipped because their name was empty
    pub blank: usize,
    /// Rows collapsed into an earlier row with the same name
    pub duplicates: usize,
    /// Rows in the final registry
    pub output: usize,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Merge both sources into the final registry.
///
/// Rows whose cleaned name is empty are skipped, not kept as one nameless
/// entity; they are counted in `ResolutionReport::blank`.
pub fn resolve(
    members: Vec<NormalizedEntityRecord>,
    mills: Vec<UnpivotedRecord>,
) -> (Vec<UnifiedRegistryRecord>, ResolutionReport) {
    let candidates: Vec<UnifiedRegistryRecord> = members
        .into_iter()
        .map(UnifiedRegistryRecord::from)
        .chain(mills.into_iter().map(UnifiedRegistryRecord::from))
        .collect();

    deduplicate(candidates)
}

/// Drop blank names, order classified rows first and keep the first
/// occurrence of each name. `candidates` must already be in insertion
/// order; the sort is stable so that order is the only tie-break.
pub fn deduplicate(mut candidates: Vec<UnifiedRegistryRecord>) -> (Vec<UnifiedRegistryRecord>, ResolutionReport) {
    let mut report = ResolutionReport {
        input: candidates.len(),
        ..Default::default()
    };

    candidates.retain(|record| !record.name.is_empty());
    report.blank = report.input - candidates.len();

    // false sorts before true: classified rows come first
    candidates.sort_by_key(|record| !record.class.is_classified());

    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    let resolved: Vec<UnifiedRegistryRecord> = candidates
        .into_iter()
        .filter(|record| seen.insert(record.name.clone()))
        .collect();

    report.output = resolved.len();
    report.duplicates = report.input - report.blank - report.output;

    info!(
        "Resolved {} rows into {} entities ({} duplicates, {} blank names)",
        report.input, report.output, report.duplicates, report.blank
    );

    (resolved, report)
}

// ============================================================================
// TESTS
// ============================================================================
