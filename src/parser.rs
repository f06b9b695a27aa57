// 🏗️ Parser - Source kinds and the member-table tree extractor
//
// The member table renders a hierarchy as a flat list of rows: a parent row
// followed by a row listing its subsidiaries. The extractor rebuilds the
// parent → subsidiary links with a single "current parent" slot.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;
use tracing::debug;

use crate::error::RegistryError;
use crate::records::RawEntityRecord;

// ============================================================================
// SOURCE KIND
// ============================================================================

/// SourceKind - Which of the two harvested sources a record set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Paginated member table (groups and their subsidiaries)
    Rspo,
    /// Downloaded Universal Mill List
    Uml,
}

impl SourceKind {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Rspo => "RSPO members",
            SourceKind::Uml => "Universal Mill List",
        }
    }

    /// Short code used in configuration
    pub fn code(&self) -> &'static str {
        match self {
            SourceKind::Rspo => "rspo",
            SourceKind::Uml => "uml",
        }
    }
}

impl FromStr for SourceKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rspo" => Ok(SourceKind::Rspo),
            "uml" => Ok(SourceKind::Uml),
            _ => Err(RegistryError::UnknownSource(s.to_string())),
        }
    }
}

// ============================================================================
// SELECTORS
// ============================================================================

/// Class that marks a parent (member) row
const PARENT_ROW_CLASS: &str = "slds-hint-parent";

// Constant selectors; parse() only fails on malformed CSS.
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());

static LABELED_CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[data-label]").unwrap());

static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").unwrap());

static GROUP_INFO_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".groupMemberInfo").unwrap());

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

// ============================================================================
// TREE EXTRACTOR
// ============================================================================

/// What a subsidiary row needs from its parent
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParentContext {
    name: Option<String>,
    country: Option<String>,
}

/// Tree extractor for the member table.
///
/// Holds one parent slot (not a stack), so only one level of nesting is
/// represented. The slot survives between `extract_page` calls: a
/// subsidiary block at the top of a page attaches to the last parent of
/// the previous page.
#[derive(Debug, Default)]
pub struct TreeExtractor {
    current_parent: Option<ParentContext>,
    dropped: usize,
}

impl TreeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sub-entities discarded because no parent row had been seen yet
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Parse one page of markup into records, in document order
    pub fn extract_page(&mut self, markup: &str) -> Vec<RawEntityRecord> {
        let document = Html::parse_document(markup);
        let mut records = Vec::new();

        for row in document.select(&ROW_SELECTOR) {
            if is_parent_row(&row) {
                let record = parse_parent_row(&row);
                self.current_parent = Some(ParentContext {
                    name: record.name.clone(),
                    country: record.country.clone(),
                });
                records.push(record);
            } else {
                self.push_subsidiaries(&row, &mut records);
            }
        }

        records
    }

    fn push_subsidiaries(&mut self, row: &ElementRef, records: &mut Vec<RawEntityRecord>) {
        let Some(group_info) = row.select(&GROUP_INFO_SELECTOR).next() else {
            return;
        };

        let names: Vec<String> = group_info
            .select(&PARAGRAPH_SELECTOR)
            .map(|p| fragment_text(&p))
            .collect();

        match &self.current_parent {
            Some(parent) => {
                for name in names {
                    records.push(RawEntityRecord::subsidiary(
                        name,
                        parent.country.clone(),
                        parent.name.clone(),
                    ));
                }
            }
            None => {
                debug!("Dropping {} sub-entities listed before any parent row", names.len());
                self.dropped += names.len();
            }
        }
    }
}

/// Parse a single page without carrying parent context in or out
pub fn extract_entities(markup: &str) -> Vec<RawEntityRecord> {
    TreeExtractor::new().extract_page(markup)
}

fn is_parent_row(row: &ElementRef) -> bool {
    row.value().classes().any(|class| class == PARENT_ROW_CLASS)
}

fn parse_parent_row(row: &ElementRef) -> RawEntityRecord {
    let mut name = None;
    let mut country = None;
    let mut category = None;

    for cell in row.select(&LABELED_CELL_SELECTOR) {
        let Some(label) = cell.value().attr("data-label") else {
            continue;
        };
        let Some(div) = cell.select(&DIV_SELECTOR).next() else {
            continue;
        };
        let title = div.value().attr("title").map(str::to_string);

        match label {
            "Name" => name = title,
            "Country" => country = title,
            "Category" => category = title,
            _ => {}
        }
    }

    RawEntityRecord::parent(name, country, category)
}

/// Text fragments trimmed individually and joined without separator
fn fragment_text(element: &ElementRef) -> String {
    element.text().map(str::trim).collect()
}

// ============================================================================
// TESTS
// ============================================================================
