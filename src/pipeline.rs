// 🔗 Pipeline - the two stage orchestrators
//
// scrape:  page source → raw member table + downloaded mill list
// build:   clean → reshape → classify → resolve → registry (CSV + SQLite)

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::cleaning::{normalize_members, normalize_mills, TextCleaner};
use crate::config::{PipelineConfig, MILL_LIST_PATTERN};
use crate::db::{open_registry_db, replace_registry, RunInfo};
use crate::deduplication::{resolve, ResolutionReport};
use crate::files::{locate_download, read_mill_list, read_raw_members, write_raw_members, write_registry};
use crate::pagination::{fetch_mill_list, scrape_members, DownloadOutcome, TraversalOutcome};
use crate::parser::SourceKind;
use crate::provider::PageSourceProvider;
use crate::records::{NormalizedEntityRecord, NormalizedMillRecord, UnifiedRegistryRecord};
use crate::reshape::unpivot;
use crate::rules::{classify_members, classify_mills};

// ============================================================================
// SOURCE LOADING
// ============================================================================

/// A cleaned source, ready for classification
#[derive(Debug, Clone, PartialEq)]
pub enum CleanedSource {
    Members(Vec<NormalizedEntityRecord>),
    Mills(Vec<NormalizedMillRecord>),
}

impl CleanedSource {
    pub fn into_members(self) -> Result<Vec<NormalizedEntityRecord>> {
        match self {
            CleanedSource::Members(records) => Ok(records),
            CleanedSource::Mills(_) => Err(anyhow!("expected member records, got mill records")),
        }
    }

    pub fn into_mills(self) -> Result<Vec<NormalizedMillRecord>> {
        match self {
            CleanedSource::Mills(records) => Ok(records),
            CleanedSource::Members(_) => Err(anyhow!("expected mill records, got member records")),
        }
    }
}

/// Load and clean one source by name ("rspo" or "uml", any case).
/// An unknown name fails before any file is touched.
pub fn clean_source<C: TextCleaner + ?Sized>(source: &str, config: &PipelineConfig, cleaner: &C) -> Result<CleanedSource> {
    let kind: SourceKind = source.parse()?;
    info!("Cleaning source '{}' ({})", kind.code(), kind.name());

    match kind {
        SourceKind::Rspo => {
            let raw = read_raw_members(&config.members_path())?;
            Ok(CleanedSource::Members(normalize_members(cleaner, &raw)))
        }
        SourceKind::Uml => {
            let path = locate_download(&config.data_dir, MILL_LIST_PATTERN)?;
            let raw = read_mill_list(&path)?;
            Ok(CleanedSource::Mills(normalize_mills(cleaner, &raw)))
        }
    }
}

// ============================================================================
// BUILD STAGE
// ============================================================================

/// Reshape, classify and resolve two cleaned sources.
///
/// The two sources share no state, so each side is prepared on its own
/// rayon branch; the resolver runs after the join.
pub fn assemble_registry(
    members: Vec<NormalizedEntityRecord>,
    mills: Vec<NormalizedMillRecord>,
) -> (Vec<UnifiedRegistryRecord>, ResolutionReport) {
    let (members, facets) = rayon::join(
        move || {
            let mut members = members;
            classify_members(&mut members);
            members
        },
        move || {
            let mut facets = unpivot(&mills);
            classify_mills(&mut facets);
            facets
        },
    );

    resolve(members, facets)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub report: ResolutionReport,
    pub run: RunInfo,
}

/// Run clean → reshape → classify → resolve and persist the registry
pub fn build_registry<C: TextCleaner + Sync + ?Sized>(config: &PipelineConfig, cleaner: &C) -> Result<BuildSummary> {
    let (members, mills) = rayon::join(
        || clean_source(SourceKind::Rspo.code(), config, cleaner),
        || clean_source(SourceKind::Uml.code(), config, cleaner),
    );
    let members = members?.into_members()?;
    let mills = mills?.into_mills()?;

    let (registry, report) = assemble_registry(members, mills);

    write_registry(&config.registry_path(), &registry)?;

    let run = RunInfo::new();
    let mut conn = open_registry_db(&config.registry_db_path())?;
    replace_registry(&mut conn, &registry, &run).context("Failed to mirror registry into database")?;

    Ok(BuildSummary { report, run })
}

// ============================================================================
// SCRAPE STAGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub members: usize,
    pub pages: usize,
    pub complete: bool,
    pub mill_list: DownloadOutcome,
}

/// Traverse the member table, save it, then download the mill list.
/// Each source gets its own session.
pub fn scrape_sources<P: PageSourceProvider>(provider: &P, config: &PipelineConfig) -> Result<ScrapeSummary> {
    let traversal = scrape_members(provider, config)?;
    if let TraversalOutcome::Interrupted(err) = &traversal.outcome {
        warn!("Member traversal ended early, saving partial result: {}", err);
    }
    write_raw_members(&config.members_path(), &traversal.records)?;

    let mill_list = fetch_mill_list(provider, config)?;

    Ok(ScrapeSummary {
        members: traversal.records.len(),
        pages: traversal.pages,
        complete: traversal.is_complete(),
        mill_list,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::StandardCleaner;
    use crate::config::Timings;
    use crate::db::{get_registry, verify_count};
    use crate::error::RegistryError;
    use crate::provider::testing::{ScriptedPage, ScriptedProvider};
    use crate::provider::NextControl;
    use crate::records::EntityClass;
    use std::fs;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            data_dir: dir.join("data"),
            output_dir: dir.join("output"),
            endpoints: vec!["http://localhost:9222".to_string()],
            timings: Timings::instant(),
            ..PipelineConfig::default()
        }
    }

    const MEMBER_PAGE: &str = r#"<table><tbody>
        <tr class="slds-hint-parent">
            <th data-label="Name"><div title="Acme Mills"></div></th>
            <td data-label="Country"><div title="Malaysia"></div></td>
            <td data-label="Category"><div title="Palm Oil Processors"></div></td>
        </tr>
        <tr><td><div class="groupMemberInfo"><p>Sungai Mill</p><p>Acme Sub B</p></div></td></tr>
    </tbody></table>"#;

    const MILL_LIST: &str = "Group Name,Parent Company,Mill Name,Country\n\
        Acme Mills,Acme Holdings,Sungai Mill,MALAYSIA\n\
        Beta Group,Beta Holdings,Beta Mill,Indonesia\n";

    #[test]
    fn test_unknown_source_fails_fast() {
        let dir = tempdir().unwrap();
        let err = clean_source("gfw", &config_in(dir.path()), &StandardCleaner::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_missing_mill_list_is_a_distinct_error() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(&config.data_dir).unwrap();

        let err = clean_source("uml", &config, &StandardCleaner::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::MissingDownload { .. })
        ));
    }

    #[test]
    fn test_scrape_then_build_end_to_end() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let provider = ScriptedProvider {
            download_link: true,
            ..ScriptedProvider::with_pages(vec![ScriptedPage::new(MEMBER_PAGE, NextControl::Disabled)])
        };

        let scraped = scrape_sources(&provider, &config).unwrap();
        assert_eq!(scraped.members, 3);
        assert!(scraped.complete);
        assert_eq!(scraped.mill_list, DownloadOutcome::Triggered);
        assert_eq!(provider.releases.get(), 2);

        // Stand-in for the browser's download
        fs::write(config.data_dir.join("UML_2025.csv"), MILL_LIST).unwrap();

        let summary = build_registry(&config, &StandardCleaner::new()).unwrap();

        // 3 members + 6 mill facets; "acme mills" and "sungai mill" appear twice
        assert_eq!(summary.report.input, 9);
        assert_eq!(summary.report.duplicates, 2);
        assert_eq!(summary.report.output, 7);

        let csv_text = fs::read_to_string(config.registry_path()).unwrap();
        assert!(csv_text.starts_with("id,id_type,name,country,class\n"));

        let conn = open_registry_db(&config.registry_db_path()).unwrap();
        assert_eq!(verify_count(&conn).unwrap(), 7);
        let stored = get_registry(&conn).unwrap();

        let class_of = |name: &str| stored.iter().find(|r| r.name == name).map(|r| r.class);
        assert_eq!(class_of("acme mills"), Some(EntityClass::Group));
        assert_eq!(class_of("sungai mill"), Some(EntityClass::Mill));
        assert_eq!(class_of("acme sub b"), Some(EntityClass::Unclassified));
        assert_eq!(class_of("beta holdings"), Some(EntityClass::ParentCompany));
    }

    #[test]
    fn test_build_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(&config.data_dir).unwrap();
        fs::write(config.data_dir.join("UML.csv"), MILL_LIST).unwrap();
        write_raw_members(&config.members_path(), &[]).unwrap();

        build_registry(&config, &StandardCleaner::new()).unwrap();
        let first = fs::read_to_string(config.registry_path()).unwrap();
        build_registry(&config, &StandardCleaner::new()).unwrap();
        let second = fs::read_to_string(config.registry_path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_assemble_prefers_mill_facets_over_members() {
        let cleaner = StandardCleaner::new();
        let members = normalize_members(
            &cleaner,
            &[crate::records::RawEntityRecord::parent(
                Some("X".to_string()),
                Some("Ghana".to_string()),
                None,
            )],
        );
        let mills = normalize_mills(
            &cleaner,
            &[crate::records::RawMillRecord {
                group_name: Some("X".to_string()),
                parent_company: Some("Y".to_string()),
                country: Some("Ghana".to_string()),
                mill_name: Some("Z".to_string()),
            }],
        );

        let (registry, report) = assemble_registry(members, mills);

        assert_eq!(report.output, 3);
        let x: Vec<_> = registry.iter().filter(|r| r.name == "x").collect();
        assert_eq!(x.len(), 1);
        assert_eq!(x[0].class, EntityClass::Group);
        // Group facet carries the mill row's id, not the member's
        assert_eq!(x[0].id, crate::cleaning::stable_id("z", "Ghana"));
    }
}
