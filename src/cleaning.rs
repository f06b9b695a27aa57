// 🧹 Field Normalizer & Identifier Assigner
//
// Cleans the free-text fields of each source and derives a stable id from
// the cleaned (name, country) pair. Re-running on the same input always
// yields the same ids.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::parser::SourceKind;
use crate::records::{IdType, NormalizedEntityRecord, NormalizedMillRecord, RawEntityRecord, RawMillRecord};

/// Hex characters kept from the SHA-256 digest
pub const ID_LENGTH: usize = 12;

// ============================================================================
// TEXT CLEANER
// ============================================================================

/// Column-wise text normalization.
///
/// Output has the same length and order as the input; missing values stay
/// missing.
pub trait TextCleaner {
    fn clean(&self, values: &[Option<String>]) -> Vec<Option<String>>;
}

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]|\(.*?\)|\{.*?\}").unwrap());

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^ \-_A-Za-z0-9]+").unwrap());

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\-_]").unwrap());

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\s+").unwrap());

/// Lower-cases, drops bracketed spans and anything outside
/// `[ A-Za-z0-9_-]`, turns `-`/`_` into spaces and squeezes whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCleaner;

impl StandardCleaner {
    pub fn new() -> Self {
        StandardCleaner
    }

    pub fn clean_one(&self, value: &str) -> String {
        let lowered = value.to_lowercase();
        let unbracketed = BRACKETED.replace_all(&lowered, "");
        let stripped = DISALLOWED.replace_all(&unbracketed, "");
        let spaced = SEPARATORS.replace_all(&stripped, " ");
        let squeezed = MULTI_SPACE.replace_all(&spaced, " ");
        squeezed.trim().to_string()
    }
}

impl TextCleaner for StandardCleaner {
    fn clean(&self, values: &[Option<String>]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| v.as_deref().map(|s| self.clean_one(s)))
            .collect()
    }
}

/// Upper-case every letter that follows a non-letter, lower-case the rest
pub fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous_is_letter = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }

    result
}

/// First 12 hex characters of SHA-256(name ++ country)
pub fn stable_id(name: &str, country: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(country.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..ID_LENGTH].to_string()
}

// ============================================================================
// PER-SOURCE NORMALIZATION
// ============================================================================

/// Clean one column, treating missing values as empty strings
fn clean_column<C: TextCleaner + ?Sized>(cleaner: &C, values: Vec<Option<String>>) -> Vec<String> {
    cleaner
        .clean(&values)
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect()
}

fn clean_country_column<C: TextCleaner + ?Sized>(cleaner: &C, values: Vec<Option<String>>) -> Vec<String> {
    clean_column(cleaner, values)
        .iter()
        .map(|c| title_case(c))
        .collect()
}

/// Normalize member rows. The id hashes the entity's own name.
pub fn normalize_members<C: TextCleaner + ?Sized>(
    cleaner: &C,
    raw: &[RawEntityRecord],
) -> Vec<NormalizedEntityRecord> {
    let names = clean_column(cleaner, raw.iter().map(|r| r.name.clone()).collect());
    let parents = clean_column(cleaner, raw.iter().map(|r| r.parent_company.clone()).collect());
    let countries = clean_country_column(cleaner, raw.iter().map(|r| r.country.clone()).collect());

    let records: Vec<NormalizedEntityRecord> = raw
        .iter()
        .zip(names)
        .zip(parents)
        .zip(countries)
        .map(|(((record, name), parent_company), country)| NormalizedEntityRecord {
            id: stable_id(&name, &country),
            id_type: IdType::Created,
            name,
            country,
            parent_company,
            category: record.category.clone(),
            is_subsidiary: record.is_subsidiary,
            class: None,
        })
        .collect();

    info!("Normalized {} {} records", records.len(), SourceKind::Rspo.name());
    records
}

/// Normalize mill-list rows. The id hashes the mill name only; group and
/// parent columns never feed the id.
pub fn normalize_mills<C: TextCleaner + ?Sized>(cleaner: &C, raw: &[RawMillRecord]) -> Vec<NormalizedMillRecord> {
    let groups = clean_column(cleaner, raw.iter().map(|r| r.group_name.clone()).collect());
    let parents = clean_column(cleaner, raw.iter().map(|r| r.parent_company.clone()).collect());
    let mills = clean_column(cleaner, raw.iter().map(|r| r.mill_name.clone()).collect());
    let countries = clean_country_column(cleaner, raw.iter().map(|r| r.country.clone()).collect());

    let records: Vec<NormalizedMillRecord> = groups
        .into_iter()
        .zip(parents)
        .zip(mills)
        .zip(countries)
        .map(|(((group_name, parent_company), mill_name), country)| NormalizedMillRecord {
            id: stable_id(&mill_name, &country),
            id_type: IdType::Created,
            group_name,
            parent_company,
            country,
            mill_name,
        })
        .collect();

    info!("Normalized {} {} records", records.len(), SourceKind::Uml.name());
    records
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_member(name: &str, country: &str, parent: Option<&str>) -> RawEntityRecord {
        RawEntityRecord {
            name: Some(name.to_string()),
            country: Some(country.to_string()),
            category: None,
            parent_company: parent.map(str::to_string),
            is_subsidiary: parent.is_some(),
        }
    }

    fn raw_mill(group: &str, parent: &str, country: &str, mill: &str) -> RawMillRecord {
        RawMillRecord {
            group_name: Some(group.to_string()),
            parent_company: Some(parent.to_string()),
            country: Some(country.to_string()),
            mill_name: Some(mill.to_string()),
        }
    }

    #[test]
    fn test_standard_cleaner_rules() {
        let cleaner = StandardCleaner::new();

        assert_eq!(cleaner.clean_one("PT. Astra-Agro Lestari Tbk"), "pt astra agro lestari tbk");
        assert_eq!(cleaner.clean_one("Sime Darby (Malaysia) Sdn. Bhd."), "sime darby sdn bhd");
        assert_eq!(cleaner.clean_one("  Wilmar__International  "), "wilmar international");
        assert_eq!(cleaner.clean_one("Côte d'Ivoire"), "cte divoire");
        assert_eq!(cleaner.clean_one("[old] Name {x}"), "name");
    }

    #[test]
    fn test_cleaner_preserves_length_and_missing_values() {
        let cleaner = StandardCleaner::new();
        let input = vec![Some("A.B".to_string()), None, Some(String::new())];

        let output = cleaner.clean(&input);

        assert_eq!(output, vec![Some("ab".to_string()), None, Some(String::new())]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("malaysia"), "Malaysia");
        assert_eq!(title_case("papua new guinea"), "Papua New Guinea");
        assert_eq!(title_case("cote d ivoire"), "Cote D Ivoire");
        assert_eq!(title_case("UNITED STATES"), "United States");
        assert_eq!(title_case("abc1def"), "Abc1Def");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_stable_id_is_deterministic_and_fixed_length() {
        let a = stable_id("acme mills", "Malaysia");
        let b = stable_id("acme mills", "Malaysia");

        assert_eq!(a, b);
        assert_eq!(a.len(), ID_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, stable_id("acme mills", "Indonesia"));
        // sha256("") prefix
        assert_eq!(stable_id("", ""), "e3b0c44298fc");
    }

    #[test]
    fn test_member_normalization_is_idempotent() {
        let cleaner = StandardCleaner::new();
        let raw = vec![
            raw_member("Acme Mills Sdn. Bhd.", "MALAYSIA", None),
            raw_member("Acme Sub A", "MALAYSIA", Some("Acme Mills Sdn. Bhd.")),
        ];

        let first = normalize_members(&cleaner, &raw);
        let second = normalize_members(&cleaner, &raw);

        assert_eq!(first, second);
        assert_eq!(first[0].name, "acme mills sdn bhd");
        assert_eq!(first[0].country, "Malaysia");
        assert_eq!(first[0].parent_company, "");
        assert_eq!(first[0].id, stable_id("acme mills sdn bhd", "Malaysia"));
        assert_eq!(first[1].parent_company, "acme mills sdn bhd");
        assert_eq!(first[1].id_type, IdType::Created);
        assert_eq!(first[1].class, None);
    }

    #[test]
    fn test_same_name_and_country_share_an_id_across_sources() {
        let cleaner = StandardCleaner::new();
        let members = normalize_members(&cleaner, &[raw_member("Kilang Sawit", "Malaysia", None)]);
        let mills = normalize_mills(&cleaner, &[raw_mill("Group X", "Parent Y", "malaysia", "KILANG SAWIT")]);

        assert_eq!(members[0].id, mills[0].id);
    }

    #[test]
    fn test_mill_id_ignores_group_and_parent() {
        let cleaner = StandardCleaner::new();
        let mills = normalize_mills(
            &cleaner,
            &[
                raw_mill("Group One", "Parent One", "Indonesia", "Mill A"),
                raw_mill("Group Two", "Parent Two", "Indonesia", "Mill A"),
            ],
        );

        assert_eq!(mills[0].id, mills[1].id);
        assert_eq!(mills[0].id, stable_id("mill a", "Indonesia"));
        assert_eq!(mills[1].group_name, "group two");
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let cleaner = StandardCleaner::new();
        let raw = RawMillRecord {
            group_name: None,
            parent_company: None,
            country: None,
            mill_name: Some("Lone Mill".to_string()),
        };

        let mills = normalize_mills(&cleaner, &[raw]);

        assert_eq!(mills[0].group_name, "");
        assert_eq!(mills[0].country, "");
        assert_eq!(mills[0].id, stable_id("lone mill", ""));
    }
}
