// 📂 Flat-file I/O - raw tables, the downloaded mill list, the registry

use anyhow::{Context, Result};
use globset::Glob;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::records::{RawEntityRecord, RawMillRecord, UnifiedRegistryRecord};

// ============================================================================
// GENERIC CSV HELPERS
// ============================================================================

/// Columns of the raw member table, in `RawEntityRecord` field order
pub const MEMBER_COLUMNS: [&str; 5] = ["name", "country", "category", "parent_company", "is_subsidiary"];

/// Columns of the registry, in `UnifiedRegistryRecord` field order
pub const REGISTRY_COLUMNS: [&str; 5] = ["id", "id_type", "name", "country", "class"];

/// Serialize `rows` under a header. The header comes from the first row,
/// or from `columns` when there are no rows at all.
fn write_csv<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    if rows.is_empty() {
        writer.write_record(columns).context("Failed to write CSV header")?;
    }
    for row in rows {
        writer.serialize(row).context("Failed to serialize CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn read_csv<T: DeserializeOwned, R: std::io::Read>(reader: R, origin: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for (line_num, result) in rdr.deserialize().enumerate() {
        let row: T = result.with_context(|| {
            // +2: 1-indexed plus header row
            format!("Failed to parse CSV line {} in {}", line_num + 2, origin.display())
        })?;
        rows.push(row);
    }

    Ok(rows)
}

// ============================================================================
// MEMBER TABLE
// ============================================================================

pub fn write_raw_members(path: &Path, records: &[RawEntityRecord]) -> Result<()> {
    write_csv(path, &MEMBER_COLUMNS, records)?;
    info!("Saved {} raw member records to {}", records.len(), path.display());
    Ok(())
}

pub fn read_raw_members(path: &Path) -> Result<Vec<RawEntityRecord>> {
    let file = fs::File::open(path).with_context(|| format!("Failed to open member table: {}", path.display()))?;
    read_csv(file, path)
}

// ============================================================================
// MILL LIST
// ============================================================================

/// Find the single downloaded file in `dir` whose name matches `pattern`.
///
/// Zero matches and several matches are distinct errors: picking one of
/// several downloads silently would hide a stale file.
pub fn locate_download(dir: &Path, pattern: &str) -> Result<PathBuf> {
    let matcher = Glob::new(pattern)
        .with_context(|| format!("Invalid file pattern: {}", pattern))?
        .compile_matcher();

    let mut matches = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to list directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        if entry.file_type()?.is_file() && matcher.is_match(entry.file_name()) {
            matches.push(entry.path());
        }
    }
    matches.sort();

    match matches.len() {
        0 => Err(RegistryError::MissingDownload {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
        }
        .into()),
        1 => Ok(matches.remove(0)),
        _ => Err(RegistryError::AmbiguousDownload {
            dir: dir.to_path_buf(),
            pattern: pattern.to_string(),
            matches,
        }
        .into()),
    }
}

/// Bytes → text, one char per byte (ISO-8859-1)
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Read the mill list, which is published latin-1 encoded
pub fn read_mill_list(path: &Path) -> Result<Vec<RawMillRecord>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read mill list: {}", path.display()))?;
    let text = decode_latin1(&bytes);
    let rows = read_csv(text.as_bytes(), path)?;
    info!("Loaded {} mill list rows from {}", rows.len(), path.display());
    Ok(rows)
}

// ============================================================================
// REGISTRY
// ============================================================================

pub fn write_registry(path: &Path, records: &[UnifiedRegistryRecord]) -> Result<()> {
    write_csv(path, &REGISTRY_COLUMNS, records)?;
    info!("Exported {} registry entities to {}", records.len(), path.display());
    Ok(())
}
