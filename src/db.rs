use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

use crate::records::{EntityClass, IdType, UnifiedRegistryRecord};

/// Provenance stamped on every row written by one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub run_id: String,
    pub loaded_at: DateTime<Utc>,
}

impl RunInfo {
    pub fn new() -> Self {
        RunInfo {
            run_id: uuid::Uuid::new_v4().to_string(),
            loaded_at: Utc::now(),
        }
    }
}

impl Default for RunInfo {
    fn default() -> Self {
        Self::new()
    }
}

pub fn open_registry_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open database: {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Registry Table (one row per distinct entity name)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS supply_chain_entities (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id TEXT NOT NULL,
            id_type TEXT NOT NULL,
            name TEXT UNIQUE NOT NULL,
            country TEXT NOT NULL,
            class TEXT NOT NULL,
            run_id TEXT NOT NULL,
            loaded_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entity_id ON supply_chain_entities(entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_class ON supply_chain_entities(class)",
        [],
    )?;

    Ok(())
}

/// Replace the stored registry with `records` in one transaction.
/// The registry is not versioned: the previous run's rows are discarded.
pub fn replace_registry(conn: &mut Connection, records: &[UnifiedRegistryRecord], run: &RunInfo) -> Result<usize> {
    let tx = conn.transaction()?;
    let loaded_at = run.loaded_at.to_rfc3339();

    let removed = tx.execute("DELETE FROM supply_chain_entities", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO supply_chain_entities (entity_id, id_type, name, country, class, run_id, loaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for record in records {
            stmt.execute(params![
                record.id,
                record.id_type.as_str(),
                record.name,
                record.country,
                record.class.as_str(),
                run.run_id,
                loaded_at,
            ])
            .with_context(|| format!("Failed to store entity: {}", record.name))?;
        }
    }
    tx.commit()?;

    info!(
        "Stored {} entities in registry database (run {}, replaced {})",
        records.len(),
        run.run_id,
        removed
    );
    Ok(records.len())
}

pub fn get_registry(conn: &Connection) -> Result<Vec<UnifiedRegistryRecord>> {
    let mut stmt = conn.prepare(
        "SELECT entity_id, id_type, name, country, class
         FROM supply_chain_entities
         ORDER BY row_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, id_type, name, country, class)| -> Result<UnifiedRegistryRecord> {
            Ok(UnifiedRegistryRecord {
                id,
                id_type: id_type.parse::<IdType>().map_err(|e: String| anyhow!(e))?,
                name,
                country,
                class: class.parse::<EntityClass>().map_err(|e: String| anyhow!(e))?,
            })
        })
        .collect()
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM supply_chain_entities", [], |row| row.get(0))?;
    Ok(count)
}

pub fn get_run_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT run_id FROM supply_chain_entities")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, class: EntityClass) -> UnifiedRegistryRecord {
        UnifiedRegistryRecord {
            id: id.to_string(),
            id_type: IdType::Created,
            name: name.to_string(),
            country: "Malaysia".to_string(),
            class,
        }
    }

    #[test]
    fn test_replace_registry_round_trip() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let records = vec![
            record("aaaaaaaaaaaa", "acme", EntityClass::Group),
            record("bbbbbbbbbbbb", "acme mill", EntityClass::Mill),
        ];
        let run = RunInfo::new();

        let stored = replace_registry(&mut conn, &records, &run).unwrap();

        assert_eq!(stored, 2);
        assert_eq!(verify_count(&conn).unwrap(), 2);
        assert_eq!(get_registry(&conn).unwrap(), records);
        assert_eq!(get_run_ids(&conn).unwrap(), vec![run.run_id]);
    }

    #[test]
    fn test_rerun_replaces_previous_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        replace_registry(&mut conn, &[record("a", "old", EntityClass::Mill)], &RunInfo::new()).unwrap();
        let second = RunInfo::new();
        replace_registry(&mut conn, &[record("b", "new", EntityClass::Unclassified)], &second).unwrap();

        let stored = get_registry(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "new");
        assert_eq!(get_run_ids(&conn).unwrap(), vec![second.run_id]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let result = replace_registry(
            &mut conn,
            &[record("a", "same", EntityClass::Mill), record("b", "same", EntityClass::Group)],
            &RunInfo::new(),
        );

        assert!(result.is_err());
        // The failed transaction leaves nothing behind
        assert_eq!(verify_count(&conn).unwrap(), 0);
    }
}
