// 🔀 Schema Unifier - wide mill rows → one row per entity
//
// Each mill-list row names three entities (group, parent, mill). Unpivot
// them into three rows tagged with their original column. All three keep
// the id of the row they came from.

use crate::records::{MillField, NormalizedMillRecord, UnpivotedRecord};

/// Unpivot field-major: every group row, then every parent row, then every
/// mill row. Output length is always 3 × input length.
pub fn unpivot(records: &[NormalizedMillRecord]) -> Vec<UnpivotedRecord> {
    let mut rows = Vec::with_capacity(records.len() * MillField::ALL.len());

    for field in MillField::ALL {
        for record in records {
            rows.push(UnpivotedRecord {
                id: record.id.clone(),
                id_type: record.id_type,
                country: record.country.clone(),
                original_field: field,
                name: record.field(field).to_string(),
                class: None,
            });
        }
    }

    rows
}
