// 🏷️ Classification Rules - coarse entity class per record
//
// Mill-list rows are classified by the column they were unpivoted from.
// Member rows have no rule yet and stay Unclassified.

use crate::records::{EntityClass, MillField, NormalizedEntityRecord, UnpivotedRecord};

/// Total over the three mill-list columns
pub fn classify_mill_field(field: MillField) -> EntityClass {
    match field {
        MillField::GroupName => EntityClass::Group,
        MillField::ParentCompany => EntityClass::ParentCompany,
        MillField::MillName => EntityClass::Mill,
    }
}

/// Extension point for member classification.
///
/// Always Unclassified today. Whether subsidiaries should inherit their
/// parent's category is still undecided, so no rule is guessed here.
pub fn classify_member(_record: &NormalizedEntityRecord) -> EntityClass {
    EntityClass::Unclassified
}

pub fn classify_members(records: &mut [NormalizedEntityRecord]) {
    for record in records.iter_mut() {
        record.class = Some(classify_member(record));
    }
}

pub fn classify_mills(records: &mut [UnpivotedRecord]) {
    for record in records.iter_mut() {
        record.class = Some(classify_mill_field(record.original_field));
    }
}
