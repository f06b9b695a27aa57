// 🗂️ Entity Records - Data model for the supply-chain registry
// Raw rows (per source) → normalized rows → unified registry rows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// RAW RECORDS (straight from the sources)
// ============================================================================

/// RawEntityRecord - one row encountered while traversing the member table
///
/// Parent rows carry their own category and no parent; subsidiary rows
/// inherit country and parent name from the last parent row seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntityRecord {
    pub name: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub parent_company: Option<String>,
    pub is_subsidiary: bool,
}

impl RawEntityRecord {
    pub fn parent(name: Option<String>, country: Option<String>, category: Option<String>) -> Self {
        RawEntityRecord {
            name,
            country,
            category,
            parent_company: None,
            is_subsidiary: false,
        }
    }

    pub fn subsidiary(name: String, country: Option<String>, parent_company: Option<String>) -> Self {
        RawEntityRecord {
            name: Some(name),
            country,
            category: None,
            parent_company,
            is_subsidiary: true,
        }
    }
}

/// RawMillRecord - one row of the downloaded mill list
///
/// Accepts the vendor headers as well as the renamed snake_case ones.
/// Every other vendor column is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMillRecord {
    #[serde(rename = "group_name", alias = "Group Name", default)]
    pub group_name: Option<String>,

    #[serde(rename = "parent_company", alias = "Parent Company", default)]
    pub parent_company: Option<String>,

    #[serde(rename = "country", alias = "Country", default)]
    pub country: Option<String>,

    #[serde(rename = "mill_name", alias = "Mill Name", default)]
    pub mill_name: Option<String>,
}

// ============================================================================
// IDENTIFIER & CLASS ENUMS
// ============================================================================

/// How an identifier was obtained. Only locally derived ids exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    Created,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Created => "Created",
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(IdType::Created),
            other => Err(format!("unknown id type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    Group,
    #[serde(rename = "Parent Company")]
    ParentCompany,
    Mill,
    Unclassified,
}

impl EntityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Group => "Group",
            EntityClass::ParentCompany => "Parent Company",
            EntityClass::Mill => "Mill",
            EntityClass::Unclassified => "Unclassified",
        }
    }

    pub fn is_classified(&self) -> bool {
        *self != EntityClass::Unclassified
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Group" => Ok(EntityClass::Group),
            "Parent Company" => Ok(EntityClass::ParentCompany),
            "Mill" => Ok(EntityClass::Mill),
            "Unclassified" => Ok(EntityClass::Unclassified),
            other => Err(format!("unknown entity class: {}", other)),
        }
    }
}

/// Which of the three wide mill-list columns an unpivoted row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MillField {
    GroupName,
    ParentCompany,
    MillName,
}

impl MillField {
    /// Column order used when unpivoting
    pub const ALL: [MillField; 3] = [MillField::GroupName, MillField::ParentCompany, MillField::MillName];

    pub fn as_str(&self) -> &'static str {
        match self {
            MillField::GroupName => "group_name",
            MillField::ParentCompany => "parent_company",
            MillField::MillName => "mill_name",
        }
    }
}

impl fmt::Display for MillField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// NORMALIZED RECORDS
// ============================================================================

/// Member row after cleaning and id assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEntityRecord {
    pub name: String,
    pub country: String,
    pub parent_company: String,
    pub category: Option<String>,
    pub is_subsidiary: bool,
    pub id: String,
    pub id_type: IdType,
    /// None until the classifier has run
    pub class: Option<EntityClass>,
}

/// Mill-list row after cleaning. The id is anchored to the mill name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMillRecord {
    pub group_name: String,
    pub parent_company: String,
    pub country: String,
    pub mill_name: String,
    pub id: String,
    pub id_type: IdType,
}

impl NormalizedMillRecord {
    pub fn field(&self, field: MillField) -> &str {
        match field {
            MillField::GroupName => &self.group_name,
            MillField::ParentCompany => &self.parent_company,
            MillField::MillName => &self.mill_name,
        }
    }
}

/// One facet (group, parent or mill) of a mill-list row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpivotedRecord {
    pub id: String,
    pub id_type: IdType,
    pub country: String,
    pub original_field: MillField,
    pub name: String,
    pub class: Option<EntityClass>,
}

// ============================================================================
// UNIFIED REGISTRY RECORD (terminal artifact)
// ============================================================================

/// Final registry row. Field order is the column order of the output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedRegistryRecord {
    pub id: String,
    pub id_type: IdType,
    pub name: String,
    pub country: String,
    pub class: EntityClass,
}

impl From<NormalizedEntityRecord> for UnifiedRegistryRecord {
    fn from(record: NormalizedEntityRecord) -> Self {
        UnifiedRegistryRecord {
            id: record.id,
            id_type: record.id_type,
            name: record.name,
            country: record.country,
            class: record.class.unwrap_or(EntityClass::Unclassified),
        }
    }
}

impl From<UnpivotedRecord> for UnifiedRegistryRecord {
    fn from(record: UnpivotedRecord) -> Self {
        UnifiedRegistryRecord {
            id: record.id,
            id_type: record.id_type,
            name: record.name,
            country: record.country,
            class: record.class.unwrap_or(EntityClass::Unclassified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_class_labels_round_trip() {
        for class in [
            EntityClass::Group,
            EntityClass::ParentCompany,
            EntityClass::Mill,
            EntityClass::Unclassified,
        ] {
            assert_eq!(class.as_str().parse::<EntityClass>().unwrap(), class);
        }
        assert!("group".parse::<EntityClass>().is_err());
    }

    #[test]
    fn test_unset_class_projects_as_unclassified() {
        let record = UnpivotedRecord {
            id: "abc123abc123".to_string(),
            id_type: IdType::Created,
            country: "Malaysia".to_string(),
            original_field: MillField::MillName,
            name: "sungai mill".to_string(),
            class: None,
        };

        let unified = UnifiedRegistryRecord::from(record);
        assert_eq!(unified.class, EntityClass::Unclassified);
    }

    #[test]
    fn test_mill_field_order() {
        let names: Vec<&str> = MillField::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, vec!["group_name", "parent_company", "mill_name"]);
    }
}
