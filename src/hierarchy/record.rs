//! Department records as supplied by the data service.

use serde::{Deserialize, Serialize};

/// Whether a department is currently in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepartmentStatus {
    #[default]
    Active,
    Inactive,
}

/// One department as delivered by the external data-fetch collaborator.
///
/// Immutable from the engine's point of view for the duration of a render
/// cycle. `parent_id` may reference an id that is not in the same batch; the
/// hierarchy builder then treats the record as a root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRecord {
    /// Unique id within one batch.
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Level as reported by the data service. The base (0 or 1) is the
    /// caller's convention; layout uses tree depth instead.
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub status: DepartmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_name: Option<String>,
}

impl DepartmentRecord {
    /// Create an active root record with no members.
    pub fn new(id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: code.into(),
            description: None,
            parent_id: None,
            level: 0,
            member_count: 0,
            status: DepartmentStatus::Active,
            manager_name: None,
        }
    }

    /// Builder: set parent
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set manager
    pub fn with_manager(mut self, manager_name: impl Into<String>) -> Self {
        self.manager_name = Some(manager_name.into());
        self
    }

    /// Builder: set member count
    pub fn with_members(mut self, member_count: u32) -> Self {
        self.member_count = member_count;
        self
    }

    /// Builder: set status
    pub fn with_status(mut self, status: DepartmentStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder: set level
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == DepartmentStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let json = r#"{
            "id": "d1",
            "name": "Engineering",
            "code": "ENG",
            "parentId": "root",
            "memberCount": 12,
            "managerName": "Ada",
            "status": "inactive"
        }"#;
        let record: DepartmentRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id, "d1");
        assert_eq!(record.parent_id.as_deref(), Some("root"));
        assert_eq!(record.member_count, 12);
        assert_eq!(record.manager_name.as_deref(), Some("Ada"));
        assert_eq!(record.status, DepartmentStatus::Inactive);
        assert_eq!(record.level, 0);
        assert!(record.description.is_none());
        assert!(!record.is_active());
    }

    #[test]
    fn test_null_parent_is_root() {
        let record: DepartmentRecord =
            serde_json::from_str(r#"{"id": "a", "parentId": null}"#).unwrap();
        assert!(record.parent_id.is_none());
        assert!(record.is_active());
    }

    #[test]
    fn test_builders() {
        let record = DepartmentRecord::new("b", "Sales", "SAL")
            .with_parent("a")
            .with_members(4)
            .with_level(2)
            .with_description("Field sales");

        assert_eq!(record.parent_id.as_deref(), Some("a"));
        assert_eq!(record.member_count, 4);
        assert_eq!(record.level, 2);
        assert_eq!(record.description.as_deref(), Some("Field sales"));
    }
}
