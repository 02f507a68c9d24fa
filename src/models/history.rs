use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HistoryEntryType {
    Migration,
    Normalization,
    Connection,
}

impl std::fmt::Display for HistoryEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryEntryType::Migration => write!(f, "migration"),
            HistoryEntryType::Normalization => write!(f, "normalization"),
            HistoryEntryType::Connection => write!(f, "connection"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Success,
    Error,
    Running,
}

impl std::fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryStatus::Success => write!(f, "success"),
            HistoryStatus::Error => write!(f, "error"),
            HistoryStatus::Running => write!(f, "running"),
        }
    }
}

/// A recorded migration, normalization or connection event.
/// Entries are created by the store and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub entry_type: HistoryEntryType,
    pub description: String,
    pub status: HistoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// The caller-supplied part of a history entry; id and timestamp are
/// filled in by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewHistoryEntry {
    #[serde(rename = "type")]
    pub entry_type: HistoryEntryType,
    pub description: String,
    pub status: HistoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl NewHistoryEntry {
    pub fn new(
        entry_type: HistoryEntryType,
        description: impl Into<String>,
        status: HistoryStatus,
    ) -> Self {
        NewHistoryEntry {
            entry_type,
            description: description.into(),
            status,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Complete the entry with a generated id and the given timestamp
    pub(crate) fn into_entry(self, id: String, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id,
            timestamp,
            entry_type: self.entry_type,
            description: self.description,
            status: self.status,
            details: self.details,
        }
    }
}

/// Filter for paging through history, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilter {
    pub entry_type: Option<HistoryEntryType>,
    pub status: Option<HistoryStatus>,
    /// Case-insensitive match against description and details
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != entry_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => {
                let needle = search.to_lowercase();
                entry.description.to_lowercase().contains(&needle)
                    || entry
                        .details
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub running: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        entry_type: HistoryEntryType,
        description: &str,
        status: HistoryStatus,
    ) -> HistoryEntry {
        NewHistoryEntry::new(entry_type, description, status)
            .into_entry("id-1".to_string(), Utc::now())
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let e = entry(HistoryEntryType::Connection, "Connected to MSSQL", HistoryStatus::Success);
        let json = serde_json::to_value(&e).unwrap();

        assert_eq!(json["type"], "connection");
        assert_eq!(json["status"], "success");
        assert_eq!(json["description"], "Connected to MSSQL");
        assert!(json.get("details").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn deserializes_browser_written_entry() {
        let json = r#"{
            "id": "k3j2h1",
            "timestamp": "2024-05-01T12:30:00.000Z",
            "type": "normalization",
            "description": "Normalized gender codes",
            "status": "error",
            "details": "relation does not exist"
        }"#;
        let e: HistoryEntry = serde_json::from_str(json).unwrap();

        assert_eq!(e.entry_type, HistoryEntryType::Normalization);
        assert_eq!(e.status, HistoryStatus::Error);
        assert_eq!(e.details.as_deref(), Some("relation does not exist"));
    }

    #[test]
    fn rejects_unknown_status() {
        let json = r#"{
            "id": "a",
            "timestamp": "2024-05-01T12:30:00Z",
            "type": "migration",
            "description": "x",
            "status": "paused"
        }"#;
        assert!(serde_json::from_str::<HistoryEntry>(json).is_err());
    }

    #[test]
    fn filter_matches_type_status_and_search() {
        let e = entry(HistoryEntryType::Migration, "Migrated dbo.Students", HistoryStatus::Success);
        let mut with_details = e.clone();
        with_details.details = Some("1200 rows copied".to_string());

        assert!(HistoryFilter::default().matches(&e));
        assert!(HistoryFilter {
            entry_type: Some(HistoryEntryType::Migration),
            ..Default::default()
        }
        .matches(&e));
        assert!(!HistoryFilter {
            status: Some(HistoryStatus::Error),
            ..Default::default()
        }
        .matches(&e));
        assert!(HistoryFilter {
            search: Some("STUDENTS".to_string()),
            ..Default::default()
        }
        .matches(&e));
        assert!(HistoryFilter {
            search: Some("rows copied".to_string()),
            ..Default::default()
        }
        .matches(&with_details));
        assert!(!HistoryFilter {
            search: Some("staff".to_string()),
            ..Default::default()
        }
        .matches(&with_details));
    }
}
