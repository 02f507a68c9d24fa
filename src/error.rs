use thiserror::Error;

/// Errors raised by persistence backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors raised when interpreting or validating connection settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to parse {side} settings: {source}")]
    Shape {
        side: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Connection settings validation failed:\n{}", format_problems(.0))]
    Invalid(Vec<String>),
}

fn format_problems(problems: &[String]) -> String {
    problems
        .iter()
        .map(|p| format!("  - {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lists_every_problem() {
        let err = SettingsError::Invalid(vec![
            "MSSQL server is required".to_string(),
            "PostgreSQL user is required".to_string(),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Connection settings validation failed:"));
        assert!(message.contains("  - MSSQL server is required"));
        assert!(message.contains("  - PostgreSQL user is required"));
    }

    #[test]
    fn backend_error_displays_message() {
        let err = StorageError::Backend("disk full".to_string());
        assert_eq!(err.to_string(), "Storage backend error: disk full");
    }
}
