use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SettingsError;
use crate::models::settings::{mask_secret, MssqlSettings, PostgresSettings};

/// Display-oriented record of the two endpoints and when we last connected
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mssql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgresql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<DateTime<Utc>>,
}

/// Partial update to [`ConnectionInfo`]; only fields that are set overlay
/// the existing values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfoUpdate {
    pub mssql: Option<String>,
    pub postgresql: Option<String>,
}

impl ConnectionInfoUpdate {
    pub fn mssql(endpoint: impl Into<String>) -> Self {
        ConnectionInfoUpdate {
            mssql: Some(endpoint.into()),
            postgresql: None,
        }
    }

    pub fn postgresql(endpoint: impl Into<String>) -> Self {
        ConnectionInfoUpdate {
            mssql: None,
            postgresql: Some(endpoint.into()),
        }
    }
}

impl ConnectionInfo {
    /// Overlay the provided fields and stamp the connection time
    pub fn merge(&mut self, update: ConnectionInfoUpdate, now: DateTime<Utc>) {
        if let Some(mssql) = update.mssql {
            self.mssql = Some(mssql);
        }
        if let Some(postgresql) = update.postgresql {
            self.postgresql = Some(postgresql);
        }
        self.last_connected = Some(now);
    }
}

/// Complete settings for both databases. The store treats both sides as
/// opaque JSON; the typed accessors are for callers that need them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FullConnectionSettings {
    #[serde(default)]
    pub mssql: Value,
    #[serde(default)]
    pub postgresql: Value,
}

impl FullConnectionSettings {
    pub fn from_typed(
        mssql: &MssqlSettings,
        postgresql: &PostgresSettings,
    ) -> Result<Self, serde_json::Error> {
        Ok(FullConnectionSettings {
            mssql: serde_json::to_value(mssql)?,
            postgresql: serde_json::to_value(postgresql)?,
        })
    }

    pub fn mssql_settings(&self) -> Result<MssqlSettings, SettingsError> {
        MssqlSettings::deserialize(&self.mssql).map_err(|source| SettingsError::Shape {
            side: "MSSQL",
            source,
        })
    }

    pub fn postgres_settings(&self) -> Result<PostgresSettings, SettingsError> {
        PostgresSettings::deserialize(&self.postgresql).map_err(|source| SettingsError::Shape {
            side: "PostgreSQL",
            source,
        })
    }

    /// Parse and validate both sides, reporting every problem at once
    pub fn validate(&self) -> Result<(MssqlSettings, PostgresSettings), SettingsError> {
        let mssql = self.mssql_settings()?;
        let postgres = self.postgres_settings()?;

        let mut problems = mssql.validate();
        problems.extend(postgres.validate());

        if problems.is_empty() {
            log::info!(
                "Connection settings valid ({} -> {})",
                mssql.server,
                postgres.host
            );
            Ok((mssql, postgres))
        } else {
            Err(SettingsError::Invalid(problems))
        }
    }

    /// Human-readable description with passwords masked
    pub fn summary(&self) -> Result<String, SettingsError> {
        let mssql = self.mssql_settings()?;
        let postgres = self.postgres_settings()?;

        let mssql_auth = if mssql.trusted_connection {
            "    Authentication: trusted connection\n".to_string()
        } else {
            format!(
                "    Username: {}\n    Password: {}\n",
                mssql.username,
                mask_secret(&mssql.password)
            )
        };

        Ok(format!(
            concat!(
                "MSSQL:\n    Server: {}\n    Database: {}\n{}\n",
                "PostgreSQL:\n    Host: {}\n    Port: {}\n    Database: {}\n",
                "    User: {}\n    Password: {}\n    SSL mode: {}\n",
            ),
            mssql.server,
            mssql.database,
            mssql_auth,
            postgres.host,
            postgres.port,
            postgres.database,
            postgres.user,
            mask_secret(&postgres.password),
            postgres.ssl_mode,
        ))
    }
}
