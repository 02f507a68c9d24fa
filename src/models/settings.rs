use serde::{Deserialize, Deserializer, Serialize};

const MSSQL_ODBC_DRIVER: &str = "ODBC Driver 17 for SQL Server";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SslMode::Disable => write!(f, "disable"),
            SslMode::Prefer => write!(f, "prefer"),
            SslMode::Require => write!(f, "require"),
        }
    }
}

/// Source database settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MssqlSettings {
    pub server: String,
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Windows authentication; username and password are ignored when set
    #[serde(default)]
    pub trusted_connection: bool,
}

impl Default for MssqlSettings {
    fn default() -> Self {
        MssqlSettings {
            server: "localhost".to_string(),
            database: "wsdata".to_string(),
            username: String::new(),
            password: String::new(),
            trusted_connection: false,
        }
    }
}

impl MssqlSettings {
    /// Build the ODBC connection string for this server
    pub fn connection_string(&self) -> String {
        let mut conn_str = format!(
            "DRIVER={{{}}};SERVER={};DATABASE={};",
            MSSQL_ODBC_DRIVER, self.server, self.database
        );

        if self.trusted_connection {
            conn_str.push_str("Trusted_Connection=yes;");
        } else {
            conn_str.push_str(&format!("UID={};PWD={};", self.username, self.password));
        }

        conn_str
    }

    /// Collect every problem with these settings. An empty password only
    /// produces a warning.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.server.trim().is_empty() {
            problems.push("MSSQL server is required".to_string());
        }
        if self.database.trim().is_empty() {
            problems.push("MSSQL database is required".to_string());
        }
        if !self.trusted_connection {
            if self.username.trim().is_empty() {
                problems.push(
                    "MSSQL username is required (or enable trusted connection)".to_string(),
                );
            }
            if self.password.is_empty() {
                log::warn!("MSSQL password is empty - this may cause connection issues");
            }
        }

        problems
    }
}

/// Target database settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostgresSettings {
    pub host: String,
    #[serde(default = "default_pg_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ssl_mode: SslMode,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        PostgresSettings {
            host: "localhost".to_string(),
            port: default_pg_port(),
            database: "wsdata_v4".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            ssl_mode: SslMode::default(),
        }
    }
}

fn default_pg_port() -> u16 {
    5432
}

/// Ports arrive either as numbers or as strings from form inputs
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {:?}", text))),
    }
}

impl PostgresSettings {
    /// Build a connection URL with the credentials URL encoded
    pub fn connection_url(&self) -> String {
        let user = urlencoding::encode(&self.user);
        let password = urlencoding::encode(&self.password);

        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, password, self.host, self.port, self.database, self.ssl_mode
        )
    }

    /// Collect every problem with these settings. An empty password only
    /// produces a warning.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.host.trim().is_empty() {
            problems.push("PostgreSQL host is required".to_string());
        }
        if self.port == 0 {
            problems.push("PostgreSQL port must be non-zero".to_string());
        }
        if self.database.trim().is_empty() {
            problems.push("PostgreSQL database is required".to_string());
        }
        if self.user.trim().is_empty() {
            problems.push("PostgreSQL user is required".to_string());
        }
        if self.password.is_empty() {
            log::warn!("PostgreSQL password is empty - this may cause connection issues");
        }

        problems
    }
}

/// Replace a secret with asterisks of the same length
pub(crate) fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(empty)".to_string()
    } else {
        "*".repeat(secret.chars().count())
    }
}
