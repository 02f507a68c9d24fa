pub mod db;
pub mod error;
pub mod models;
pub mod state;

pub use db::{MemoryBackend, PersistenceBackend, SqliteBackend};
pub use error::{SettingsError, StorageError};
pub use models::*;
pub use state::{MigrationStore, StateChange, StoreConfig, SubscriptionId};

/// Install the process-wide logger. Defaults to `info`, overridable through
/// `RUST_LOG`. Later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log::LevelFilter::Info.as_str()),
    )
    .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_can_be_called_repeatedly() {
        init_logging();
        init_logging();
        log::info!("logger installed");
    }
}
