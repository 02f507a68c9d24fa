use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use uuid::Uuid;

use crate::db::PersistenceBackend;
use crate::error::StorageError;
use crate::models::{
    ConnectionInfo, ConnectionInfoUpdate, FullConnectionSettings, HistoryEntry, HistoryFilter,
    HistoryStats, HistoryStatus, NewHistoryEntry,
};

pub const HISTORY_KEY: &str = "migration_history";
pub const CONNECTION_INFO_KEY: &str = "connection_info";
pub const FULL_SETTINGS_KEY: &str = "full_connection_settings";

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Maximum number of history entries kept, oldest are evicted first
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// What changed in the store; passed to subscribers after the mutation
/// has been applied and written to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    HistoryAdded,
    HistoryCleared,
    ConnectionInfoUpdated,
    FullSettingsUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(StateChange, &MigrationStore)>;

/// Migration history and connection settings, persisted to a key-value backend.
///
/// The store is constructed explicitly and passed to whoever needs it.
/// Every mutation writes the affected key synchronously and then notifies
/// subscribers.
pub struct MigrationStore {
    history: Vec<HistoryEntry>,
    connection_info: ConnectionInfo,
    full_settings: Option<FullConnectionSettings>,
    config: StoreConfig,
    backend: Box<dyn PersistenceBackend>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    last_persist_error: Option<String>,
}

impl std::fmt::Debug for MigrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStore")
            .field("history_len", &self.history.len())
            .field("connection_info", &self.connection_info)
            .field("has_full_settings", &self.full_settings.is_some())
            .field("config", &self.config)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Read and parse one key. Missing, unreadable or malformed values all
/// fall back to `None`; only the latter two are logged.
fn load_key<T: DeserializeOwned>(backend: &dyn PersistenceBackend, key: &str) -> Option<T> {
    let json = match backend.get(key) {
        Ok(Some(json)) => json,
        Ok(None) => return None,
        Err(e) => {
            log::error!("Failed to read {} from storage: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Failed to parse stored {}: {}", key, e);
            None
        }
    }
}

impl MigrationStore {
    /// Build the store from whatever the backend already holds
    pub fn open(backend: impl PersistenceBackend + 'static, config: StoreConfig) -> Self {
        let backend: Box<dyn PersistenceBackend> = Box::new(backend);
        let config = StoreConfig {
            history_limit: config.history_limit.max(1),
        };

        let mut history: Vec<HistoryEntry> =
            load_key(backend.as_ref(), HISTORY_KEY).unwrap_or_default();
        if history.len() > config.history_limit {
            log::warn!(
                "Stored history has {} entries, keeping the newest {}",
                history.len(),
                config.history_limit
            );
            history.truncate(config.history_limit);
        }
        let connection_info: ConnectionInfo =
            load_key(backend.as_ref(), CONNECTION_INFO_KEY).unwrap_or_default();
        let full_settings: Option<FullConnectionSettings> =
            load_key::<Option<FullConnectionSettings>>(backend.as_ref(), FULL_SETTINGS_KEY)
                .flatten();

        log::info!(
            "Loaded migration state: {} history entries, full settings {}",
            history.len(),
            if full_settings.is_some() { "present" } else { "absent" }
        );

        MigrationStore {
            history,
            connection_info,
            full_settings,
            config,
            backend,
            subscribers: Vec::new(),
            next_subscription: 0,
            last_persist_error: None,
        }
    }

    /// History, newest first
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.connection_info
    }

    pub fn full_settings(&self) -> Option<&FullConnectionSettings> {
        self.full_settings.as_ref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn PersistenceBackend {
        self.backend.as_ref()
    }

    /// Message of the most recent failed write, cleared by the next successful one
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn find_history_entry(&self, id: &str) -> Option<&HistoryEntry> {
        self.history.iter().find(|entry| entry.id == id)
    }

    pub fn query_history(&self, filter: &HistoryFilter) -> Vec<&HistoryEntry> {
        self.history
            .iter()
            .filter(|entry| filter.matches(entry))
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect()
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.history
            .iter()
            .fold(HistoryStats::default(), |mut stats, entry| {
                stats.total += 1;
                match entry.status {
                    HistoryStatus::Success => stats.success += 1,
                    HistoryStatus::Error => stats.error += 1,
                    HistoryStatus::Running => stats.running += 1,
                }
                stats
            })
    }

    /// Record a new event at the head of the history
    pub fn add_history_entry(&mut self, entry: NewHistoryEntry) -> &HistoryEntry {
        let entry = entry.into_entry(Uuid::new_v4().to_string(), Utc::now());
        log::debug!(
            "History: [{}] {} ({})",
            entry.entry_type,
            entry.description,
            entry.status
        );

        self.history.insert(0, entry);
        self.history.truncate(self.config.history_limit);

        let json = serde_json::to_string(&self.history);
        self.write(HISTORY_KEY, json);
        self.notify(StateChange::HistoryAdded);

        &self.history[0]
    }

    /// Overlay the provided endpoints and stamp `last_connected`
    pub fn update_connection_info(&mut self, update: ConnectionInfoUpdate) {
        self.connection_info.merge(update, Utc::now());

        let json = serde_json::to_string(&self.connection_info);
        self.write(CONNECTION_INFO_KEY, json);
        self.notify(StateChange::ConnectionInfoUpdated);
    }

    /// Replace the full settings. `None` clears them in memory but leaves
    /// the stored value untouched.
    pub fn update_full_settings(&mut self, settings: Option<FullConnectionSettings>) {
        self.full_settings = settings;

        if let Some(settings) = &self.full_settings {
            let json = serde_json::to_string(settings);
            self.write(FULL_SETTINGS_KEY, json);
        }
        self.notify(StateChange::FullSettingsUpdated);
    }

    /// Drop every history entry and remove the stored key right away
    pub fn clear_history(&mut self) {
        self.history.clear();

        let result = self.backend.remove(HISTORY_KEY);
        self.record_persist_result(HISTORY_KEY, result);
        log::info!("Migration history cleared");
        self.notify(StateChange::HistoryCleared);
    }

    /// Register a callback run after every mutation. A panicking callback
    /// propagates to the caller of the mutation but stays subscribed.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(StateChange, &MigrationStore) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    fn write(&mut self, key: &str, json: Result<String, serde_json::Error>) {
        let result = json
            .map_err(StorageError::from)
            .and_then(|json| self.backend.set(key, &json));
        self.record_persist_result(key, result);
    }

    fn record_persist_result(&mut self, key: &str, result: Result<(), StorageError>) {
        match result {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                let message = format!("Failed to persist {}: {}", key, e);
                log::error!("{}", message);
                self.last_persist_error = Some(message);
            }
        }
    }

    fn notify(&mut self, change: StateChange) {
        // Subscribers only get a shared reference, so none can be added or
        // removed while they run. The list is restored even if one panics.
        let mut subscribers = std::mem::take(&mut self.subscribers);
        let store = &*self;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            for (_, callback) in subscribers.iter_mut() {
                callback(change, store);
            }
        }));
        self.subscribers = subscribers;

        if let Err(payload) = outcome {
            panic::resume_unwind(payload);
        }
    }
}
