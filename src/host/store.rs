//! Key-value settings store

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::Result;

/// One changed key
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Changed keys of a single write
pub type StorageChanges = BTreeMap<String, StorageChange>;

/// Flat key→JSON value store with change notifications.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the named keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;

    /// Write the given keys, notifying subscribers of what changed
    async fn set(&self, values: Map<String, Value>) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChanges>;
}
