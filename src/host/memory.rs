//! In-memory host implementations
//!
//! Used by the test suite and by the CLI, which drives the engine against a
//! tab snapshot loaded from disk instead of a live browser.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use super::alarms::{Alarm, AlarmHost, AlarmSpec};
use super::menus::{MenuHost, MenuItem};
use super::permissions::{Permission, PermissionGate};
use super::runtime::RuntimeHost;
use super::store::{SettingsStore, StorageChange, StorageChanges};
use super::tabs::{Tab, TabGroup, TabHost, TabQuery, TabSnapshot, Window, WindowSnapshot};
use super::Host;
use crate::error::{ReloadError, Result};

fn poisoned<E: std::fmt::Display>(e: E) -> ReloadError {
    ReloadError::Host(e.to_string())
}

/// A reload issued against [`MemoryTabs`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadCall {
    pub tab_id: i64,
    pub bypass_cache: bool,
}

/// Tabs and windows held in memory. Records every successful reload.
#[derive(Debug, Default)]
pub struct MemoryTabs {
    session: RwLock<TabSnapshot>,
    reloads: Mutex<Vec<ReloadCall>>,
    failing: Mutex<HashSet<i64>>,
}

impl MemoryTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: TabSnapshot) -> Self {
        let tabs = Self::new();
        for window in snapshot.windows {
            tabs.add_window(window);
        }
        tabs
    }

    /// Single focused window holding the given tabs
    pub fn with_window(window_id: i64, tabs: Vec<Tab>) -> Self {
        let memory = Self::new();
        memory.add_window(WindowSnapshot {
            id: window_id,
            focused: true,
            tabs,
            groups: Vec::new(),
        });
        memory
    }

    pub fn add_window(&self, mut window: WindowSnapshot) {
        for tab in &mut window.tabs {
            tab.window_id = window.id;
        }
        for group in &mut window.groups {
            group.window_id = window.id;
        }
        if let Ok(mut session) = self.session.write() {
            session.windows.push(window);
        }
    }

    pub fn add_group(&self, window_id: i64, group: TabGroup) {
        let Ok(mut session) = self.session.write() else {
            return;
        };
        if let Some(window) = session.windows.iter_mut().find(|w| w.id == window_id) {
            window.groups.push(TabGroup { window_id, ..group });
        }
    }

    /// Remove a tab, as if the user closed it
    pub fn close_tab(&self, tab_id: i64) {
        if let Ok(mut session) = self.session.write() {
            for window in &mut session.windows {
                window.tabs.retain(|t| t.id != tab_id);
            }
        }
    }

    /// Make reloads of this tab fail
    pub fn fail_reload(&self, tab_id: i64) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(tab_id);
        }
    }

    pub fn reloads(&self) -> Vec<ReloadCall> {
        self.reloads.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn reloaded_ids(&self) -> Vec<i64> {
        self.reloads().into_iter().map(|r| r.tab_id).collect()
    }

    pub fn snapshot(&self) -> TabSnapshot {
        self.session.read().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TabHost for MemoryTabs {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<Tab>> {
        let session = self.session.read().map_err(poisoned)?;
        Ok(session
            .windows
            .iter()
            .flat_map(|w| w.tabs.iter())
            .filter(|t| query.matches(t))
            .cloned()
            .collect())
    }

    async fn windows(&self) -> Result<Vec<Window>> {
        let session = self.session.read().map_err(poisoned)?;
        Ok(session
            .windows
            .iter()
            .map(|w| Window {
                id: w.id,
                focused: w.focused,
            })
            .collect())
    }

    async fn current_window(&self) -> Result<Window> {
        let windows = self.windows().await?;
        windows
            .iter()
            .find(|w| w.focused)
            .or_else(|| windows.first())
            .copied()
            .ok_or_else(|| ReloadError::Host("no open windows".to_string()))
    }

    async fn tab_groups(&self, window_id: i64) -> Result<Vec<TabGroup>> {
        let session = self.session.read().map_err(poisoned)?;
        Ok(session
            .windows
            .iter()
            .filter(|w| w.id == window_id)
            .flat_map(|w| w.groups.iter().cloned())
            .collect())
    }

    async fn reload(&self, tab_id: i64, bypass_cache: bool) -> Result<()> {
        let exists = {
            let session = self.session.read().map_err(poisoned)?;
            session.windows.iter().any(|w| w.tabs.iter().any(|t| t.id == tab_id))
        };
        let failing = self.failing.lock().map_err(poisoned)?.contains(&tab_id);
        if !exists || failing {
            return Err(ReloadError::TabNotFound(tab_id));
        }

        self.reloads.lock().map_err(poisoned)?.push(ReloadCall { tab_id, bypass_cache });
        Ok(())
    }
}

/// Alarms recorded in memory. Nothing ever fires on its own.
#[derive(Debug, Default)]
pub struct MemoryAlarms {
    alarms: Mutex<BTreeMap<String, (Alarm, AlarmSpec)>>,
    created: AtomicUsize,
}

impl MemoryAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.alarms.lock().map(|a| a.keys().cloned().collect()).unwrap_or_default()
    }

    pub fn spec(&self, name: &str) -> Option<AlarmSpec> {
        self.alarms.lock().ok()?.get(name).map(|(_, spec)| *spec)
    }

    /// Total `create` calls so far
    pub fn create_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlarmHost for MemoryAlarms {
    async fn create(&self, name: &str, spec: AlarmSpec) -> Result<()> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.alarms
            .lock()
            .map_err(poisoned)?
            .insert(name.to_string(), (Alarm::from_spec(name, spec), spec));
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<bool> {
        Ok(self.alarms.lock().map_err(poisoned)?.remove(name).is_some())
    }

    async fn get_all(&self) -> Result<Vec<Alarm>> {
        Ok(self
            .alarms
            .lock()
            .map_err(poisoned)?
            .values()
            .map(|(alarm, _)| alarm.clone())
            .collect())
    }
}

/// Menu entries held in memory.
///
/// Rejects duplicate ids the way a real menu host does, so overlapping
/// rebuilds show up as errors.
#[derive(Debug, Default)]
pub struct MemoryMenus {
    items: Mutex<Vec<MenuItem>>,
    rebuilds: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryMenus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `remove_all` take this long
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn items(&self) -> Vec<MenuItem> {
        self.items.lock().map(|i| i.clone()).unwrap_or_default()
    }

    pub fn item(&self, id: &str) -> Option<MenuItem> {
        self.items().into_iter().find(|i| i.id == id)
    }

    /// Number of `remove_all` calls, i.e. rebuilds started
    pub fn remove_all_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuHost for MemoryMenus {
    async fn remove_all(&self) -> Result<()> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.items.lock().map_err(poisoned)?.clear();
        Ok(())
    }

    async fn create(&self, item: MenuItem) -> Result<()> {
        let mut items = self.items.lock().map_err(poisoned)?;
        if items.iter().any(|i| i.id == item.id) {
            return Err(ReloadError::Host(format!("duplicate menu id: {}", item.id)));
        }
        items.push(item);
        Ok(())
    }
}

/// Settings held in memory
#[derive(Debug)]
pub struct MemoryStore {
    values: RwLock<Map<String, Value>>,
    changes: broadcast::Sender<StorageChanges>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_map(Map::new())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            values: RwLock::new(values),
            changes,
        }
    }

    /// Seed a value without emitting a change
    pub fn with_value(self, key: &str, value: Value) -> Self {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
        self
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.read().map(|v| v.clone()).unwrap_or_default()
    }

    /// Apply a write and return what changed
    pub(crate) fn apply(&self, updates: Map<String, Value>) -> Result<StorageChanges> {
        let mut values = self.values.write().map_err(|e| ReloadError::Storage(e.to_string()))?;
        let mut changes = StorageChanges::new();
        for (key, new_value) in updates {
            let old_value = values.insert(key.clone(), new_value.clone());
            if old_value.as_ref() != Some(&new_value) {
                changes.insert(
                    key,
                    StorageChange {
                        old_value,
                        new_value: Some(new_value),
                    },
                );
            }
        }
        Ok(changes)
    }

    /// Replace every value and return what changed, removals included
    pub(crate) fn replace(&self, replacement: Map<String, Value>) -> Result<StorageChanges> {
        let mut values = self.values.write().map_err(|e| ReloadError::Storage(e.to_string()))?;
        let mut changes = StorageChanges::new();
        for (key, old_value) in values.iter() {
            if !replacement.contains_key(key) {
                changes.insert(
                    key.clone(),
                    StorageChange {
                        old_value: Some(old_value.clone()),
                        new_value: None,
                    },
                );
            }
        }
        for (key, new_value) in &replacement {
            let old_value = values.get(key);
            if old_value != Some(new_value) {
                changes.insert(
                    key.clone(),
                    StorageChange {
                        old_value: old_value.cloned(),
                        new_value: Some(new_value.clone()),
                    },
                );
            }
        }
        *values = replacement;
        Ok(changes)
    }

    pub(crate) fn notify(&self, changes: StorageChanges) {
        if changes.is_empty() {
            return;
        }
        // No subscribers is fine
        let _ = self.changes.send(changes);
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let values = self.values.read().map_err(|e| ReloadError::Storage(e.to_string()))?;
        Ok(keys
            .iter()
            .filter_map(|k| values.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, values: Map<String, Value>) -> Result<()> {
        let changes = self.apply(values)?;
        self.notify(changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChanges> {
        self.changes.subscribe()
    }
}

/// Fixed permission set. Requests are granted when `grant_on_request` is set.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    granted: RwLock<BTreeSet<Permission>>,
    grant_on_request: bool,
}

impl StaticPermissions {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            granted: RwLock::new(granted.into_iter().collect()),
            grant_on_request: false,
        }
    }

    pub fn granting_requests(mut self) -> Self {
        self.grant_on_request = true;
        self
    }

    pub fn grant(&self, permission: Permission) {
        if let Ok(mut granted) = self.granted.write() {
            granted.insert(permission);
        }
    }

    pub fn revoke(&self, permission: Permission) {
        if let Ok(mut granted) = self.granted.write() {
            granted.remove(&permission);
        }
    }
}

#[async_trait]
impl PermissionGate for StaticPermissions {
    async fn contains(&self, permissions: &[Permission]) -> bool {
        self.granted
            .read()
            .map(|g| permissions.iter().all(|p| g.contains(p)))
            .unwrap_or(false)
    }

    async fn request(&self, permissions: &[Permission]) -> bool {
        if self.grant_on_request {
            for permission in permissions {
                self.grant(*permission);
            }
        }
        self.contains(permissions).await
    }
}

/// Runtime that counts options-page opens
#[derive(Debug)]
pub struct MemoryRuntime {
    version: String,
    options_opened: AtomicUsize,
}

impl MemoryRuntime {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            options_opened: AtomicUsize::new(0),
        }
    }

    pub fn options_opened(&self) -> usize {
        self.options_opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuntimeHost for MemoryRuntime {
    async fn open_options_page(&self) -> Result<()> {
        log::info!("Opening options page");
        self.options_opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn version(&self) -> String {
        self.version.clone()
    }
}

/// All in-memory collaborators, with typed handles kept for inspection
#[derive(Clone)]
pub struct MemoryHost {
    pub tabs: Arc<MemoryTabs>,
    pub alarms: Arc<MemoryAlarms>,
    pub menus: Arc<MemoryMenus>,
    pub store: Arc<MemoryStore>,
    pub permissions: Arc<StaticPermissions>,
    pub runtime: Arc<MemoryRuntime>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self {
            tabs: Arc::new(MemoryTabs::new()),
            alarms: Arc::new(MemoryAlarms::new()),
            menus: Arc::new(MemoryMenus::new()),
            store: Arc::new(MemoryStore::new()),
            permissions: Arc::new(StaticPermissions::default()),
            runtime: Arc::new(MemoryRuntime::new("1.0.0")),
        }
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tabs(mut self, tabs: MemoryTabs) -> Self {
        self.tabs = Arc::new(tabs);
        self
    }

    pub fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_menus(mut self, menus: MemoryMenus) -> Self {
        self.menus = Arc::new(menus);
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = Arc::new(StaticPermissions::new(permissions));
        self
    }

    pub fn with_runtime(mut self, runtime: MemoryRuntime) -> Self {
        self.runtime = Arc::new(runtime);
        self
    }

    pub fn host(&self) -> Host {
        Host {
            tabs: self.tabs.clone(),
            alarms: self.alarms.clone(),
            menus: self.menus.clone(),
            store: self.store.clone(),
            permissions: self.permissions.clone(),
            runtime: self.runtime.clone(),
        }
    }
}
