//! Host collaborators
//!
//! The engine never talks to a browser directly. Every tab, alarm, menu,
//! storage and permission operation goes through one of the traits below,
//! bundled in [`Host`]. In-memory, file-backed and timer-backed
//! implementations live alongside.

pub mod alarms;
pub mod file_store;
pub mod memory;
pub mod menus;
pub mod permissions;
pub mod runtime;
pub mod store;
pub mod tabs;
pub mod timer;

use std::sync::Arc;

pub use alarms::{Alarm, AlarmHost, AlarmSpec};
pub use file_store::FileStore;
pub use memory::{MemoryAlarms, MemoryHost, MemoryMenus, MemoryRuntime, MemoryStore, MemoryTabs, StaticPermissions};
pub use menus::{MenuClick, MenuContext, MenuHost, MenuItem, MenuItemKind};
pub use permissions::{Permission, PermissionGate};
pub use runtime::RuntimeHost;
pub use store::{SettingsStore, StorageChange, StorageChanges};
pub use tabs::{GroupColor, Tab, TabGroup, TabHost, TabQuery, TabSnapshot, Window, WindowSnapshot};
pub use timer::TimerAlarms;

/// All collaborators the engine needs, behind trait objects.
#[derive(Clone)]
pub struct Host {
    pub tabs: Arc<dyn TabHost>,
    pub alarms: Arc<dyn AlarmHost>,
    pub menus: Arc<dyn MenuHost>,
    pub store: Arc<dyn SettingsStore>,
    pub permissions: Arc<dyn PermissionGate>,
    pub runtime: Arc<dyn RuntimeHost>,
}

impl Host {
    /// Check a single capability
    pub async fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&[permission]).await
    }
}
