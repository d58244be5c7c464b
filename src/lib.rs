//! Tabreload - browser tab reload orchestration
//!
//! Reloads sets of tabs chosen by position, pin state, group or URL
//! pattern, runs recurring per-domain reload jobs on host alarms, and keeps a
//! context menu in sync with the settings. Every host capability (tabs,
//! alarms, menus, storage, permissions) sits behind a trait in [`host`].

pub mod dispatch;
pub mod error;
pub mod host;
pub mod matching;
pub mod menu;
pub mod reload;
pub mod scheduler;
pub mod settings;

pub use dispatch::{Dispatcher, HostEvent, StartupReport};
pub use error::{ReloadError, Result};
pub use host::Host;
pub use matching::{UrlPattern, matches_any_pattern, matches_pattern};
pub use menu::{MenuAction, MenuSynchronizer};
pub use reload::{ReloadOptions, Reloader, ScanReport};
pub use scheduler::JobScheduler;
pub use settings::{ScheduledJob, SettingKey, SettingValue, Settings};
