//! Events delivered by the host

use crate::host::{MenuClick, Permission, StorageChanges};
use crate::settings::SettingKey;

/// Something the host reports to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Toolbar button pressed
    ActionClicked,
    /// Keyboard command, by name
    Command(String),
    MenuClicked(MenuClick),
    /// An alarm fired, by name
    AlarmFired(String),
    StorageChanged(StorageChanges),
    PermissionsAdded(Vec<Permission>),
    /// A tab group was created, removed or updated
    TabGroupsChanged,
}

impl HostEvent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::ActionClicked => "action-clicked",
            HostEvent::Command(_) => "command",
            HostEvent::MenuClicked(_) => "menu-clicked",
            HostEvent::AlarmFired(_) => "alarm-fired",
            HostEvent::StorageChanged(_) => "storage-changed",
            HostEvent::PermissionsAdded(_) => "permissions-added",
            HostEvent::TabGroupsChanged => "tab-groups-changed",
        }
    }
}

/// Follow-up work a batch of storage changes calls for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageFollowUp {
    pub update_menu: bool,
    pub reschedule_jobs: bool,
}

impl StorageFollowUp {
    pub fn from_changes(changes: &StorageChanges) -> Self {
        changes.keys().fold(Self::default(), |acc, key| {
            let jobs = key == "scheduledJobs";
            Self {
                update_menu: acc.update_menu || jobs || SettingKey::affects_menu(key),
                reschedule_jobs: acc.reschedule_jobs || jobs,
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        !self.update_menu && !self.reschedule_jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StorageChange;
    use serde_json::json;

    fn changes(keys: &[&str]) -> StorageChanges {
        keys.iter()
            .map(|k| {
                (
                    k.to_string(),
                    StorageChange {
                        old_value: None,
                        new_value: Some(json!(true)),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_reload_keys_update_menu_only() {
        let follow_up = StorageFollowUp::from_changes(&changes(&["reloadAllLeft"]));
        assert_eq!(
            follow_up,
            StorageFollowUp {
                update_menu: true,
                reschedule_jobs: false
            }
        );
        assert!(StorageFollowUp::from_changes(&changes(&["bypassCache"])).update_menu);
    }

    #[test]
    fn test_scheduled_jobs_does_both() {
        let follow_up = StorageFollowUp::from_changes(&changes(&["excludeActiveTab", "scheduledJobs"]));
        assert!(follow_up.update_menu);
        assert!(follow_up.reschedule_jobs);
    }

    #[test]
    fn test_unrelated_keys_do_nothing() {
        assert!(StorageFollowUp::from_changes(&changes(&["excludeAudioTabs", "version"])).is_empty());
        assert!(StorageFollowUp::from_changes(&StorageChanges::new()).is_empty());
    }
}
