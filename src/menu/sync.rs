//! Keeps the host's context menu in line with the settings

use std::sync::Arc;

use crate::error::Result;
use crate::host::{Host, MenuClick, Permission, TabGroup};
use crate::reload::Reloader;
use crate::scheduler::JobScheduler;
use crate::settings::{SettingKey, get_setting};

use super::action::MenuAction;
use super::builder::{MenuInput, RELOAD_ENTRIES, build_menu};
use super::latch::CoalescingLatch;

/// Rebuilds the menu and dispatches its clicks.
///
/// Clones share one latch, so rebuilds stay coalesced across clones.
#[derive(Clone)]
pub struct MenuSynchronizer {
    host: Host,
    latch: Arc<CoalescingLatch>,
    reloader: Reloader,
    scheduler: JobScheduler,
}

impl MenuSynchronizer {
    pub fn new(host: Host) -> Self {
        Self {
            reloader: Reloader::new(host.clone()),
            scheduler: JobScheduler::new(host.clone()),
            latch: Arc::new(CoalescingLatch::new()),
            host,
        }
    }

    /// Tab groups to list, if the grouped entry should show at all
    async fn menu_groups(&self, grouped_enabled: bool) -> Result<Vec<TabGroup>> {
        if !grouped_enabled || !self.host.has_permission(Permission::TabGroups).await {
            return Ok(Vec::new());
        }

        let window = self.host.tabs.current_window().await?;
        // Groups are only listed for a focused window
        if !window.focused {
            log::debug!("Current window {} not focused, skipping tab groups", window.id);
            return Ok(Vec::new());
        }

        let groups = self.host.tabs.tab_groups(window.id).await?;
        log::debug!("Found {} tab groups in window {}", groups.len(), window.id);
        Ok(groups)
    }

    /// Resolve everything a rebuild needs from settings and the host
    pub async fn menu_input(&self) -> Result<MenuInput> {
        let mut keys: Vec<SettingKey> = RELOAD_ENTRIES.iter().map(|(key, _)| *key).collect();
        keys.extend([SettingKey::BypassCache, SettingKey::ReloadGroupedOnly, SettingKey::ScheduledJobs]);
        let settings = get_setting(self.host.store.as_ref(), &keys).await?;

        let reload_modes = RELOAD_ENTRIES
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| settings.is_truthy(*key))
            .collect();

        Ok(MenuInput {
            bypass_cache: settings.flag(SettingKey::BypassCache),
            reload_modes,
            groups: self.menu_groups(settings.flag(SettingKey::ReloadGroupedOnly)).await?,
            jobs: settings.into_scheduled_jobs(),
        })
    }

    /// Clear the menu and recreate it. Returns the number of entries created.
    pub async fn rebuild(&self) -> Result<usize> {
        self.host.menus.remove_all().await?;

        let items = build_menu(&self.menu_input().await?);
        let count = items.len();
        for item in items {
            self.host.menus.create(item).await?;
        }
        log::debug!("Context menu rebuilt with {} entries", count);
        Ok(count)
    }

    /// Rebuild the menu, coalescing with a rebuild already in flight.
    ///
    /// Returns how many rebuilds this call ran; 0 means the request was folded
    /// into the in-flight one.
    pub async fn update_context_menu(&self) -> usize {
        self.latch
            .run(move || async move {
                if let Err(e) = self.rebuild().await {
                    log::warn!("Failed to rebuild context menu: {}", e);
                }
            })
            .await
    }

    /// Window a click applies to: the clicked tab's window, else the current one
    async fn click_window(&self, click: &MenuClick) -> Result<i64> {
        match click.window_id {
            Some(id) => Ok(id),
            None => Ok(self.host.tabs.current_window().await?.id),
        }
    }

    /// Run the action behind a menu click
    pub async fn on_menu_clicked(&self, click: &MenuClick) -> Result<()> {
        let Some(action) = MenuAction::from_click(click) else {
            log::debug!("Ignoring click on unknown menu entry {}", click.menu_item_id);
            return Ok(());
        };
        log::info!("Menu action: {:?}", action);

        match action {
            MenuAction::ToggleJob(job_id) => {
                if !self.scheduler.toggle_job_enabled(&job_id).await? {
                    log::debug!("No job {} to toggle", job_id);
                }
            }
            MenuAction::ReloadAllWindows => {
                self.reloader.reload_all_windows().await?;
            }
            MenuAction::ReloadGroup(group_id) => {
                let window_id = self.click_window(click).await?;
                self.reloader.reload_grouped_tabs(window_id, group_id).await?;
            }
            MenuAction::JobsStartAll => self.scheduler.set_all_jobs_enabled(true).await?,
            MenuAction::JobsStopAll => self.scheduler.set_all_jobs_enabled(false).await?,
            MenuAction::JobsManage => self.host.runtime.open_options_page().await?,
            MenuAction::ReloadWindow
            | MenuAction::ReloadPinnedOnly
            | MenuAction::ReloadUnpinnedOnly
            | MenuAction::ReloadAllLeft
            | MenuAction::ReloadAllRight
            | MenuAction::ReloadAllMatched
            | MenuAction::ReloadSkipMatched => {
                let options = action.window_options().unwrap_or_default();
                let window_id = self.click_window(click).await?;
                self.reloader.reload_window(window_id, options).await?;
            }
        }
        Ok(())
    }
}
