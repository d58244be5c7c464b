//! Reload strategies
//!
//! Entry points pick a tab source (one window, all windows, one tab group)
//! and feed it to the same per-tab scan in [`strategy`].

pub mod strategy;

use std::time::Duration;

use crate::error::Result;
use crate::host::{Host, Permission, Tab, TabQuery};
use crate::settings::{ButtonAction, SettingKey, get_setting};

pub use strategy::{Decision, ReloadOptions, ScanContext, ScanState, UrlFilter, Veto, decide, plan};

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub reloaded: Vec<i64>,
    pub skipped: Vec<(i64, Veto)>,
    pub failed: Vec<i64>,
}

impl ScanReport {
    fn merge(&mut self, other: ScanReport) {
        self.reloaded.extend(other.reloaded);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// Runs reload scans against the host
#[derive(Clone)]
pub struct Reloader {
    host: Host,
}

impl Reloader {
    pub fn new(host: Host) -> Self {
        Self { host }
    }

    /// Read everything a scan needs from the store
    async fn scan_context(&self, options: &ReloadOptions) -> Result<ScanContext> {
        let settings = get_setting(
            self.host.store.as_ref(),
            &[
                SettingKey::ExcludeActiveTab,
                SettingKey::ExcludeAudioTabs,
                SettingKey::BypassCache,
                SettingKey::ReloadDelay,
                SettingKey::ReloadAllMatched,
                SettingKey::ReloadSkipMatched,
            ],
        )
        .await?;

        let url_filter = if options.uses_patterns() && self.host.has_permission(Permission::Tabs).await {
            let filter = if options.all_matched {
                UrlFilter::Allow(settings.text(SettingKey::ReloadAllMatched).unwrap_or_default().to_string())
            } else {
                UrlFilter::Deny(settings.text(SettingKey::ReloadSkipMatched).unwrap_or_default().to_string())
            };
            Some(filter)
        } else {
            None
        };

        Ok(ScanContext {
            exclude_active_tab: settings.flag(SettingKey::ExcludeActiveTab),
            exclude_audio_tabs: settings.flag(SettingKey::ExcludeAudioTabs),
            bypass_cache: settings.flag(SettingKey::BypassCache),
            url_filter,
            delay_ms: settings.reload_delay_ms(),
        })
    }

    /// Scan tabs in order, reloading the ones no predicate vetoes.
    ///
    /// The delay is awaited after every visited tab, vetoed or not. A failed
    /// reload is logged and the scan goes on.
    pub async fn reload_tabs(&self, tabs: &[Tab], options: &ReloadOptions) -> Result<ScanReport> {
        let ctx = self.scan_context(options).await?;
        let mut report = ScanReport::default();
        let mut state = ScanState::default();

        for tab in tabs {
            let (next, decision) = decide(&ctx, options, state, tab);
            state = next;

            match decision {
                Decision::Reload => {
                    log::info!(
                        "Reloading {}, cache bypassed: {}",
                        tab.url.as_deref().unwrap_or(&tab.id.to_string()),
                        ctx.bypass_cache
                    );
                    match self.host.tabs.reload(tab.id, ctx.bypass_cache).await {
                        Ok(()) => report.reloaded.push(tab.id),
                        Err(e) => {
                            log::warn!("Failed to reload tab {}: {}", tab.id, e);
                            report.failed.push(tab.id);
                        }
                    }
                }
                Decision::Skip(veto) => {
                    log::debug!("Skipping tab {}: {:?}", tab.id, veto);
                    report.skipped.push((tab.id, veto));
                }
            }

            if ctx.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(ctx.delay_ms)).await;
            }
        }

        Ok(report)
    }

    /// Reload the tabs of one window
    pub async fn reload_window(&self, window_id: i64, options: ReloadOptions) -> Result<ScanReport> {
        let tabs = self.host.tabs.query_tabs(TabQuery::window(window_id)).await?;
        self.reload_tabs(&tabs, &options).await
    }

    /// Reload every window, one after the other
    pub async fn reload_all_windows(&self) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        for window in self.host.tabs.windows().await? {
            report.merge(self.reload_window(window.id, ReloadOptions::default()).await?);
        }
        Ok(report)
    }

    /// Reload one tab group. Needs the `tabGroups` permission.
    pub async fn reload_grouped_tabs(&self, window_id: i64, group_id: i64) -> Result<ScanReport> {
        if !self.host.has_permission(Permission::TabGroups).await {
            log::debug!("tabGroups permission missing, not reloading group {}", group_id);
            return Ok(ScanReport::default());
        }
        let tabs = self.host.tabs.query_tabs(TabQuery::group(window_id, group_id)).await?;
        self.reload_tabs(&tabs, &ReloadOptions::default()).await
    }

    /// Toolbar button / keyboard command: run the configured default action
    pub async fn reload(&self) -> Result<ScanReport> {
        let settings = get_setting(self.host.store.as_ref(), &[SettingKey::ButtonDefaultAction]).await?;
        let action = settings.button_action();
        log::debug!("Default action: {:?}", action);

        if action == ButtonAction::AllWindows {
            return self.reload_all_windows().await;
        }

        let options = match action {
            ButtonAction::Pinned => ReloadOptions::pinned_only(),
            ButtonAction::Unpinned => ReloadOptions::unpinned_only(),
            _ => ReloadOptions::default(),
        };
        let window = self.host.tabs.current_window().await?;
        self.reload_window(window.id, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryHost, MemoryStore, MemoryTabs, TabGroup, WindowSnapshot};
    use serde_json::json;

    fn tabs() -> Vec<Tab> {
        vec![
            Tab::new(1, "https://example.com/a").pinned(),
            Tab::new(2, "https://other.com/b").active(),
            Tab::new(3, "https://example.com/c").audible(),
        ]
    }

    fn host_with(store: MemoryStore) -> MemoryHost {
        MemoryHost::new()
            .with_tabs(MemoryTabs::with_window(1, tabs()))
            .with_store(store)
    }

    #[tokio::test]
    async fn test_reload_window_reloads_all() {
        let memory = host_with(MemoryStore::new());
        let report = Reloader::new(memory.host()).reload_window(1, ReloadOptions::default()).await.unwrap();
        assert_eq!(report.reloaded, vec![1, 2, 3]);
        assert_eq!(memory.tabs.reloaded_ids(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_exclusion_settings() {
        let store = MemoryStore::new()
            .with_value("excludeActiveTab", json!(true))
            .with_value("excludeAudioTabs", json!(true));
        let memory = host_with(store);
        Reloader::new(memory.host()).reload_window(1, ReloadOptions::default()).await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_bypass_cache_is_passed_through() {
        let memory = host_with(MemoryStore::new().with_value("bypassCache", json!(true)));
        Reloader::new(memory.host()).reload_window(1, ReloadOptions::pinned_only()).await.unwrap();
        let calls = memory.tabs.reloads();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].bypass_cache);
    }

    #[tokio::test]
    async fn test_pattern_modes_need_tabs_permission() {
        let store = MemoryStore::new().with_value("reloadAllMatched", json!("example.com"));
        let memory = host_with(store);
        Reloader::new(memory.host()).reload_window(1, ReloadOptions::all_matched()).await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1, 2, 3]);

        let store = MemoryStore::new().with_value("reloadAllMatched", json!("example.com"));
        let memory = host_with(store).with_permissions([Permission::Tabs]);
        Reloader::new(memory.host()).reload_window(1, ReloadOptions::all_matched()).await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_skip_matched() {
        let store = MemoryStore::new().with_value("reloadSkipMatched", json!("example.com"));
        let memory = host_with(store).with_permissions([Permission::Tabs]);
        Reloader::new(memory.host()).reload_window(1, ReloadOptions::skip_matched()).await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_failed_reload_does_not_abort_scan() {
        let memory = host_with(MemoryStore::new());
        memory.tabs.fail_reload(2);
        let report = Reloader::new(memory.host()).reload_window(1, ReloadOptions::default()).await.unwrap();
        assert_eq!(report.reloaded, vec![1, 3]);
        assert_eq!(report.failed, vec![2]);
    }

    #[tokio::test]
    async fn test_delay_applies_per_visited_tab() {
        let memory = host_with(MemoryStore::new().with_value("reloadDelay", json!(20)));
        let start = std::time::Instant::now();
        Reloader::new(memory.host()).reload_window(1, ReloadOptions::pinned_only()).await.unwrap();
        // One reload, three visited tabs
        assert!(start.elapsed() >= Duration::from_millis(60));
        assert_eq!(memory.tabs.reloaded_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_reload_all_windows() {
        let tabs = MemoryTabs::with_window(1, vec![Tab::new(1, "https://a.com")]);
        tabs.add_window(WindowSnapshot {
            id: 2,
            tabs: vec![Tab::new(2, "https://b.com"), Tab::new(3, "https://c.com")],
            ..Default::default()
        });
        let memory = MemoryHost::new().with_tabs(tabs);
        let report = Reloader::new(memory.host()).reload_all_windows().await.unwrap();
        assert_eq!(report.reloaded, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_grouped_reload_requires_permission() {
        let tabs = MemoryTabs::with_window(
            1,
            vec![Tab::new(1, "https://a.com").in_group(100), Tab::new(2, "https://b.com")],
        );
        tabs.add_group(
            1,
            TabGroup {
                id: 100,
                window_id: 1,
                title: Some("Work".into()),
                color: Default::default(),
            },
        );
        let memory = MemoryHost::new().with_tabs(tabs);
        Reloader::new(memory.host()).reload_grouped_tabs(1, 100).await.unwrap();
        assert!(memory.tabs.reloaded_ids().is_empty());

        memory.permissions.grant(Permission::TabGroups);
        Reloader::new(memory.host()).reload_grouped_tabs(1, 100).await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_button_actions() {
        let memory = host_with(MemoryStore::new());
        Reloader::new(memory.host()).reload().await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1, 2, 3]);

        let memory = host_with(MemoryStore::new().with_value("buttonDefaultAction", json!("pinned")));
        Reloader::new(memory.host()).reload().await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1]);

        let memory = host_with(MemoryStore::new().with_value("buttonDefaultAction", json!("unpinned")));
        Reloader::new(memory.host()).reload().await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![2, 3]);

        let memory = host_with(MemoryStore::new().with_value("buttonDefaultAction", json!("allWindows")));
        Reloader::new(memory.host()).reload().await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1, 2, 3]);
    }
}
