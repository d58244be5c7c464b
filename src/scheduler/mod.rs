//! Scheduled reload jobs.
//!
//! This module provides:
//! - **Job CRUD**: add, remove, toggle and bulk enable/disable of the
//!   persisted job list.
//! - **Alarm projection**: every enabled, well-formed job gets exactly one
//!   repeating alarm named from its id.
//! - **Execution**: an alarm fire reloads every tab matching the job's
//!   domain pattern.
//!
//! # Architecture
//!
//! The job list in the settings store is the only source of truth. The alarm
//! set is derived from it and rebuilt wholesale (clear, then recreate) on
//! every change; there is no incremental diffing.

mod alarm_name;

use std::time::Duration;

use futures::future::join_all;

use crate::error::{ReloadError, Result};
use crate::host::{Host, Permission, TabQuery};
use crate::matching::UrlPattern;
use crate::reload::{ScanReport, Veto};
use crate::settings::{
    ScheduledJob, SettingKey, get_setting, job_entry_enabled, job_entry_id, load_job_entries, save_job_entries,
    set_job_entry_enabled,
};

pub use alarm_name::{JOB_ALARM_PREFIX, alarm_for, is_job_alarm, job_alarm_name, job_id_from_alarm};

/// Owns the job list and its alarms
#[derive(Clone)]
pub struct JobScheduler {
    host: Host,
}

impl JobScheduler {
    pub fn new(host: Host) -> Self {
        Self { host }
    }

    /// Current job list
    pub async fn list_jobs(&self) -> Result<Vec<ScheduledJob>> {
        let settings = get_setting(self.host.store.as_ref(), &[SettingKey::ScheduledJobs]).await?;
        Ok(settings.into_scheduled_jobs())
    }

    /// Clear every job alarm, leaving other alarms alone. Returns how many were cleared.
    pub async fn clear_job_alarms(&self) -> Result<usize> {
        if !self.host.has_permission(Permission::Alarms).await {
            return Ok(0);
        }

        let alarms = self.host.alarms.get_all().await?;
        let clears = alarms
            .iter()
            .filter(|a| is_job_alarm(&a.name))
            .map(|a| self.host.alarms.clear(&a.name));

        let mut cleared = 0;
        for result in join_all(clears).await {
            if result? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Rebuild the alarm set from the job list. Returns how many alarms were created.
    ///
    /// Without the `alarms` permission this does nothing.
    pub async fn schedule_all_jobs(&self) -> Result<usize> {
        if !self.host.has_permission(Permission::Alarms).await {
            log::debug!("alarms permission missing, not scheduling jobs");
            return Ok(0);
        }

        let cleared = self.clear_job_alarms().await?;
        let jobs = self.list_jobs().await?;

        let mut scheduled = 0;
        for job in &jobs {
            let Some((name, spec)) = alarm_for(job) else {
                log::debug!("Not scheduling job {:?} ({:?})", job.id, job.domain);
                continue;
            };
            self.host.alarms.create(&name, spec).await?;
            scheduled += 1;
        }

        log::info!(
            "Scheduled {} of {} jobs (cleared {} alarms)",
            scheduled,
            jobs.len(),
            cleared
        );
        Ok(scheduled)
    }

    /// Set `enabled` on every job. Alarms follow through the storage change path.
    pub async fn set_all_jobs_enabled(&self, enabled: bool) -> Result<()> {
        let mut entries = load_job_entries(self.host.store.as_ref()).await?;
        if entries.is_empty() {
            return Ok(());
        }

        entries.iter_mut().for_each(|entry| set_job_entry_enabled(entry, enabled));
        save_job_entries(self.host.store.as_ref(), entries).await
    }

    /// Flip one job's `enabled` flag. Returns false if no job has this id.
    ///
    /// Every other stored entry is written back as it was read.
    pub async fn toggle_job_enabled(&self, job_id: &str) -> Result<bool> {
        let mut entries = load_job_entries(self.host.store.as_ref()).await?;
        let Some(entry) = entries.iter_mut().find(|entry| job_entry_id(entry) == Some(job_id)) else {
            return Ok(false);
        };

        let enabled = !job_entry_enabled(entry);
        set_job_entry_enabled(entry, enabled);
        save_job_entries(self.host.store.as_ref(), entries).await?;
        Ok(true)
    }

    /// Append a job to the list
    pub async fn add_job(&self, job: ScheduledJob) -> Result<ScheduledJob> {
        let Some(id) = job.id().filter(|_| job.domain().is_some()) else {
            return Err(ReloadError::InvalidJob("job needs an id and a domain".to_string()));
        };

        let mut entries = load_job_entries(self.host.store.as_ref()).await?;
        if entries.iter().any(|entry| job_entry_id(entry) == Some(id)) {
            return Err(ReloadError::InvalidJob(format!("duplicate job id: {}", id)));
        }
        entries.push(serde_json::to_value(&job)?);
        save_job_entries(self.host.store.as_ref(), entries).await?;
        Ok(job)
    }

    /// Remove a job by id
    pub async fn remove_job(&self, job_id: &str) -> Result<()> {
        let mut entries = load_job_entries(self.host.store.as_ref()).await?;
        let before = entries.len();
        entries.retain(|entry| job_entry_id(entry) != Some(job_id));
        if entries.len() == before {
            return Err(ReloadError::JobNotFound(job_id.to_string()));
        }
        save_job_entries(self.host.store.as_ref(), entries).await
    }

    /// Run a job: reload every tab whose URL matches its domain pattern.
    ///
    /// A missing job clears its stray alarm. Per-tab failures are logged and
    /// skipped.
    pub async fn execute_scheduled_job(&self, job_id: &str) -> Result<ScanReport> {
        let jobs = self.list_jobs().await?;
        let Some(job) = jobs.into_iter().find(|job| job.id.as_deref() == Some(job_id)) else {
            tracing::info!(job_id = %job_id, "Job no longer exists, clearing its alarm");
            self.host.alarms.clear(&job_alarm_name(job_id)).await?;
            return Ok(ScanReport::default());
        };

        let mut report = ScanReport::default();
        let Some(pattern) = job.domain().and_then(UrlPattern::parse) else {
            return Ok(report);
        };

        let matched: Vec<_> = self
            .host
            .tabs
            .query_tabs(TabQuery::all())
            .await?
            .into_iter()
            .filter(|tab| pattern.matches(tab.url_str()))
            .collect();

        if matched.is_empty() {
            tracing::debug!(job_id = %job_id, "No tabs match job");
            return Ok(report);
        }

        let base = get_setting(
            self.host.store.as_ref(),
            &[
                SettingKey::BypassCache,
                SettingKey::ExcludeActiveTab,
                SettingKey::ExcludeAudioTabs,
                SettingKey::ReloadDelay,
            ],
        )
        .await?;

        let bypass_cache = job.bypass_cache.unwrap_or(base.flag(SettingKey::BypassCache));
        let exclude_active = job.exclude_active_tab.unwrap_or(base.flag(SettingKey::ExcludeActiveTab));
        let exclude_audio = job.exclude_audio_tabs.unwrap_or(base.flag(SettingKey::ExcludeAudioTabs));
        let delay_ms = job
            .delay
            .filter(|d| d.is_finite())
            .map(|d| d.max(0.0) as u64)
            .unwrap_or(base.reload_delay_ms());

        for tab in matched {
            if exclude_active && tab.active {
                report.skipped.push((tab.id, Veto::ActiveTab));
                continue;
            }
            if exclude_audio && tab.audible {
                report.skipped.push((tab.id, Veto::Audible));
                continue;
            }

            match self.host.tabs.reload(tab.id, bypass_cache).await {
                Ok(()) => report.reloaded.push(tab.id),
                Err(e) => {
                    tracing::warn!(job_id = %job_id, tab_id = tab.id, error = %e, "Failed to reload tab for job");
                    report.failed.push(tab.id);
                }
            }

            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        tracing::info!(
            job_id = %job_id,
            reloaded = report.reloaded.len(),
            failed = report.failed.len(),
            "Job finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AlarmHost, AlarmSpec, MemoryHost, MemoryStore, MemoryTabs, SettingsStore, Tab};
    use serde_json::json;

    fn store_with_jobs(jobs: serde_json::Value) -> MemoryStore {
        MemoryStore::new().with_value("scheduledJobs", jobs)
    }

    fn alarmed(store: MemoryStore) -> MemoryHost {
        MemoryHost::new().with_store(store).with_permissions([Permission::Alarms])
    }

    #[tokio::test]
    async fn test_schedule_requires_alarms_permission() {
        let memory = MemoryHost::new()
            .with_store(store_with_jobs(json!([{"id": "1", "domain": "example.com", "intervalMinutes": 5}])));
        let scheduled = JobScheduler::new(memory.host()).schedule_all_jobs().await.unwrap();
        assert_eq!(scheduled, 0);
        assert_eq!(memory.alarms.create_count(), 0);
    }

    #[tokio::test]
    async fn test_schedule_enabled_jobs() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "1", "domain": "example.com", "intervalMinutes": 5, "enabled": true},
            {"id": "2", "domain": "other.com", "intervalMinutes": 5, "enabled": false},
            {"id": "3", "intervalMinutes": 5},
            {"id": "4", "domain": "x.com", "intervalMinutes": 0}
        ])));
        let scheduled = JobScheduler::new(memory.host()).schedule_all_jobs().await.unwrap();
        assert_eq!(scheduled, 1);
        assert_eq!(memory.alarms.names(), vec!["reload-job:1"]);
    }

    #[tokio::test]
    async fn test_schedule_clears_only_job_alarms() {
        let memory = alarmed(store_with_jobs(json!([])));
        let spec = AlarmSpec {
            delay_in_minutes: 1.0,
            period_in_minutes: 1.0,
        };
        memory.alarms.create("reload-job:stale", spec).await.unwrap();
        memory.alarms.create("unrelated", spec).await.unwrap();

        JobScheduler::new(memory.host()).schedule_all_jobs().await.unwrap();
        assert_eq!(memory.alarms.names(), vec!["unrelated"]);
    }

    #[tokio::test]
    async fn test_schedule_is_idempotent() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "a", "domain": "a.com", "intervalMinutes": 1},
            {"id": "b", "domain": "b.com", "intervalMinutes": 2, "startAfterMinutes": 0.5}
        ])));
        let scheduler = JobScheduler::new(memory.host());
        scheduler.schedule_all_jobs().await.unwrap();
        let first: Vec<_> = memory.alarms.names().into_iter().map(|n| (memory.alarms.spec(&n), n)).collect();
        scheduler.schedule_all_jobs().await.unwrap();
        let second: Vec<_> = memory.alarms.names().into_iter().map(|n| (memory.alarms.spec(&n), n)).collect();
        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_set_all_jobs_enabled() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "1", "domain": "a.com", "enabled": false},
            {"id": "2", "domain": "b.com"}
        ])));
        let scheduler = JobScheduler::new(memory.host());
        scheduler.set_all_jobs_enabled(true).await.unwrap();
        assert!(scheduler.list_jobs().await.unwrap().iter().all(|j| j.enabled == Some(true)));

        scheduler.set_all_jobs_enabled(false).await.unwrap();
        assert!(scheduler.list_jobs().await.unwrap().iter().all(|j| !j.is_enabled()));
        // Alarms are left to the storage change path
        assert_eq!(memory.alarms.create_count(), 0);
    }

    #[tokio::test]
    async fn test_set_all_jobs_enabled_empty_list_writes_nothing() {
        let memory = MemoryHost::new();
        let mut rx = memory.store.subscribe();
        JobScheduler::new(memory.host()).set_all_jobs_enabled(true).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_toggle_flips_only_target() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "1", "domain": "a.com", "enabled": true, "label": "keep"},
            {"id": "2", "domain": "b.com", "enabled": true, "bypassCache": true}
        ])));
        let scheduler = JobScheduler::new(memory.host());
        let before = scheduler.list_jobs().await.unwrap();

        assert!(scheduler.toggle_job_enabled("1").await.unwrap());
        let after = scheduler.list_jobs().await.unwrap();
        assert!(!after[0].is_enabled());
        assert_eq!(after[0].extra.get("label"), Some(&json!("keep")));
        assert_eq!(after[1], before[1]);

        assert!(scheduler.toggle_job_enabled("1").await.unwrap());
        assert!(scheduler.list_jobs().await.unwrap()[0].is_enabled());
    }

    #[tokio::test]
    async fn test_toggle_unknown_id() {
        let memory = alarmed(store_with_jobs(json!([{"id": "1", "domain": "a.com"}])));
        let scheduler = JobScheduler::new(memory.host());
        assert!(!scheduler.toggle_job_enabled("nope").await.unwrap());
        assert!(scheduler.list_jobs().await.unwrap()[0].is_enabled());
    }

    #[tokio::test]
    async fn test_schedule_skips_oversized_intervals() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "far", "domain": "a.com", "intervalMinutes": 1e12},
            {"id": "late", "domain": "b.com", "intervalMinutes": 5, "startAfterMinutes": 1e12},
            {"id": "ok", "domain": "c.com", "intervalMinutes": 5}
        ])));
        let scheduled = JobScheduler::new(memory.host()).schedule_all_jobs().await.unwrap();
        assert_eq!(scheduled, 1);
        assert_eq!(memory.alarms.names(), vec!["reload-job:ok"]);
    }

    fn stored_jobs(memory: &MemoryHost) -> serde_json::Value {
        memory.store.snapshot()["scheduledJobs"].clone()
    }

    #[tokio::test]
    async fn test_toggle_keeps_unparseable_siblings() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "a", "domain": "a.com"},
            {"id": 7, "domain": "b.com", "intervalMinutes": 5},
            "not a job",
            {"id": "c", "domain": ["c.com"], "intervalMinutes": 2}
        ])));

        assert!(JobScheduler::new(memory.host()).toggle_job_enabled("a").await.unwrap());

        assert_eq!(
            stored_jobs(&memory),
            json!([
                {"id": "a", "domain": "a.com", "enabled": false},
                {"id": 7, "domain": "b.com", "intervalMinutes": 5},
                "not a job",
                {"id": "c", "domain": ["c.com"], "intervalMinutes": 2}
            ])
        );
    }

    #[tokio::test]
    async fn test_bulk_and_crud_writes_keep_unparseable_entries() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "a", "domain": "a.com"},
            {"id": 7, "domain": "b.com"},
            42
        ])));
        let scheduler = JobScheduler::new(memory.host());

        scheduler.set_all_jobs_enabled(false).await.unwrap();
        assert_eq!(
            stored_jobs(&memory),
            json!([
                {"id": "a", "domain": "a.com", "enabled": false},
                {"id": 7, "domain": "b.com", "enabled": false},
                42
            ])
        );

        let job = ScheduledJob::new("d.com", 3.0, Default::default()).unwrap();
        let id = job.id.clone().unwrap();
        scheduler.add_job(job).await.unwrap();
        assert_eq!(stored_jobs(&memory).as_array().map(Vec::len), Some(4));

        scheduler.remove_job("a").await.unwrap();
        scheduler.remove_job(&id).await.unwrap();
        assert_eq!(stored_jobs(&memory), json!([{"id": 7, "domain": "b.com", "enabled": false}, 42]));
    }

    #[tokio::test]
    async fn test_toggle_preserves_integer_fields() {
        let memory = alarmed(store_with_jobs(json!([
            {"id": "a", "domain": "a.com", "intervalMinutes": 5, "enabled": false}
        ])));
        assert!(JobScheduler::new(memory.host()).toggle_job_enabled("a").await.unwrap());
        assert_eq!(
            stored_jobs(&memory),
            json!([{"id": "a", "domain": "a.com", "intervalMinutes": 5, "enabled": true}])
        );
    }

    #[tokio::test]
    async fn test_add_and_remove_job() {
        let memory = alarmed(MemoryStore::new());
        let scheduler = JobScheduler::new(memory.host());
        let job = ScheduledJob::new("news.com", 10.0, Default::default()).unwrap();
        let id = job.id.clone().unwrap();

        scheduler.add_job(job.clone()).await.unwrap();
        assert!(scheduler.add_job(job).await.is_err());
        assert_eq!(scheduler.list_jobs().await.unwrap().len(), 1);

        scheduler.remove_job(&id).await.unwrap();
        assert!(scheduler.list_jobs().await.unwrap().is_empty());
        assert!(matches!(scheduler.remove_job(&id).await, Err(ReloadError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_execute_missing_job_clears_alarm() {
        let memory = alarmed(store_with_jobs(json!([])));
        let spec = AlarmSpec {
            delay_in_minutes: 1.0,
            period_in_minutes: 1.0,
        };
        memory.alarms.create("reload-job:gone", spec).await.unwrap();

        JobScheduler::new(memory.host()).execute_scheduled_job("gone").await.unwrap();
        assert!(memory.alarms.names().is_empty());
    }

    #[tokio::test]
    async fn test_execute_reloads_matching_tabs() {
        let tabs = MemoryTabs::with_window(
            1,
            vec![Tab::new(1, "https://example.com/a"), Tab::new(2, "https://other.com")],
        );
        let memory = alarmed(store_with_jobs(json!([{"id": "j1", "domain": "example.com", "intervalMinutes": 5}])))
            .with_tabs(tabs);
        let report = JobScheduler::new(memory.host()).execute_scheduled_job("j1").await.unwrap();
        assert_eq!(report.reloaded, vec![1]);
        assert_eq!(memory.tabs.reloaded_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_execute_job_overrides_fall_back_to_global() {
        let tabs = MemoryTabs::with_window(
            1,
            vec![
                Tab::new(1, "https://example.com/a").active(),
                Tab::new(2, "https://example.com/b").audible(),
                Tab::new(3, "https://example.com/c"),
            ],
        );
        let store = store_with_jobs(json!([{"id": "j", "domain": "example.com", "excludeAudioTabs": false}]))
            .with_value("excludeActiveTab", json!(true))
            .with_value("excludeAudioTabs", json!(true))
            .with_value("bypassCache", json!(true));
        let memory = alarmed(store).with_tabs(tabs);

        JobScheduler::new(memory.host()).execute_scheduled_job("j").await.unwrap();
        let calls = memory.tabs.reloads();
        assert_eq!(calls.iter().map(|c| c.tab_id).collect::<Vec<_>>(), vec![2, 3]);
        assert!(calls.iter().all(|c| c.bypass_cache));
    }

    #[tokio::test]
    async fn test_execute_job_bypass_override() {
        let tabs = MemoryTabs::with_window(1, vec![Tab::new(1, "https://example.com")]);
        let memory = alarmed(store_with_jobs(json!([{"id": "j", "domain": "example.com", "bypassCache": true}])))
            .with_tabs(tabs);
        JobScheduler::new(memory.host()).execute_scheduled_job("j").await.unwrap();
        assert!(memory.tabs.reloads()[0].bypass_cache);
    }

    #[tokio::test]
    async fn test_execute_swallows_reload_errors() {
        let tabs = MemoryTabs::with_window(
            1,
            vec![Tab::new(1, "https://example.com/1"), Tab::new(2, "https://example.com/2")],
        );
        tabs.fail_reload(1);
        let memory = alarmed(store_with_jobs(json!([{"id": "j", "domain": "example.com"}]))).with_tabs(tabs);
        let report = JobScheduler::new(memory.host()).execute_scheduled_job("j").await.unwrap();
        assert_eq!(report.failed, vec![1]);
        assert_eq!(report.reloaded, vec![2]);
    }

    #[tokio::test]
    async fn test_execute_wildcard_domain() {
        let tabs = MemoryTabs::with_window(
            1,
            vec![Tab::new(1, "https://app.example.com/x"), Tab::new(2, "https://example.com.evil.org/")],
        );
        let memory = alarmed(store_with_jobs(json!([{"id": "j", "domain": "https://*.example.com/*"}]))).with_tabs(tabs);
        JobScheduler::new(memory.host()).execute_scheduled_job("j").await.unwrap();
        assert_eq!(memory.tabs.reloaded_ids(), vec![1]);
    }
}
