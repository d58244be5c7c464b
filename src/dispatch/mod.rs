//! Dispatch layer
//!
//! Routes host events to the engine:
//! - toolbar button and keyboard commands run the default reload action
//! - menu clicks go to the [`MenuSynchronizer`]
//! - job alarms go to the [`JobScheduler`]
//! - storage changes rebuild the menu and reschedule jobs as needed
//! - permission grants switch on the features that depend on them
//!
//! Each event is handled on its own task, so reload scans triggered close
//! together may interleave.

mod event;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::host::{Host, Permission, StorageChanges};
use crate::menu::MenuSynchronizer;
use crate::reload::Reloader;
use crate::scheduler::{JobScheduler, job_id_from_alarm};
use crate::settings::{SettingKey, get_setting};

pub use event::{HostEvent, StorageFollowUp};

/// What startup did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub tab_groups_enabled: bool,
    pub alarms_enabled: bool,
    pub jobs_scheduled: usize,
    /// No version was stored before this run
    pub fresh_install: bool,
    /// Stored version differed and was replaced
    pub version_changed: bool,
}

pub struct Dispatcher {
    host: Host,
    reloader: Reloader,
    scheduler: JobScheduler,
    menu: MenuSynchronizer,
    tab_groups_listening: AtomicBool,
    alarms_listening: AtomicBool,
}

impl Dispatcher {
    pub fn new(host: Host) -> Self {
        Self {
            reloader: Reloader::new(host.clone()),
            scheduler: JobScheduler::new(host.clone()),
            menu: MenuSynchronizer::new(host.clone()),
            host,
            tab_groups_listening: AtomicBool::new(false),
            alarms_listening: AtomicBool::new(false),
        }
    }

    pub fn menu(&self) -> &MenuSynchronizer {
        &self.menu
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub fn reloader(&self) -> &Reloader {
        &self.reloader
    }

    /// Start reacting to tab group changes. True the first time only.
    fn enable_tab_groups(&self) -> bool {
        let first = !self.tab_groups_listening.swap(true, Ordering::SeqCst);
        if first {
            log::info!("Tab group events enabled");
        }
        first
    }

    /// Start reacting to alarms. True the first time only.
    fn enable_alarms(&self) -> bool {
        let first = !self.alarms_listening.swap(true, Ordering::SeqCst);
        if first {
            log::info!("Alarm events enabled");
        }
        first
    }

    pub fn tab_groups_enabled(&self) -> bool {
        self.tab_groups_listening.load(Ordering::SeqCst)
    }

    pub fn alarms_enabled(&self) -> bool {
        self.alarms_listening.load(Ordering::SeqCst)
    }

    /// Startup: enable features already permitted, build the menu, schedule
    /// jobs, then record the running version.
    pub async fn init(&self) -> Result<StartupReport> {
        let mut report = StartupReport::default();

        if self.host.has_permission(Permission::TabGroups).await {
            self.enable_tab_groups();
        }
        if self.host.has_permission(Permission::Alarms).await {
            self.enable_alarms();
        }
        report.tab_groups_enabled = self.tab_groups_enabled();
        report.alarms_enabled = self.alarms_enabled();

        self.menu.update_context_menu().await;
        report.jobs_scheduled = self.scheduler.schedule_all_jobs().await?;

        let (fresh_install, version_changed) = self.check_version().await?;
        report.fresh_install = fresh_install;
        report.version_changed = version_changed;

        tracing::info!(
            tab_groups = report.tab_groups_enabled,
            alarms = report.alarms_enabled,
            jobs = report.jobs_scheduled,
            fresh_install = report.fresh_install,
            "Startup complete"
        );
        Ok(report)
    }

    /// Compare the stored version with the running one. Returns
    /// `(fresh_install, changed)`.
    async fn check_version(&self) -> Result<(bool, bool)> {
        let current = self.host.runtime.version();
        let settings = get_setting(self.host.store.as_ref(), &[SettingKey::Version]).await?;
        let stored = settings.text(SettingKey::Version).filter(|v| !v.is_empty());

        if stored == Some(current.as_str()) {
            return Ok((false, false));
        }

        let fresh_install = stored.is_none();
        if fresh_install {
            self.host.runtime.open_options_page().await?;
        } else {
            log::info!("Updated from {} to {}", stored.unwrap_or_default(), current);
        }

        let mut update = serde_json::Map::new();
        update.insert(SettingKey::Version.as_str().to_string(), serde_json::Value::String(current));
        self.host.store.set(update).await?;
        Ok((fresh_install, true))
    }

    async fn on_storage_changed(&self, changes: &StorageChanges) -> Result<()> {
        let follow_up = StorageFollowUp::from_changes(changes);
        if follow_up.update_menu {
            self.menu.update_context_menu().await;
        }
        if follow_up.reschedule_jobs {
            self.scheduler.schedule_all_jobs().await?;
        }
        Ok(())
    }

    async fn on_permissions_added(&self, permissions: &[Permission]) -> Result<()> {
        if permissions.contains(&Permission::TabGroups) {
            self.enable_tab_groups();
            self.menu.update_context_menu().await;
        }
        if permissions.contains(&Permission::Alarms) {
            self.enable_alarms();
            self.scheduler.schedule_all_jobs().await?;
        }
        Ok(())
    }

    async fn on_alarm(&self, name: &str) -> Result<()> {
        if !self.alarms_enabled() {
            log::debug!("Alarm {} before alarms were enabled, ignoring", name);
            return Ok(());
        }
        let Some(job_id) = job_id_from_alarm(name) else {
            return Ok(());
        };
        self.scheduler.execute_scheduled_job(job_id).await?;
        Ok(())
    }

    /// Handle one event to completion
    pub async fn handle(&self, event: HostEvent) -> Result<()> {
        log::debug!("Handling {} event", event.kind());
        match event {
            HostEvent::ActionClicked | HostEvent::Command(_) => {
                self.reloader.reload().await?;
            }
            HostEvent::MenuClicked(click) => self.menu.on_menu_clicked(&click).await?,
            HostEvent::AlarmFired(name) => self.on_alarm(&name).await?,
            HostEvent::StorageChanged(changes) => self.on_storage_changed(&changes).await?,
            HostEvent::PermissionsAdded(permissions) => self.on_permissions_added(&permissions).await?,
            HostEvent::TabGroupsChanged => {
                if self.tab_groups_enabled() {
                    self.menu.update_context_menu().await;
                }
            }
        }
        Ok(())
    }

    /// Handle events until the channel closes or `shutdown` fires.
    ///
    /// Every event runs on its own task. Returns the handles of tasks still
    /// running at exit.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<HostEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> Vec<JoinHandle<()>> {
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        log::info!("Event channel closed");
                        break;
                    };
                    tasks.retain(|t| !t.is_finished());

                    let dispatcher = Arc::clone(&self);
                    tasks.push(tokio::spawn(async move {
                        let kind = event.kind();
                        if let Err(e) = dispatcher.handle(event).await {
                            tracing::warn!(event = kind, error = %e, "Event handler failed");
                        }
                    }));
                }
                _ = &mut shutdown => {
                    log::info!("Dispatcher shutting down");
                    break;
                }
            }
        }

        tasks.retain(|t| !t.is_finished());
        tasks
    }
}
