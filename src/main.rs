use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use futures::future::join_all;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, JobCommands, ReloadMode, SettingsCommands};
use config::Config;

use tabreload::host::{
    Alarm, AlarmHost, FileStore, Host, MemoryAlarms, MemoryMenus, MemoryRuntime, MemoryTabs, MenuItem, MenuItemKind,
    SettingsStore, StaticPermissions, StorageChange, StorageChanges, TimerAlarms,
};
use tabreload::menu::build_menu;
use tabreload::settings::{JobOptions, SettingKey, SettingValue, get_setting_by_name};
use tabreload::{Dispatcher, HostEvent, JobScheduler, MenuSynchronizer, ReloadOptions, Reloader, ScanReport, ScheduledJob};

/// How often `run` checks the settings file for edits from other processes
const STORE_POLL_INTERVAL: Duration = Duration::from_secs(2);

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabreload")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tabreload.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    // RUST_LOG wins over the config file
    if std::env::var_os("RUST_LOG").is_none() {
        if let Some(level) = level {
            builder.parse_filters(level);
        }
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Collaborators backed by the configured files
struct Backends {
    host: Host,
    store: Arc<FileStore>,
    tabs: Arc<MemoryTabs>,
}

fn build_host(config: &Config, alarms: Arc<dyn AlarmHost>) -> Result<Backends> {
    let store = Arc::new(
        FileStore::open(&config.store_path)
            .context(format!("Failed to open settings store {}", config.store_path.display()))?,
    );
    let tabs = Arc::new(MemoryTabs::from_snapshot(config.load_snapshot()?));

    let host = Host {
        tabs: tabs.clone(),
        alarms,
        menus: Arc::new(MemoryMenus::new()),
        store: store.clone(),
        permissions: Arc::new(StaticPermissions::new(config.granted_permissions.clone())),
        runtime: Arc::new(MemoryRuntime::new(config.extension_version.clone())),
    };
    Ok(Backends { host, store, tabs })
}

/// Host for commands that run once and exit
fn one_shot_host(config: &Config) -> Result<Backends> {
    build_host(config, Arc::new(MemoryAlarms::new()))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None | Some(Commands::Run) => handle_run_command(config).await,
        Some(Commands::Reload { mode, window, group }) => handle_reload_command(*mode, *window, *group, config).await,
        Some(Commands::Jobs { command }) => handle_jobs_command(command, config).await,
        Some(Commands::Settings { command }) => handle_settings_command(command, config).await,
        Some(Commands::Menu) => handle_menu_command(config).await,
    }
}

/// Forward store changes to the dispatcher. A lagged receiver forces a full refresh.
fn forward_store_changes(mut changes: broadcast::Receiver<StorageChanges>, events: mpsc::UnboundedSender<HostEvent>) {
    tokio::spawn(async move {
        loop {
            let event = match changes.recv().await {
                Ok(changes) => HostEvent::StorageChanged(changes),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Missed {} storage notifications, refreshing everything", skipped);
                    let mut all = StorageChanges::new();
                    all.insert(
                        SettingKey::ScheduledJobs.as_str().to_string(),
                        StorageChange {
                            old_value: None,
                            new_value: None,
                        },
                    );
                    HostEvent::StorageChanged(all)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if events.send(event).is_err() {
                break;
            }
        }
    });
}

fn forward_alarms(mut alarms: mpsc::UnboundedReceiver<Alarm>, events: mpsc::UnboundedSender<HostEvent>) {
    tokio::spawn(async move {
        while let Some(alarm) = alarms.recv().await {
            tracing::debug!(alarm = %alarm.name, "Alarm fired");
            if events.send(HostEvent::AlarmFired(alarm.name)).is_err() {
                break;
            }
        }
    });
}

async fn handle_run_command(config: &Config) -> Result<()> {
    info!("Running engine");
    let (alarm_tx, alarm_rx) = mpsc::unbounded_channel();
    let backends = build_host(config, Arc::new(TimerAlarms::new(alarm_tx)))?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    forward_store_changes(backends.store.subscribe(), event_tx.clone());
    forward_alarms(alarm_rx, event_tx.clone());

    let dispatcher = Arc::new(Dispatcher::new(backends.host.clone()));
    let report = dispatcher.init().await.context("Startup failed")?;
    println!(
        "{} settings {}, {} job(s) scheduled",
        "Running:".green(),
        backends.store.path().display(),
        report.jobs_scheduled
    );
    if report.fresh_install {
        println!("{}", "First run: options page requested".cyan());
    }

    let (stop_tx, stop_rx) = oneshot::channel();
    let event_loop = tokio::spawn(Arc::clone(&dispatcher).run(event_rx, stop_rx));

    let mut poll = tokio::time::interval(STORE_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = poll.tick() => {
                if let Err(e) = backends.store.sync_from_disk() {
                    log::warn!("Failed to re-read settings file: {}", e);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    println!("{}", "Shutting down...".yellow());
    let _ = stop_tx.send(());
    let in_flight = event_loop.await.context("Event loop panicked")?;
    join_all(in_flight).await;

    println!("{} {} tab reload(s) issued", "Done:".green(), backends.tabs.reloads().len());
    Ok(())
}

fn print_scan_report(report: &ScanReport, tabs: &MemoryTabs) {
    let snapshot = tabs.snapshot();
    let url_of = |id: i64| {
        snapshot
            .windows
            .iter()
            .flat_map(|w| w.tabs.iter())
            .find(|t| t.id == id)
            .map(|t| t.url_str().to_string())
            .unwrap_or_default()
    };

    for id in &report.reloaded {
        println!("  {} {:>6}  {}", "reloaded".green(), id, url_of(*id));
    }
    for (id, veto) in &report.skipped {
        println!("  {} {:>6}  {} ({:?})", "skipped ".yellow(), id, url_of(*id), veto);
    }
    for id in &report.failed {
        println!("  {} {:>6}", "failed  ".red(), id);
    }
    println!(
        "{} reloaded, {} skipped, {} failed",
        report.reloaded.len(),
        report.skipped.len(),
        report.failed.len()
    );
}

async fn handle_reload_command(
    mode: Option<ReloadMode>,
    window: Option<i64>,
    group: Option<i64>,
    config: &Config,
) -> Result<()> {
    info!("Reload - mode: {:?}, window: {:?}, group: {:?}", mode, window, group);
    let backends = one_shot_host(config)?;
    let reloader = Reloader::new(backends.host.clone());

    let host = &backends.host;
    let window_id = move || async move {
        match window {
            Some(id) => Ok(id),
            None => host
                .tabs
                .current_window()
                .await
                .map(|w| w.id)
                .context("No window to reload"),
        }
    };

    let report = match (group, mode) {
        (Some(group_id), _) => reloader.reload_grouped_tabs(window_id().await?, group_id).await?,
        (None, None) => reloader.reload().await?,
        (None, Some(ReloadMode::AllWindows)) => reloader.reload_all_windows().await?,
        (None, Some(mode)) => {
            let options = match mode {
                ReloadMode::Pinned => ReloadOptions::pinned_only(),
                ReloadMode::Unpinned => ReloadOptions::unpinned_only(),
                ReloadMode::Left => ReloadOptions::all_left(),
                ReloadMode::Right => ReloadOptions::all_right(),
                ReloadMode::Matched => ReloadOptions::all_matched(),
                ReloadMode::SkipMatched => ReloadOptions::skip_matched(),
                ReloadMode::Window | ReloadMode::AllWindows => ReloadOptions::default(),
            };
            reloader.reload_window(window_id().await?, options).await?
        }
    };

    print_scan_report(&report, &backends.tabs);
    Ok(())
}

fn print_job(job: &ScheduledJob) {
    let status = if job.is_enabled() {
        "active".green()
    } else {
        "paused".yellow()
    };
    let interval = job
        .interval_minutes()
        .map(|m| format!("{}m", m))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {}  {:<36}  {:>6}  {}",
        status,
        job.id().unwrap_or("-"),
        interval,
        job.domain().unwrap_or("-")
    );
}

async fn handle_jobs_command(command: &JobCommands, config: &Config) -> Result<()> {
    info!("Handling jobs command: {:?}", command);
    let backends = one_shot_host(config)?;
    let scheduler = JobScheduler::new(backends.host.clone());

    match command {
        JobCommands::List => {
            let jobs = scheduler.list_jobs().await?;
            if jobs.is_empty() {
                println!("{}", "No scheduled jobs".yellow());
            }
            for job in &jobs {
                print_job(job);
            }
        }
        JobCommands::Add {
            domain,
            interval,
            bypass_cache,
            exclude_active,
            exclude_audio,
            start_after,
            delay,
        } => {
            let options = JobOptions {
                bypass_cache: *bypass_cache,
                exclude_active_tab: *exclude_active,
                exclude_audio_tabs: *exclude_audio,
                start_after_minutes: *start_after,
                delay_ms: *delay,
            };
            let job = scheduler.add_job(ScheduledJob::new(domain, *interval, options)?).await?;
            println!("{} {}", "Added:".green(), job.id().unwrap_or_default());
        }
        JobCommands::Remove { id } => {
            scheduler.remove_job(id).await?;
            println!("{} {}", "Removed:".red(), id);
        }
        JobCommands::Toggle { id } => {
            if !scheduler.toggle_job_enabled(id).await? {
                eyre::bail!("No job with id {}", id);
            }
            println!("{} {}", "Toggled:".green(), id);
        }
        JobCommands::StartAll => {
            scheduler.set_all_jobs_enabled(true).await?;
            println!("{}", "All jobs started".green());
        }
        JobCommands::StopAll => {
            scheduler.set_all_jobs_enabled(false).await?;
            println!("{}", "All jobs paused".yellow());
        }
    }
    Ok(())
}

/// Parse a CLI value as JSON, falling back to a plain string
fn parse_setting_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

async fn handle_settings_command(command: &SettingsCommands, config: &Config) -> Result<()> {
    info!("Handling settings command: {:?}", command);
    let backends = one_shot_host(config)?;

    match command {
        SettingsCommands::Get { keys } => {
            let names: Vec<&str> = if keys.is_empty() {
                SettingKey::ALL.iter().map(|k| k.as_str()).collect()
            } else {
                keys.iter().map(String::as_str).collect()
            };
            let values = get_setting_by_name(backends.host.store.as_ref(), &names).await?;
            for (name, value) in &values {
                let shown = match value {
                    SettingValue::Undefined => "undefined".dimmed().to_string(),
                    other => other.to_json().to_string(),
                };
                println!("  {} = {}", name.cyan(), shown);
            }
        }
        SettingsCommands::Set { key, value } => {
            if let Ok(setting) = key.parse::<SettingKey>() {
                let required = setting.required_permissions();
                if !required.is_empty() && !backends.host.permissions.request(required).await {
                    let names: Vec<&str> = required.iter().map(|p| p.as_str()).collect();
                    println!(
                        "{} {} has no effect without permission: {}",
                        "Warning:".yellow(),
                        key,
                        names.join(", ")
                    );
                }
            } else {
                log::warn!("Writing unknown setting {}", key);
            }

            let mut update = serde_json::Map::new();
            update.insert(key.clone(), parse_setting_value(value));
            backends.host.store.set(update).await?;
            println!("{} {}", "Saved:".green(), key);
        }
    }
    Ok(())
}

fn print_menu(items: &[MenuItem]) {
    for item in items {
        let indent = if item.parent_id.is_some() { "    " } else { "" };
        let title = item.title.as_deref().unwrap_or("");
        match (item.kind, item.checked) {
            (MenuItemKind::Separator, _) => println!("{}{}", indent, "────────".dimmed()),
            (_, Some(true)) => println!("{}[x] {} {}", indent, title, format!("({})", item.id).dimmed()),
            (_, Some(false)) => println!("{}[ ] {} {}", indent, title, format!("({})", item.id).dimmed()),
            (_, None) => println!("{}{} {}", indent, title, format!("({})", item.id).dimmed()),
        }
    }
}

async fn handle_menu_command(config: &Config) -> Result<()> {
    info!("Printing menu");
    let backends = one_shot_host(config)?;
    let input = MenuSynchronizer::new(backends.host.clone()).menu_input().await?;
    print_menu(&build_menu(&input));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
