//! Alarm provider backed by tokio timers.
//!
//! Each alarm is one task: sleep for the initial delay, then tick every
//! period, sending the alarm to the fire channel on each tick.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::alarms::{Alarm, AlarmHost, AlarmSpec};
use crate::error::{ReloadError, Result};

struct RunningAlarm {
    alarm: Alarm,
    handle: JoinHandle<()>,
}

pub struct TimerAlarms {
    running: Mutex<HashMap<String, RunningAlarm>>,
    fire_tx: mpsc::UnboundedSender<Alarm>,
}

/// Longest timer armed, about a century
const LONGEST_TIMER: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn minutes(value: f64) -> Duration {
    Duration::try_from_secs_f64((value * 60.0).max(0.0))
        .unwrap_or(LONGEST_TIMER)
        .min(LONGEST_TIMER)
}

impl TimerAlarms {
    /// Fired alarms are sent on `fire_tx`.
    pub fn new(fire_tx: mpsc::UnboundedSender<Alarm>) -> Self {
        Self {
            running: Mutex::new(HashMap::new()),
            fire_tx,
        }
    }

    fn spawn(&self, alarm: Alarm, spec: AlarmSpec) -> JoinHandle<()> {
        let tx = self.fire_tx.clone();
        let delay = minutes(spec.delay_in_minutes);
        let period = minutes(spec.period_in_minutes).max(Duration::from_millis(1));

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut ticker = tokio::time::interval(period);
            loop {
                // First tick completes immediately
                ticker.tick().await;
                let fired = Alarm {
                    scheduled_time: chrono::Utc::now(),
                    ..alarm.clone()
                };
                if tx.send(fired).is_err() {
                    log::debug!("Alarm receiver gone, stopping {}", alarm.name);
                    break;
                }
            }
        })
    }
}

impl Drop for TimerAlarms {
    fn drop(&mut self) {
        if let Ok(running) = self.running.lock() {
            for entry in running.values() {
                entry.handle.abort();
            }
        }
    }
}

#[async_trait]
impl AlarmHost for TimerAlarms {
    async fn create(&self, name: &str, spec: AlarmSpec) -> Result<()> {
        let alarm = Alarm::from_spec(name, spec);
        let handle = self.spawn(alarm.clone(), spec);

        let mut running = self.running.lock().map_err(|e| ReloadError::Host(e.to_string()))?;
        if let Some(previous) = running.insert(name.to_string(), RunningAlarm { alarm, handle }) {
            previous.handle.abort();
        }
        log::debug!(
            "Alarm {} armed: delay {}m, period {}m",
            name,
            spec.delay_in_minutes,
            spec.period_in_minutes
        );
        Ok(())
    }

    async fn clear(&self, name: &str) -> Result<bool> {
        let mut running = self.running.lock().map_err(|e| ReloadError::Host(e.to_string()))?;
        match running.remove(name) {
            Some(entry) => {
                entry.handle.abort();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_all(&self) -> Result<Vec<Alarm>> {
        let running = self.running.lock().map_err(|e| ReloadError::Host(e.to_string()))?;
        Ok(running.values().map(|r| r.alarm.clone()).collect())
    }
}
