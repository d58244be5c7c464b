//! Alarm provider: named repeating timers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Timing of a repeating alarm, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSpec {
    pub delay_in_minutes: f64,
    pub period_in_minutes: f64,
}

/// A live alarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub name: String,
    pub period_in_minutes: f64,
    /// Next time the alarm fires
    pub scheduled_time: DateTime<Utc>,
}

impl Alarm {
    pub fn from_spec(name: impl Into<String>, spec: AlarmSpec) -> Self {
        // Saturating cast; anything past the calendar's end pins to its last instant
        let delay_ms = (spec.delay_in_minutes * 60_000.0).round() as i64;
        let scheduled_time = chrono::Duration::try_milliseconds(delay_ms)
            .and_then(|delay| Utc::now().checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            name: name.into(),
            period_in_minutes: spec.period_in_minutes,
            scheduled_time,
        }
    }
}

/// Creating an alarm with an existing name replaces it.
#[async_trait]
pub trait AlarmHost: Send + Sync {
    async fn create(&self, name: &str, spec: AlarmSpec) -> Result<()>;

    /// Returns whether an alarm was cleared
    async fn clear(&self, name: &str) -> Result<bool>;

    async fn get_all(&self) -> Result<Vec<Alarm>>;
}
