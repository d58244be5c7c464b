//! Scheduled reload job definitions

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ReloadError, Result};

/// Minimum alarm period and delay, in minutes
pub const MIN_ALARM_INTERVAL_MINUTES: f64 = 0.1;

/// Longest alarm period or delay the hosts can represent, about 1900 years
pub const MAX_ALARM_INTERVAL_MINUTES: f64 = 1.0e9;

/// Interval used when a job is created without one
pub const DEFAULT_JOB_INTERVAL_MINUTES: f64 = 5.0;

/// A persisted recurring reload rule.
///
/// Every field is optional on the wire: the stored list is user-editable and
/// malformed entries are skipped at scheduling time rather than rejected on
/// read. Fields this type does not know about are carried in `extra` and
/// written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// URL pattern, substring or `*` wildcard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub interval_minutes: Option<f64>,

    /// Older job lists stored the interval under this name
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub interval: Option<f64>,

    /// Absent means enabled
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub bypass_cache: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub exclude_active_tab: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub exclude_audio_tabs: Option<bool>,

    /// Pause between tab reloads, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub delay: Option<f64>,

    /// Delay before the first run, in minutes
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub start_after_minutes: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Numbers and numeric strings become `Some`, anything else `None`.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        _ => None,
    })
}

/// Per-job overrides chosen at creation time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobOptions {
    pub bypass_cache: bool,
    pub exclude_active_tab: bool,
    pub exclude_audio_tabs: bool,
    pub start_after_minutes: Option<f64>,
    pub delay_ms: Option<u64>,
}

impl ScheduledJob {
    /// Create an enabled job with a fresh UUID.
    pub fn new(domain: &str, interval_minutes: f64, options: JobOptions) -> Result<Self> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(ReloadError::InvalidJob("domain is empty".to_string()));
        }
        if !interval_minutes.is_finite() || interval_minutes <= 0.0 {
            return Err(ReloadError::InvalidJob(format!(
                "interval must be greater than 0, got {}",
                interval_minutes
            )));
        }

        Ok(Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            domain: Some(domain.to_string()),
            interval_minutes: Some(interval_minutes),
            enabled: Some(true),
            bypass_cache: Some(options.bypass_cache),
            exclude_active_tab: Some(options.exclude_active_tab),
            exclude_audio_tabs: Some(options.exclude_audio_tabs),
            start_after_minutes: options.start_after_minutes,
            delay: options.delay_ms.map(|d| d as f64),
            ..Self::default()
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref().filter(|d| !d.is_empty())
    }

    /// Only an explicit `false` disables a job
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }

    /// Interval in minutes, falling back to the legacy field
    pub fn interval_minutes(&self) -> Option<f64> {
        self.interval_minutes.or(self.interval)
    }

    /// Copy of this job with `enabled` set, all other fields untouched
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..self.clone()
        }
    }
}
