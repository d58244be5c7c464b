//! Typed read layer over the settings store
//!
//! Every read applies the per-key defaults and coercions in [`keys`],
//! independently of what is physically stored. Nothing is cached: callers
//! re-read on every operation.

pub mod job;
pub mod keys;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::host::SettingsStore;

pub use job::{
    DEFAULT_JOB_INTERVAL_MINUTES, JobOptions, MAX_ALARM_INTERVAL_MINUTES, MIN_ALARM_INTERVAL_MINUTES, ScheduledJob,
};
pub use keys::{Coercion, SettingKey};

/// A coerced setting value
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Integer(u64),
    Text(String),
    Jobs(Vec<ScheduledJob>),
    /// Verbatim stored value
    Raw(Value),
    /// Not stored, or an unknown key
    Undefined,
}

impl SettingValue {
    /// JavaScript-style truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            SettingValue::Bool(b) => *b,
            SettingValue::Integer(n) => *n != 0,
            SettingValue::Text(s) => !s.is_empty(),
            SettingValue::Jobs(_) => true,
            SettingValue::Raw(v) => match v {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
            SettingValue::Undefined => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Integer(n) => Value::from(*n),
            SettingValue::Text(s) => Value::String(s.clone()),
            SettingValue::Jobs(jobs) => serde_json::to_value(jobs).unwrap_or(Value::Null),
            SettingValue::Raw(v) => v.clone(),
            SettingValue::Undefined => Value::Null,
        }
    }
}

/// What the toolbar button does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonAction {
    #[default]
    Window,
    AllWindows,
    Pinned,
    Unpinned,
}

impl ButtonAction {
    /// Unrecognised values fall back to reloading the current window
    pub fn from_setting(value: &str) -> Self {
        match value {
            "allWindows" => ButtonAction::AllWindows,
            "pinned" => ButtonAction::Pinned,
            "unpinned" => ButtonAction::Unpinned,
            _ => ButtonAction::Window,
        }
    }
}

/// Parse the leading integer of a string, like JavaScript's `parseInt(s, 10)`
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn coerce_integer(raw: Option<&Value>) -> u64 {
    let parsed = match raw {
        None | Some(Value::Null) => Some(0),
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_int_prefix(s),
        Some(_) => None,
    };
    parsed.unwrap_or(0).max(0) as u64
}

fn coerce_jobs(raw: Option<&Value>) -> Vec<ScheduledJob> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<ScheduledJob>(item.clone()) {
            Ok(job) => Some(job),
            Err(e) => {
                log::warn!("Skipping malformed scheduled job {}: {}", item, e);
                None
            }
        })
        .collect()
}

/// Apply a key's coercion to its stored value
pub fn coerce(key: SettingKey, raw: Option<&Value>) -> SettingValue {
    let raw = raw.filter(|v| !v.is_null());
    match key.coercion() {
        Coercion::ButtonAction => match raw {
            Some(Value::String(s)) => SettingValue::Text(s.clone()),
            Some(other) => SettingValue::Raw(other.clone()),
            None => SettingValue::Text("window".to_string()),
        },
        Coercion::DefaultTrue => SettingValue::Bool(raw.is_none_or(|v| *v == Value::Bool(true))),
        Coercion::Flag => SettingValue::Bool(raw == Some(&Value::Bool(true))),
        Coercion::Integer => SettingValue::Integer(coerce_integer(raw)),
        Coercion::Jobs => SettingValue::Jobs(coerce_jobs(raw)),
        Coercion::Verbatim => raw.map_or(SettingValue::Undefined, |v| SettingValue::Raw(v.clone())),
    }
}

/// Coerced values for one read
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<SettingKey, SettingValue>,
}

static UNDEFINED: SettingValue = SettingValue::Undefined;

impl Settings {
    pub fn from_raw(keys: &[SettingKey], raw: &Map<String, Value>) -> Self {
        Self {
            values: keys.iter().map(|k| (*k, coerce(*k, raw.get(k.as_str())))).collect(),
        }
    }

    /// Value of a key; `Undefined` if it was not requested
    pub fn get(&self, key: SettingKey) -> &SettingValue {
        self.values.get(&key).unwrap_or(&UNDEFINED)
    }

    pub fn flag(&self, key: SettingKey) -> bool {
        matches!(self.get(key), SettingValue::Bool(true))
    }

    pub fn is_truthy(&self, key: SettingKey) -> bool {
        self.get(key).is_truthy()
    }

    /// String value of a verbatim key
    pub fn text(&self, key: SettingKey) -> Option<&str> {
        match self.get(key) {
            SettingValue::Text(s) => Some(s),
            SettingValue::Raw(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Pause between tab reloads, in milliseconds
    pub fn reload_delay_ms(&self) -> u64 {
        match self.get(SettingKey::ReloadDelay) {
            SettingValue::Integer(n) => *n,
            _ => 0,
        }
    }

    pub fn scheduled_jobs(&self) -> &[ScheduledJob] {
        match self.get(SettingKey::ScheduledJobs) {
            SettingValue::Jobs(jobs) => jobs,
            _ => &[],
        }
    }

    pub fn into_scheduled_jobs(mut self) -> Vec<ScheduledJob> {
        match self.values.remove(&SettingKey::ScheduledJobs) {
            Some(SettingValue::Jobs(jobs)) => jobs,
            _ => Vec::new(),
        }
    }

    pub fn button_action(&self) -> ButtonAction {
        self.text(SettingKey::ButtonDefaultAction)
            .map(ButtonAction::from_setting)
            .unwrap_or_default()
    }
}

/// Read and coerce the given keys.
pub async fn get_setting(store: &dyn SettingsStore, keys: &[SettingKey]) -> Result<Settings> {
    let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
    let raw = store.get(&names).await?;
    Ok(Settings::from_raw(keys, &raw))
}

/// Read settings by name. Unknown names resolve to `Undefined`.
pub async fn get_setting_by_name(store: &dyn SettingsStore, names: &[&str]) -> Result<BTreeMap<String, SettingValue>> {
    let raw = store.get(names).await?;
    Ok(names
        .iter()
        .map(|name| {
            let value = match name.parse::<SettingKey>() {
                Ok(key) => coerce(key, raw.get(*name)),
                Err(_) => SettingValue::Undefined,
            };
            (name.to_string(), value)
        })
        .collect())
}

/// Persist the job list
pub async fn save_scheduled_jobs(store: &dyn SettingsStore, jobs: &[ScheduledJob]) -> Result<()> {
    let entries = jobs.iter().map(serde_json::to_value).collect::<serde_json::Result<Vec<_>>>()?;
    save_job_entries(store, entries).await
}

/// The stored job list exactly as written, malformed entries included.
///
/// Writes go through this rather than [`ScheduledJob`] so entries that do not
/// parse survive a rewrite.
pub async fn load_job_entries(store: &dyn SettingsStore) -> Result<Vec<Value>> {
    let name = SettingKey::ScheduledJobs.as_str();
    let mut raw = store.get(&[name]).await?;
    Ok(match raw.remove(name) {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    })
}

pub async fn save_job_entries(store: &dyn SettingsStore, entries: Vec<Value>) -> Result<()> {
    let mut update = Map::new();
    update.insert(SettingKey::ScheduledJobs.as_str().to_string(), Value::Array(entries));
    store.set(update).await
}

/// String id of a stored job entry
pub fn job_entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

/// Set `enabled` on an entry. Entries that are not objects are left alone.
pub fn set_job_entry_enabled(entry: &mut Value, enabled: bool) {
    if let Value::Object(fields) = entry {
        fields.insert("enabled".to_string(), Value::Bool(enabled));
    }
}

/// Only an explicit `false` disables a stored entry
pub fn job_entry_enabled(entry: &Value) -> bool {
    entry.get("enabled") != Some(&Value::Bool(false))
}
