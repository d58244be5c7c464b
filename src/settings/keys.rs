//! Setting keys and their coercion rules

use std::fmt;
use std::str::FromStr;

use crate::host::Permission;

/// Known setting keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
    ButtonDefaultAction,
    ReloadWindow,
    ReloadAllWindows,
    ReloadPinnedOnly,
    ReloadUnpinnedOnly,
    ReloadGroupedOnly,
    ReloadAllLeft,
    ReloadAllRight,
    ReloadAllMatched,
    ReloadSkipMatched,
    SkipMatchedTabs,
    BypassCache,
    ExcludeActiveTab,
    ExcludeAudioTabs,
    ReloadDelay,
    ScheduledJobs,
    Version,
}

/// How a stored value is turned into a typed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Stored value or `"window"`
    ButtonAction,
    /// `true` unless stored and not exactly `true`
    DefaultTrue,
    /// Exactly `true`, otherwise `false`
    Flag,
    /// Non-negative integer parsed from number or string, default 0
    Integer,
    /// Array of jobs, anything else is empty
    Jobs,
    /// Returned as stored
    Verbatim,
}

impl SettingKey {
    pub const ALL: [SettingKey; 17] = [
        SettingKey::ButtonDefaultAction,
        SettingKey::ReloadWindow,
        SettingKey::ReloadAllWindows,
        SettingKey::ReloadPinnedOnly,
        SettingKey::ReloadUnpinnedOnly,
        SettingKey::ReloadGroupedOnly,
        SettingKey::ReloadAllLeft,
        SettingKey::ReloadAllRight,
        SettingKey::ReloadAllMatched,
        SettingKey::ReloadSkipMatched,
        SettingKey::SkipMatchedTabs,
        SettingKey::BypassCache,
        SettingKey::ExcludeActiveTab,
        SettingKey::ExcludeAudioTabs,
        SettingKey::ReloadDelay,
        SettingKey::ScheduledJobs,
        SettingKey::Version,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ButtonDefaultAction => "buttonDefaultAction",
            SettingKey::ReloadWindow => "reloadWindow",
            SettingKey::ReloadAllWindows => "reloadAllWindows",
            SettingKey::ReloadPinnedOnly => "reloadPinnedOnly",
            SettingKey::ReloadUnpinnedOnly => "reloadUnpinnedOnly",
            SettingKey::ReloadGroupedOnly => "reloadGroupedOnly",
            SettingKey::ReloadAllLeft => "reloadAllLeft",
            SettingKey::ReloadAllRight => "reloadAllRight",
            SettingKey::ReloadAllMatched => "reloadAllMatched",
            SettingKey::ReloadSkipMatched => "reloadSkipMatched",
            SettingKey::SkipMatchedTabs => "skipMatchedTabs",
            SettingKey::BypassCache => "bypassCache",
            SettingKey::ExcludeActiveTab => "excludeActiveTab",
            SettingKey::ExcludeAudioTabs => "excludeAudioTabs",
            SettingKey::ReloadDelay => "reloadDelay",
            SettingKey::ScheduledJobs => "scheduledJobs",
            SettingKey::Version => "version",
        }
    }

    pub fn coercion(&self) -> Coercion {
        match self {
            SettingKey::ButtonDefaultAction => Coercion::ButtonAction,
            SettingKey::ReloadWindow => Coercion::DefaultTrue,
            SettingKey::ReloadAllWindows
            | SettingKey::ReloadPinnedOnly
            | SettingKey::ReloadUnpinnedOnly
            | SettingKey::ReloadGroupedOnly
            | SettingKey::ReloadAllLeft
            | SettingKey::ReloadAllRight
            | SettingKey::BypassCache
            | SettingKey::ExcludeActiveTab
            | SettingKey::ExcludeAudioTabs => Coercion::Flag,
            SettingKey::ReloadDelay => Coercion::Integer,
            SettingKey::ScheduledJobs => Coercion::Jobs,
            SettingKey::ReloadAllMatched | SettingKey::ReloadSkipMatched | SettingKey::SkipMatchedTabs | SettingKey::Version => {
                Coercion::Verbatim
            }
        }
    }

    /// Capabilities a setting needs before it has any effect
    pub fn required_permissions(&self) -> &'static [Permission] {
        match self {
            SettingKey::ReloadGroupedOnly => &[Permission::TabGroups],
            SettingKey::ReloadAllMatched | SettingKey::ReloadSkipMatched | SettingKey::SkipMatchedTabs => &[Permission::Tabs],
            _ => &[],
        }
    }

    /// Changing this key affects the context menu
    pub fn affects_menu(name: &str) -> bool {
        name.starts_with("reload") || name == SettingKey::BypassCache.as_str()
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown setting: {}", s))
    }
}
