//! Permission gate

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReloadError;

/// Optional capabilities the engine relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "tabs")]
    Tabs,
    #[serde(rename = "tabGroups")]
    TabGroups,
    #[serde(rename = "alarms")]
    Alarms,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::Tabs, Permission::TabGroups, Permission::Alarms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Tabs => "tabs",
            Permission::TabGroups => "tabGroups",
            Permission::Alarms => "alarms",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ReloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ReloadError::PermissionDenied(format!("unknown permission: {}", s)))
    }
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// True if every listed permission is granted
    async fn contains(&self, permissions: &[Permission]) -> bool;

    /// Ask for the listed permissions. True if all are granted afterwards.
    async fn request(&self, permissions: &[Permission]) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_parse() {
        assert_eq!("tabGroups".parse::<Permission>().unwrap(), Permission::TabGroups);
        assert_eq!("alarms".parse::<Permission>().unwrap(), Permission::Alarms);
        assert!("bookmarks".parse::<Permission>().is_err());
    }

    #[test]
    fn test_permission_serde_names() {
        let json = serde_json::to_string(&Permission::TabGroups).unwrap();
        assert_eq!(json, "\"tabGroups\"");
    }
}
