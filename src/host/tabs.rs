//! Tab, window and tab-group provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A browser tab as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: i64,
    #[serde(default)]
    pub window_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    /// Only visible with the `tabs` permission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub audible: bool,
}

impl Tab {
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id: 0,
            group_id: None,
            url: Some(url.into()),
            active: false,
            pinned: false,
            audible: false,
        }
    }

    pub fn in_window(mut self, window_id: i64) -> Self {
        self.window_id = window_id;
        self
    }

    pub fn in_group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn audible(mut self) -> Self {
        self.audible = true;
        self
    }

    /// URL or empty string
    pub fn url_str(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub id: i64,
    #[serde(default)]
    pub focused: bool,
}

/// Tab group colors offered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    /// Glyph shown in front of a group's menu entry
    pub fn glyph(self) -> &'static str {
        match self {
            GroupColor::Grey => "⬛",
            GroupColor::Blue => "🟦",
            GroupColor::Red => "🟥",
            GroupColor::Yellow => "🟨",
            GroupColor::Green => "🟩",
            GroupColor::Pink => "⬜",
            GroupColor::Purple => "🟪",
            GroupColor::Cyan => "🟦",
            GroupColor::Orange => "🟧",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: i64,
    #[serde(default)]
    pub window_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub color: GroupColor,
}

/// Tab query filter. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabQuery {
    pub window_id: Option<i64>,
    pub group_id: Option<i64>,
}

impl TabQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn window(window_id: i64) -> Self {
        Self {
            window_id: Some(window_id),
            group_id: None,
        }
    }

    pub fn group(window_id: i64, group_id: i64) -> Self {
        Self {
            window_id: Some(window_id),
            group_id: Some(group_id),
        }
    }

    pub fn matches(&self, tab: &Tab) -> bool {
        self.window_id.is_none_or(|w| tab.window_id == w) && self.group_id.is_none_or(|g| tab.group_id == Some(g))
    }
}

/// Serialized window state, as loaded from a snapshot file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub id: i64,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default)]
    pub groups: Vec<TabGroup>,
}

/// All windows of a browser session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabSnapshot {
    #[serde(default)]
    pub windows: Vec<WindowSnapshot>,
}

/// Tab/window provider.
///
/// `query_tabs` must return tabs in window tab order; the positional reload
/// modes depend on it.
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<Tab>>;

    async fn windows(&self) -> Result<Vec<Window>>;

    /// The window the user last interacted with
    async fn current_window(&self) -> Result<Window>;

    async fn tab_groups(&self, window_id: i64) -> Result<Vec<TabGroup>>;

    async fn reload(&self, tab_id: i64, bypass_cache: bool) -> Result<()>;
}
