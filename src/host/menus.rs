//! Context menu provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuItemKind {
    Normal,
    Checkbox,
    Radio,
    Separator,
}

/// Where the menu shows up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuContext {
    All,
    Page,
    Action,
}

/// Description of one menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MenuItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    pub contexts: Vec<MenuContext>,
}

impl MenuItem {
    pub fn normal(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            kind: MenuItemKind::Normal,
            title: Some(title.into()),
            checked: None,
            contexts: vec![MenuContext::All],
        }
    }

    pub fn separator(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            kind: MenuItemKind::Separator,
            title: None,
            checked: None,
            contexts: vec![MenuContext::All],
        }
    }

    pub fn checkbox(id: impl Into<String>, title: impl Into<String>, checked: bool) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            kind: MenuItemKind::Checkbox,
            title: Some(title.into()),
            checked: Some(checked),
            contexts: vec![MenuContext::All],
        }
    }

    pub fn under(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// A click on a menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuClick {
    pub menu_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_menu_item_id: Option<String>,
    /// Window of the tab the menu was opened on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
}

impl MenuClick {
    pub fn new(menu_item_id: impl Into<String>) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            parent_menu_item_id: None,
            window_id: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_menu_item_id = Some(parent.into());
        self
    }

    pub fn in_window(mut self, window_id: i64) -> Self {
        self.window_id = Some(window_id);
        self
    }
}

#[async_trait]
pub trait MenuHost: Send + Sync {
    async fn remove_all(&self) -> Result<()>;

    async fn create(&self, item: MenuItem) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_item_serializes_type_field() {
        let item = MenuItem::separator("sep").under("root");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "separator");
        assert_eq!(json["parentId"], "root");
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_checkbox_item() {
        let item = MenuItem::checkbox("jobToggle:1", "a.com (Active)", true);
        assert_eq!(item.kind, MenuItemKind::Checkbox);
        assert_eq!(item.checked, Some(true));
    }
}
