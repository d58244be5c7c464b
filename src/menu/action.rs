//! Menu entry ids and the actions behind them

use crate::host::MenuClick;
use crate::reload::ReloadOptions;

pub const GROUPED_PARENT_ID: &str = "reloadGroupedOnly";
pub const JOBS_PARENT_ID: &str = "scheduledJobs";
pub const JOB_TOGGLE_PREFIX: &str = "jobToggle:";

/// Everything a menu click can do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    ReloadWindow,
    ReloadAllWindows,
    ReloadPinnedOnly,
    ReloadUnpinnedOnly,
    ReloadAllLeft,
    ReloadAllRight,
    ReloadAllMatched,
    ReloadSkipMatched,
    /// Reload one tab group of the clicked window
    ReloadGroup(i64),
    JobsStartAll,
    JobsStopAll,
    JobsManage,
    ToggleJob(String),
}

impl MenuAction {
    /// Resolve a click. Unknown ids resolve to `None`.
    pub fn from_click(click: &MenuClick) -> Option<Self> {
        let id = click.menu_item_id.as_str();

        if let Some(job_id) = id.strip_prefix(JOB_TOGGLE_PREFIX) {
            return Some(MenuAction::ToggleJob(job_id.to_string()));
        }

        if click.parent_menu_item_id.as_deref() == Some(GROUPED_PARENT_ID) {
            return id.parse().ok().map(MenuAction::ReloadGroup);
        }

        let action = match id {
            "reloadWindow" => MenuAction::ReloadWindow,
            "reloadAllWindows" => MenuAction::ReloadAllWindows,
            "reloadPinnedOnly" => MenuAction::ReloadPinnedOnly,
            "reloadUnpinnedOnly" => MenuAction::ReloadUnpinnedOnly,
            "reloadAllLeft" => MenuAction::ReloadAllLeft,
            "reloadAllRight" => MenuAction::ReloadAllRight,
            "reloadAllMatched" => MenuAction::ReloadAllMatched,
            "reloadSkipMatched" => MenuAction::ReloadSkipMatched,
            "jobsStartAll" => MenuAction::JobsStartAll,
            "jobsStopAll" => MenuAction::JobsStopAll,
            "jobsManage" => MenuAction::JobsManage,
            _ => return None,
        };
        Some(action)
    }

    /// Id of the menu entry that triggers this action
    pub fn menu_id(&self) -> String {
        match self {
            MenuAction::ReloadWindow => "reloadWindow".to_string(),
            MenuAction::ReloadAllWindows => "reloadAllWindows".to_string(),
            MenuAction::ReloadPinnedOnly => "reloadPinnedOnly".to_string(),
            MenuAction::ReloadUnpinnedOnly => "reloadUnpinnedOnly".to_string(),
            MenuAction::ReloadAllLeft => "reloadAllLeft".to_string(),
            MenuAction::ReloadAllRight => "reloadAllRight".to_string(),
            MenuAction::ReloadAllMatched => "reloadAllMatched".to_string(),
            MenuAction::ReloadSkipMatched => "reloadSkipMatched".to_string(),
            MenuAction::ReloadGroup(group_id) => group_id.to_string(),
            MenuAction::JobsStartAll => "jobsStartAll".to_string(),
            MenuAction::JobsStopAll => "jobsStopAll".to_string(),
            MenuAction::JobsManage => "jobsManage".to_string(),
            MenuAction::ToggleJob(job_id) => format!("{}{}", JOB_TOGGLE_PREFIX, job_id),
        }
    }

    /// Scan options for actions that reload the clicked window
    pub fn window_options(&self) -> Option<ReloadOptions> {
        match self {
            MenuAction::ReloadWindow => Some(ReloadOptions::default()),
            MenuAction::ReloadPinnedOnly => Some(ReloadOptions::pinned_only()),
            MenuAction::ReloadUnpinnedOnly => Some(ReloadOptions::unpinned_only()),
            MenuAction::ReloadAllLeft => Some(ReloadOptions::all_left()),
            MenuAction::ReloadAllRight => Some(ReloadOptions::all_right()),
            MenuAction::ReloadAllMatched => Some(ReloadOptions::all_matched()),
            MenuAction::ReloadSkipMatched => Some(ReloadOptions::skip_matched()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_ids() {
        let actions = [
            MenuAction::ReloadWindow,
            MenuAction::ReloadAllWindows,
            MenuAction::ReloadPinnedOnly,
            MenuAction::ReloadUnpinnedOnly,
            MenuAction::ReloadAllLeft,
            MenuAction::ReloadAllRight,
            MenuAction::ReloadAllMatched,
            MenuAction::ReloadSkipMatched,
            MenuAction::JobsStartAll,
            MenuAction::JobsStopAll,
            MenuAction::JobsManage,
        ];
        for action in actions {
            let click = MenuClick::new(action.menu_id());
            assert_eq!(MenuAction::from_click(&click), Some(action));
        }
    }

    #[test]
    fn test_job_toggle_prefix() {
        let click = MenuClick::new("jobToggle:abc-123");
        assert_eq!(MenuAction::from_click(&click), Some(MenuAction::ToggleJob("abc-123".into())));

        // Prefix wins over the grouped parent
        let click = MenuClick::new("jobToggle:7").with_parent(GROUPED_PARENT_ID);
        assert_eq!(MenuAction::from_click(&click), Some(MenuAction::ToggleJob("7".into())));
    }

    #[test]
    fn test_group_child() {
        let click = MenuClick::new("42").with_parent(GROUPED_PARENT_ID);
        assert_eq!(MenuAction::from_click(&click), Some(MenuAction::ReloadGroup(42)));

        let click = MenuClick::new("not-a-number").with_parent(GROUPED_PARENT_ID);
        assert_eq!(MenuAction::from_click(&click), None);

        // A bare number without the parent is not a group
        assert_eq!(MenuAction::from_click(&MenuClick::new("42")), None);
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(MenuAction::from_click(&MenuClick::new("closeTabs")), None);
        assert_eq!(MenuAction::from_click(&MenuClick::new("scheduledJobs")), None);
    }

    #[test]
    fn test_window_options() {
        assert_eq!(MenuAction::ReloadAllLeft.window_options(), Some(ReloadOptions::all_left()));
        assert_eq!(MenuAction::ReloadAllWindows.window_options(), None);
        assert_eq!(MenuAction::ReloadGroup(1).window_options(), None);
    }
}
