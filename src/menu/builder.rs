//! Menu tree construction
//!
//! Pure: takes the resolved inputs and returns the entries in creation order.

use crate::host::{MenuItem, TabGroup};
use crate::settings::{ScheduledJob, SettingKey};

use super::action::{GROUPED_PARENT_ID, JOB_TOGGLE_PREFIX, JOBS_PARENT_ID};

const CACHE_BYPASSED: &str = " (cache bypassed)";
const MAX_DOMAIN_CHARS: usize = 30;
const TRUNCATED_DOMAIN_CHARS: usize = 27;

/// Reload entries in menu order
pub const RELOAD_ENTRIES: [(SettingKey, &str); 8] = [
    (SettingKey::ReloadWindow, "Reload this window"),
    (SettingKey::ReloadAllWindows, "Reload all windows"),
    (SettingKey::ReloadPinnedOnly, "Reload pinned tabs"),
    (SettingKey::ReloadUnpinnedOnly, "Reload unpinned tabs"),
    (SettingKey::ReloadAllLeft, "Reload all tabs to the left"),
    (SettingKey::ReloadAllRight, "Reload all tabs to the right"),
    (SettingKey::ReloadAllMatched, "Reload all tabs with matched urls"),
    (SettingKey::ReloadSkipMatched, "Reload all tabs except matched urls"),
];

/// Everything a rebuild depends on
#[derive(Debug, Clone, Default)]
pub struct MenuInput {
    pub bypass_cache: bool,
    /// Reload entries switched on
    pub reload_modes: Vec<SettingKey>,
    /// Groups of the focused window; empty hides the grouped entry
    pub groups: Vec<TabGroup>,
    pub jobs: Vec<ScheduledJob>,
}

fn display_domain(domain: &str) -> String {
    if domain.chars().count() > MAX_DOMAIN_CHARS {
        let head: String = domain.chars().take(TRUNCATED_DOMAIN_CHARS).collect();
        format!("{}...", head)
    } else {
        domain.to_string()
    }
}

fn job_items(jobs: &[ScheduledJob]) -> Vec<MenuItem> {
    let active = jobs.iter().filter(|job| job.is_enabled()).count();

    let mut items = vec![
        MenuItem::separator("scheduledJobsSeparator"),
        MenuItem::normal(JOBS_PARENT_ID, format!("Scheduled jobs ({}/{} active)", active, jobs.len())),
        MenuItem::normal("jobsStartAll", "▶ Start all jobs").under(JOBS_PARENT_ID),
        MenuItem::normal("jobsStopAll", "⏸ Stop all jobs").under(JOBS_PARENT_ID),
        MenuItem::separator("jobsSeparator1").under(JOBS_PARENT_ID),
    ];

    for job in jobs {
        let Some(id) = job.id() else {
            continue;
        };
        let enabled = job.is_enabled();
        let title = format!(
            "{} ({})",
            display_domain(job.domain().unwrap_or_default()),
            if enabled { "Active" } else { "Paused" }
        );
        items.push(MenuItem::checkbox(format!("{}{}", JOB_TOGGLE_PREFIX, id), title, enabled).under(JOBS_PARENT_ID));
    }

    items.push(MenuItem::separator("jobsSeparator2").under(JOBS_PARENT_ID));
    items.push(MenuItem::normal("jobsManage", "⚙ Manage jobs").under(JOBS_PARENT_ID));
    items
}

/// Build the full menu
pub fn build_menu(input: &MenuInput) -> Vec<MenuItem> {
    let suffix = if input.bypass_cache { CACHE_BYPASSED } else { "" };
    let mut items: Vec<MenuItem> = RELOAD_ENTRIES
        .iter()
        .filter(|(key, _)| input.reload_modes.contains(key))
        .map(|(key, title)| MenuItem::normal(key.as_str(), format!("{}{}", title, suffix)))
        .collect();

    if !input.groups.is_empty() {
        items.push(MenuItem::normal(GROUPED_PARENT_ID, format!("Reload tab groups{}", suffix)));
        for group in &input.groups {
            let title = format!(
                "{} {}",
                group.color.glyph(),
                group.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Unnamed")
            );
            items.push(MenuItem::normal(group.id.to_string(), title).under(GROUPED_PARENT_ID));
        }
    }

    if !input.jobs.is_empty() {
        items.extend(job_items(&input.jobs));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{GroupColor, MenuItemKind};
    use serde_json::json;

    fn ids(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    fn job(value: serde_json::Value) -> ScheduledJob {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_input_builds_empty_menu() {
        assert!(build_menu(&MenuInput::default()).is_empty());
    }

    #[test]
    fn test_reload_entries_follow_table_order() {
        let input = MenuInput {
            reload_modes: vec![SettingKey::ReloadAllRight, SettingKey::ReloadWindow],
            ..Default::default()
        };
        let items = build_menu(&input);
        assert_eq!(ids(&items), vec!["reloadWindow", "reloadAllRight"]);
        assert_eq!(items[0].title.as_deref(), Some("Reload this window"));
    }

    #[test]
    fn test_cache_bypass_suffix() {
        let input = MenuInput {
            bypass_cache: true,
            reload_modes: vec![SettingKey::ReloadPinnedOnly],
            groups: vec![TabGroup {
                id: 5,
                window_id: 1,
                title: None,
                color: GroupColor::Blue,
            }],
            ..Default::default()
        };
        let items = build_menu(&input);
        assert_eq!(items[0].title.as_deref(), Some("Reload pinned tabs (cache bypassed)"));
        assert_eq!(items[1].title.as_deref(), Some("Reload tab groups (cache bypassed)"));
    }

    #[test]
    fn test_group_children() {
        let input = MenuInput {
            groups: vec![
                TabGroup {
                    id: 11,
                    window_id: 1,
                    title: Some("Work".into()),
                    color: GroupColor::Red,
                },
                TabGroup {
                    id: 12,
                    window_id: 1,
                    title: Some(String::new()),
                    color: GroupColor::Green,
                },
            ],
            ..Default::default()
        };
        let items = build_menu(&input);
        assert_eq!(ids(&items), vec!["reloadGroupedOnly", "11", "12"]);
        assert_eq!(items[1].title.as_deref(), Some("🟥 Work"));
        assert_eq!(items[2].title.as_deref(), Some("🟩 Unnamed"));
        assert_eq!(items[2].parent_id.as_deref(), Some(GROUPED_PARENT_ID));
    }

    #[test]
    fn test_job_section() {
        let input = MenuInput {
            jobs: vec![
                job(json!({"id": "a", "domain": "example.com", "enabled": true})),
                job(json!({"id": "b", "domain": "this-is-a-very-long-domain-name.example.org", "enabled": false})),
            ],
            ..Default::default()
        };
        let items = build_menu(&input);
        assert_eq!(
            ids(&items),
            vec![
                "scheduledJobsSeparator",
                "scheduledJobs",
                "jobsStartAll",
                "jobsStopAll",
                "jobsSeparator1",
                "jobToggle:a",
                "jobToggle:b",
                "jobsSeparator2",
                "jobsManage",
            ]
        );
        assert_eq!(items[0].kind, MenuItemKind::Separator);
        assert_eq!(items[1].title.as_deref(), Some("Scheduled jobs (1/2 active)"));

        let a = &items[5];
        assert_eq!(a.kind, MenuItemKind::Checkbox);
        assert_eq!(a.checked, Some(true));
        assert_eq!(a.title.as_deref(), Some("example.com (Active)"));

        let b = &items[6];
        assert_eq!(b.checked, Some(false));
        assert_eq!(b.title.as_deref(), Some("this-is-a-very-long-domain-... (Paused)"));
    }

    #[test]
    fn test_domain_truncation_boundary() {
        let exact = "a".repeat(30);
        assert_eq!(display_domain(&exact), exact);
        let long = "b".repeat(31);
        assert_eq!(display_domain(&long), format!("{}...", "b".repeat(27)));
    }

    #[test]
    fn test_jobs_without_enabled_count_as_active() {
        let input = MenuInput {
            jobs: vec![job(json!({"id": "a", "domain": "x.com"}))],
            ..Default::default()
        };
        let items = build_menu(&input);
        assert_eq!(items[1].title.as_deref(), Some("Scheduled jobs (1/1 active)"));
    }
}
