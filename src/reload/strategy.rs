//! Per-tab reload decisions
//!
//! A scan visits the tabs of one source in host order. Each step takes the
//! previous [`ScanState`] and a tab and returns the next state plus a
//! [`Decision`]. The positional modes are the only ones that read the state.

use crate::host::Tab;
use crate::matching::matches_any_pattern;

/// Which subset of a tab source to reload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadOptions {
    pub pinned_only: bool,
    pub unpinned_only: bool,
    pub all_left: bool,
    pub all_right: bool,
    pub all_matched: bool,
    pub skip_matched: bool,
}

impl ReloadOptions {
    pub fn pinned_only() -> Self {
        Self {
            pinned_only: true,
            ..Self::default()
        }
    }

    pub fn unpinned_only() -> Self {
        Self {
            unpinned_only: true,
            ..Self::default()
        }
    }

    pub fn all_left() -> Self {
        Self {
            all_left: true,
            ..Self::default()
        }
    }

    pub fn all_right() -> Self {
        Self {
            all_right: true,
            ..Self::default()
        }
    }

    pub fn all_matched() -> Self {
        Self {
            all_matched: true,
            ..Self::default()
        }
    }

    pub fn skip_matched() -> Self {
        Self {
            skip_matched: true,
            ..Self::default()
        }
    }

    /// Whether a URL filter takes part in this scan
    pub fn uses_patterns(&self) -> bool {
        self.all_matched || self.skip_matched
    }
}

/// URL allow/deny filter. Allow wins when both were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlFilter {
    /// Reload only matching tabs
    Allow(String),
    /// Reload everything except matching tabs
    Deny(String),
}

impl UrlFilter {
    fn vetoes(&self, url: &str) -> bool {
        match self {
            UrlFilter::Allow(list) => !matches_any_pattern(url, list),
            UrlFilter::Deny(list) => matches_any_pattern(url, list),
        }
    }
}

/// Settings resolved once per scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanContext {
    pub exclude_active_tab: bool,
    pub exclude_audio_tabs: bool,
    pub bypass_cache: bool,
    /// `None` when no pattern mode is active or the `tabs` permission is missing
    pub url_filter: Option<UrlFilter>,
    pub delay_ms: u64,
}

/// Positional state carried from one tab to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Current tab is vetoed by the positional mode
    pub stop: bool,
    /// Active tab has been passed
    pub reset: bool,
}

/// Why a tab was not reloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Veto {
    ActiveTab,
    Audible,
    NotPinned,
    Pinned,
    /// Left mode: the active tab or anything after it
    NotLeftOfActive,
    /// Right mode: the active tab or anything before it
    NotRightOfActive,
    UrlFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Reload,
    Skip(Veto),
}

impl Decision {
    pub fn is_reload(&self) -> bool {
        matches!(self, Decision::Reload)
    }
}

/// Positional step for "left of the active tab"
fn left_step(state: ScanState, tab: &Tab) -> ScanState {
    ScanState {
        stop: state.stop || tab.active,
        ..state
    }
}

/// Positional step for "right of the active tab".
///
/// Everything up to and including the active tab is vetoed; once the active
/// tab has been passed, `stop` stays clear.
fn right_step(state: ScanState, tab: &Tab) -> ScanState {
    if state.reset {
        return ScanState { stop: false, reset: true };
    }
    ScanState {
        stop: true,
        reset: tab.active,
    }
}

/// Evaluate every predicate for one tab.
///
/// All predicates run in a fixed order; the first veto is reported but the
/// state still advances through every positional mode.
pub fn decide(ctx: &ScanContext, options: &ReloadOptions, state: ScanState, tab: &Tab) -> (ScanState, Decision) {
    let mut veto = None;
    let mut record = |v: Veto| {
        veto.get_or_insert(v);
    };

    if tab.active && ctx.exclude_active_tab {
        record(Veto::ActiveTab);
    }
    if tab.audible && ctx.exclude_audio_tabs {
        record(Veto::Audible);
    }
    if options.pinned_only && !tab.pinned {
        record(Veto::NotPinned);
    }
    if options.unpinned_only && tab.pinned {
        record(Veto::Pinned);
    }

    let mut next = state;
    if options.all_left {
        next = left_step(next, tab);
        if next.stop {
            record(Veto::NotLeftOfActive);
        }
    }
    if options.all_right {
        next = right_step(next, tab);
        if next.stop {
            record(Veto::NotRightOfActive);
        }
    }

    if ctx.url_filter.as_ref().is_some_and(|f| f.vetoes(tab.url_str())) {
        record(Veto::UrlFilter);
    }

    let decision = veto.map_or(Decision::Reload, Decision::Skip);
    (next, decision)
}

/// Decide every tab of a scan, in order.
pub fn plan(ctx: &ScanContext, options: &ReloadOptions, tabs: &[Tab]) -> Vec<Decision> {
    tabs.iter()
        .scan(ScanState::default(), |state, tab| {
            let (next, decision) = decide(ctx, options, *state, tab);
            *state = next;
            Some(decision)
        })
        .collect()
}
