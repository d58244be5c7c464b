//! Context menu synchronization
//!
//! [`MenuSynchronizer::update_context_menu`] may be called from any event
//! handler at any rate. Rebuilds run behind a [`CoalescingLatch`], so bursts
//! of requests collapse into at most one trailing rebuild.

mod action;
mod builder;
mod latch;
mod sync;

pub use action::{GROUPED_PARENT_ID, JOB_TOGGLE_PREFIX, JOBS_PARENT_ID, MenuAction};
pub use builder::{MenuInput, RELOAD_ENTRIES, build_menu};
pub use latch::CoalescingLatch;
pub use sync::MenuSynchronizer;
