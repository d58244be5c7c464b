//! Job alarm naming
//!
//! Alarm name = prefix + job id. The prefix separates job alarms from any
//! other alarm the host holds.

use crate::host::AlarmSpec;
use crate::settings::{MAX_ALARM_INTERVAL_MINUTES, MIN_ALARM_INTERVAL_MINUTES, ScheduledJob};

pub const JOB_ALARM_PREFIX: &str = "reload-job:";

pub fn job_alarm_name(job_id: &str) -> String {
    format!("{}{}", JOB_ALARM_PREFIX, job_id)
}

pub fn is_job_alarm(name: &str) -> bool {
    name.starts_with(JOB_ALARM_PREFIX)
}

/// Job id carried by a job alarm name
pub fn job_id_from_alarm(name: &str) -> Option<&str> {
    name.strip_prefix(JOB_ALARM_PREFIX)
}

/// Alarm for a job, or `None` if the job must not be scheduled.
///
/// Skipped: missing id or domain, explicitly disabled, interval missing,
/// not finite or below the floor, interval or start delay above the ceiling.
pub fn alarm_for(job: &ScheduledJob) -> Option<(String, AlarmSpec)> {
    let id = job.id()?;
    job.domain()?;
    if !job.is_enabled() {
        return None;
    }

    let interval = job.interval_minutes()?;
    if !interval.is_finite() || interval < MIN_ALARM_INTERVAL_MINUTES {
        return None;
    }

    let period = interval.max(MIN_ALARM_INTERVAL_MINUTES);
    let delay = job
        .start_after_minutes
        .filter(|d| d.is_finite())
        .unwrap_or(period)
        .max(MIN_ALARM_INTERVAL_MINUTES);
    if period > MAX_ALARM_INTERVAL_MINUTES || delay > MAX_ALARM_INTERVAL_MINUTES {
        log::debug!("Job {} interval {}m or delay {}m is too long to schedule", id, period, delay);
        return None;
    }

    Some((
        job_alarm_name(id),
        AlarmSpec {
            delay_in_minutes: delay,
            period_in_minutes: period,
        },
    ))
}
