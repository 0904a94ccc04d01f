//! Schedule window rules for delayed publishing.
//!
//! The platform rejects schedules further than ten days out and ignores
//! schedules closer than fifteen minutes; both are enforced locally so no
//! request is wasted.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Furthest a publish may be scheduled ahead (10 days).
pub const MAX_SCHEDULE_AHEAD_SECS: i64 = 864_000;

/// Schedules this close or closer are sent as immediate publishes (15 minutes).
pub const MIN_SCHEDULE_AHEAD_SECS: i64 = 900;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Cannot schedule a video more than 10 days ahead (requested {0})")]
    TooFar(DateTime<Utc>),
}

/// When a publish should go live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleWindow {
    Immediate,
    At(DateTime<Utc>),
}

impl ScheduleWindow {
    /// Resolve a requested schedule time against `now`.
    pub fn resolve(
        requested: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let Some(at) = requested else {
            return Ok(Self::Immediate);
        };

        let ahead = at - now;
        if ahead > Duration::seconds(MAX_SCHEDULE_AHEAD_SECS) {
            return Err(ScheduleError::TooFar(at));
        }
        if ahead > Duration::seconds(MIN_SCHEDULE_AHEAD_SECS) {
            Ok(Self::At(at))
        } else {
            Ok(Self::Immediate)
        }
    }

    /// Unix timestamp to send as `schedule_time`, if any.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            ScheduleWindow::Immediate => None,
            ScheduleWindow::At(at) => Some(at.timestamp()),
        }
    }
}
