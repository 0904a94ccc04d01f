//! Upload cursor and poll-time planning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Count of source videos already handled by the pipeline.
///
/// Only ever moves forward one video at a time, except when the watched
/// account deletes uploads and the live count drops below it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UploadCursor(pub u64);

impl UploadCursor {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Cursor after one more video has been handled.
    pub fn advanced(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Decide what a poll tick has to do given the account's live count.
    pub fn plan(&self, live_count: u64) -> CursorPlan {
        use std::cmp::Ordering;

        match live_count.cmp(&self.0) {
            Ordering::Greater => CursorPlan::Process {
                pending: live_count - self.0,
            },
            Ordering::Less => CursorPlan::Deleted {
                clamp_to: UploadCursor(live_count),
            },
            Ordering::Equal => CursorPlan::UpToDate,
        }
    }
}

impl fmt::Display for UploadCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UploadCursor {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for UploadCursor {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Outcome of comparing the cursor with the live upload count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPlan {
    /// Nothing new, nothing deleted.
    UpToDate,
    /// The account has fewer uploads than the cursor; clamp down.
    Deleted { clamp_to: UploadCursor },
    /// `pending` new uploads to process.
    Process { pending: u64 },
}

impl CursorPlan {
    /// Number of videos this plan will run through the pipeline.
    pub fn pending(&self) -> u64 {
        match self {
            CursorPlan::Process { pending } => *pending,
            _ => 0,
        }
    }

    /// Positions in a newest-first listing, in processing order.
    ///
    /// Processing is oldest-unseen-first, so for `pending = 3` this yields
    /// `2, 1, 0`.
    pub fn listing_indices(&self) -> impl Iterator<Item = usize> {
        (0..self.pending() as usize).rev()
    }
}
