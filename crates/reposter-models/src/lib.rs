//! Shared data models for the reposter pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - The upload cursor and its poll-time plan
//! - Source video descriptors fetched from the watched account
//! - The session credential used against the platform's web API
//! - Publish jobs and the schedule window rules

pub mod credential;
pub mod cursor;
pub mod publish;
pub mod schedule;
pub mod video;

// Re-export common types
pub use credential::SessionCredential;
pub use cursor::{CursorPlan, UploadCursor};
pub use publish::{PublishJob, CAPTION_LIMIT};
pub use schedule::{ScheduleError, ScheduleWindow};
pub use video::{SourceVideo, VideoId};
