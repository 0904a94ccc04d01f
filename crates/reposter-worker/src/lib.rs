//! Repost worker.
//!
//! This crate provides:
//! - The poll loop and its upload-cursor state machine
//! - The per-video pipeline (retrieve, compose, publish, announce)
//! - The credential reminder timer
//! - Worker configuration, errors, logging and metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod poll;
pub mod reminder;

pub use config::{AccountSettings, SlideshowPolicy, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use logging::VideoLogger;
pub use pipeline::{ItemOutcome, Pipeline};
pub use poll::{PollSettings, Poller, TickReport};
pub use reminder::run_reminder;
