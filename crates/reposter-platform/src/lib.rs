//! Client for the short-video platform's private web API.
//!
//! This crate provides:
//! - The session uploader (`PlatformClient`): project create, chunked ingest
//!   upload, hashtag/mention resolution and the signed publish call
//! - The source feed (`SourceFeed`): account stats and newest-first listing
//! - `X-Bogus` request signing and AWS SigV4 for the upload control plane

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod retry;
pub mod signing;
pub mod sigv4;
pub mod tags;

pub use client::{PlatformClient, PublishReceipt, TiktokClient};
pub use config::PlatformConfig;
pub use error::{PlatformError, PlatformResult, PublishStep};
pub use feed::{SourceFeed, TiktokFeed};
pub use retry::RetryConfig;
pub use signing::XBogus;
pub use tags::{Caption, TextExtra};
