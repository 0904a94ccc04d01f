//! Operator notifications over a chat webhook.

pub mod error;
pub mod message;
pub mod webhook;

pub use error::{NotifyError, NotifyResult};
pub use message::{Attachment, Notification, CONTENT_LIMIT};
pub use webhook::{Notifier, WebhookNotifier};
