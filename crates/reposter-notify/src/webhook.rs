//! Webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{NotifyError, NotifyResult};
use crate::message::Notification;

/// Posts notifications somewhere an operator will see them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()>;
}

#[derive(Serialize)]
struct Payload<'a> {
    content: &'a str,
}

/// Chat webhook notifier.
///
/// Text-only messages are sent as JSON. Messages with a file are sent as
/// multipart with the JSON in `payload_json` and the file in `files[0]`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> NotifyResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    async fn request(&self, notification: &Notification) -> NotifyResult<reqwest::RequestBuilder> {
        let payload = Payload {
            content: &notification.content,
        };

        let Some(attachment) = &notification.attachment else {
            return Ok(self.http.post(&self.url).json(&payload));
        };

        let bytes = tokio::fs::read(&attachment.path).await?;
        debug!(
            file = %attachment.path.display(),
            bytes = bytes.len(),
            "Attaching file to notification"
        );
        let file = Part::bytes(bytes)
            .file_name(attachment.filename.clone())
            .mime_str("video/mp4")?;
        let form = Form::new()
            .text("payload_json", serde_json::to_string(&payload)?)
            .part("files[0]", file);

        Ok(self.http.post(&self.url).multipart(form))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()> {
        let response = self.request(notification).await?.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Webhook rejected notification");
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
