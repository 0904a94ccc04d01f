//! Session uploader: publishes a composed video through the web-upload flow.

use async_trait::async_trait;
use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};

use reposter_models::{PublishJob, ScheduleWindow, SessionCredential};

use crate::config::{PlatformConfig, WEB_AID};
use crate::error::{PlatformError, PlatformResult, PublishStep};
use crate::http::{parse_json, send, session_client};
use crate::ingest::Ingest;
use crate::signing::XBogus;
use crate::tags::{resolve_caption, TextExtra};

/// Length of the client-generated creation id.
pub const CREATION_ID_LEN: usize = 21;

/// Query every publish call is signed over.
const PUBLISH_QUERY: &str = "app_name=tiktok_web&channel=tiktok_web&device_platform=web&aid=1988";

/// What a successful publish produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub video_id: String,
    pub project_id: String,
    pub schedule: ScheduleWindow,
}

/// Publishes composed videos to the platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn publish(
        &self,
        credential: &SessionCredential,
        job: &PublishJob,
    ) -> PlatformResult<PublishReceipt>;
}

#[derive(Debug, Serialize)]
struct PublishPayload<'a> {
    upload_param: UploadParam<'a>,
    project_id: &'a str,
    draft: &'static str,
    single_upload_param: Vec<Value>,
    video_id: &'a str,
    creation_id: &'a str,
}

#[derive(Debug, Serialize)]
struct UploadParam<'a> {
    video_param: VideoParam<'a>,
    visibility_type: u8,
    allow_comment: u8,
    allow_duet: u8,
    allow_stitch: u8,
    sound_exemption: u8,
    geofencing_regions: Vec<Value>,
    creation_id: &'a str,
    is_uploaded_in_batch: bool,
    is_enable_playlist: bool,
    is_added_to_playlist: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule_time: Option<i64>,
}

#[derive(Debug, Serialize)]
struct VideoParam<'a> {
    text: &'a str,
    text_extra: &'a [TextExtra],
    poster_delay: u8,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    status_code: i64,
}

/// Project handle returned by project-create.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Project {
    creation_id: String,
    project_id: String,
}

/// [`PlatformClient`] speaking the private web-upload protocol.
#[derive(Debug, Clone)]
pub struct TiktokClient {
    config: PlatformConfig,
    signer: XBogus,
}

impl TiktokClient {
    pub fn new(config: PlatformConfig) -> Self {
        let signer = XBogus::new(&config.user_agent);
        Self { config, signer }
    }

    /// Create client from environment variables.
    pub fn from_env() -> PlatformResult<Self> {
        Ok(Self::new(PlatformConfig::from_env()?))
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    async fn create_project(&self, http: &reqwest::Client) -> PlatformResult<Project> {
        let creation_id = new_creation_id();
        let url = format!(
            "{}/api/v1/web/project/create/?creation_id={}&type=1&aid={}",
            self.config.web_base, creation_id, WEB_AID
        );
        let request = http
            .post(url)
            .header("X-Secsdk-Csrf-Request", "1")
            .header("X-Secsdk-Csrf-Version", "1.2.8");

        let body = send(PublishStep::ProjectCreate, request).await?.text().await?;
        let value: Value = parse_json(PublishStep::ProjectCreate, &body)?;
        parse_project(&value)
    }

    async fn post(
        &self,
        http: &reqwest::Client,
        body: String,
    ) -> PlatformResult<PublishResponse> {
        let signature = self.signer.sign(PUBLISH_QUERY, &body);
        let url = format!(
            "{}/api/v1/web/project/post/?{}&X-Bogus={}",
            self.config.web_base,
            PUBLISH_QUERY,
            urlencoding::encode(&signature)
        );
        let request = http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Origin", &self.config.www_base)
            .header("Referer", format!("{}/", self.config.www_base))
            .body(body);

        let text = send(PublishStep::Publish, request).await?.text().await?;
        let response: PublishResponse = parse_json(PublishStep::Publish, &text)?;
        if response.status_code != 0 {
            return Err(PlatformError::PublishRejected {
                status_code: response.status_code,
                body: text,
            });
        }
        Ok(response)
    }

    async fn publish_inner(
        &self,
        credential: &SessionCredential,
        job: &PublishJob,
    ) -> PlatformResult<PublishReceipt> {
        let schedule = ScheduleWindow::resolve(job.schedule, Utc::now())?;
        let http = session_client(&self.config, credential)?;

        send(
            PublishStep::UploadPage,
            http.get(format!("{}/upload/", self.config.web_base)),
        )
        .await?;

        let project = self.create_project(&http).await?;

        send(
            PublishStep::AccountInfo,
            http.get(format!("{}/passport/web/account/info/", self.config.web_base)),
        )
        .await?;

        let video_id = Ingest::new(&http, &self.config)
            .upload(&job.media_path)
            .await?;

        tokio::time::sleep(self.config.tag_lookup_delay).await;
        let caption = resolve_caption(
            &http,
            &self.config,
            &job.title,
            &job.tags,
            &job.mentions,
        )
        .await?;
        tokio::time::sleep(self.config.publish_delay).await;

        let payload = PublishPayload {
            upload_param: UploadParam {
                video_param: VideoParam {
                    text: &caption.text,
                    text_extra: &caption.text_extra,
                    poster_delay: 0,
                },
                visibility_type: 0,
                allow_comment: 1,
                allow_duet: 0,
                allow_stitch: 0,
                sound_exemption: 0,
                geofencing_regions: Vec::new(),
                creation_id: &project.creation_id,
                is_uploaded_in_batch: false,
                is_enable_playlist: false,
                is_added_to_playlist: false,
                schedule_time: schedule.timestamp(),
            },
            project_id: &project.project_id,
            draft: "",
            single_upload_param: Vec::new(),
            video_id: &video_id,
            creation_id: &project.creation_id,
        };
        self.post(&http, serde_json::to_string(&payload)?).await?;

        Ok(PublishReceipt {
            video_id,
            project_id: project.project_id,
            schedule,
        })
    }
}

#[async_trait]
impl PlatformClient for TiktokClient {
    async fn publish(
        &self,
        credential: &SessionCredential,
        job: &PublishJob,
    ) -> PlatformResult<PublishReceipt> {
        let span = info_span!("publish", credential = %credential.masked(), tags = job.tags.len());
        async {
            match self.publish_inner(credential, job).await {
                Ok(receipt) => {
                    match receipt.schedule.timestamp() {
                        Some(at) => info!(video_id = %receipt.video_id, schedule_time = at, "Published (scheduled)"),
                        None => info!(video_id = %receipt.video_id, "Published"),
                    }
                    Ok(receipt)
                }
                Err(e) => {
                    warn!("Publish failed: {}", e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Random alphanumeric creation id.
pub fn new_creation_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), CREATION_ID_LEN)
}

/// Pull the project handle out of a project-create body.
///
/// The endpoint answers an expired session with a body lacking `project`.
fn parse_project(value: &Value) -> PlatformResult<Project> {
    let project = value.get("project").ok_or(PlatformError::CredentialExpired)?;
    let creation_id = id_field(project, "creationID").ok_or(PlatformError::CredentialExpired)?;
    let project_id = id_field(project, "project_id").ok_or(PlatformError::CredentialExpired)?;
    Ok(Project {
        creation_id,
        project_id,
    })
}

fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
