//! Ingest upload of a media file into the platform's video store.
//!
//! Flow: temporary credentials → signed ApplyUploadInner → chunked
//! transfer with per-chunk CRC32 → finish → signed CommitUploadInner.
//! The resulting `Vid` is the video id referenced by the publish call.

use std::path::Path;

use chrono::Utc;
use flate2::Crc;
use rand::distr::{Alphanumeric, SampleString};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{PlatformConfig, WEB_AID};
use crate::error::{PlatformError, PlatformResult, PublishStep};
use crate::http::{parse_json, send, send_json};
use crate::sigv4::{sign_request, SignedHeaders, TemporaryCredentials};

const VOD_VERSION: &str = "2020-11-19";
const SPACE_NAME: &str = "tiktok";

#[derive(Debug, Deserialize)]
struct UploadAuthResponse {
    video_token_v5: VideoToken,
}

#[derive(Debug, Deserialize)]
struct VideoToken {
    access_key_id: String,
    #[serde(rename = "secret_acess_key", alias = "secret_access_key")]
    secret_access_key: String,
    session_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyUploadResponse {
    result: ApplyUploadResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplyUploadResult {
    inner_upload_address: InnerUploadAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InnerUploadAddress {
    upload_nodes: Vec<UploadNode>,
}

/// Where and how the chunks of one file are transferred.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadNode {
    pub vid: String,
    pub store_infos: Vec<StoreInfo>,
    pub upload_host: String,
    pub session_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoreInfo {
    pub store_uri: String,
    pub auth: String,
}

/// Chunked uploader bound to one publishing session.
pub struct Ingest<'a> {
    http: &'a Client,
    config: &'a PlatformConfig,
}

impl<'a> Ingest<'a> {
    pub fn new(http: &'a Client, config: &'a PlatformConfig) -> Self {
        Self { http, config }
    }

    /// Upload `path` and return its video id.
    pub async fn upload(&self, path: &Path) -> PlatformResult<String> {
        let data = tokio::fs::read(path).await?;
        info!(bytes = data.len(), "Starting ingest upload");

        let credentials = self.temporary_credentials().await?;
        let node = self.apply_upload(&credentials, data.len() as u64).await?;
        let store = node.store_infos.first().ok_or_else(|| {
            PlatformError::invalid_response(PublishStep::ApplyUpload, "empty StoreInfos")
        })?;

        let upload_id = Uuid::new_v4().to_string();
        let mut crcs = Vec::new();
        for (index, chunk) in data.chunks(self.config.chunk_size.max(1)).enumerate() {
            let crc = chunk_crc(chunk);
            self.transfer_chunk(&node, store, &upload_id, index + 1, chunk, &crc)
                .await?;
            crcs.push(crc);
        }
        debug!(chunks = crcs.len(), "Transferred all chunks");

        self.finish(&node, store, &upload_id, &crcs).await?;
        self.commit(&credentials, &node).await?;

        info!(video_id = %node.vid, "Ingest upload committed");
        Ok(node.vid)
    }

    async fn temporary_credentials(&self) -> PlatformResult<TemporaryCredentials> {
        let url = format!(
            "{}/api/v1/video/upload/auth/?aid={}",
            self.config.www_base, WEB_AID
        );
        let auth: UploadAuthResponse =
            send_json(PublishStep::UploadAuth, self.http.get(url)).await?;

        Ok(TemporaryCredentials {
            access_key_id: auth.video_token_v5.access_key_id,
            secret_access_key: auth.video_token_v5.secret_access_key,
            session_token: auth.video_token_v5.session_token,
        })
    }

    async fn apply_upload(
        &self,
        credentials: &TemporaryCredentials,
        file_size: u64,
    ) -> PlatformResult<UploadNode> {
        let nonce = Alphanumeric
            .sample_string(&mut rand::rng(), 11)
            .to_ascii_lowercase();
        let query = apply_upload_query(file_size, &nonce);
        let signed = sign_request(credentials, "GET", &query, b"", Utc::now())?;

        let request = with_signature(
            self.http.get(format!("{}/?{}", self.config.vod_base, query)),
            &signed,
        );
        let body = send(PublishStep::ApplyUpload, request).await?.text().await?;
        let response: ApplyUploadResponse = parse_json(PublishStep::ApplyUpload, &body)?;

        response
            .result
            .inner_upload_address
            .upload_nodes
            .into_iter()
            .next()
            .ok_or_else(|| {
                PlatformError::invalid_response(PublishStep::ApplyUpload, "empty UploadNodes")
            })
    }

    fn store_url(&self, node: &UploadNode, store: &StoreInfo) -> String {
        format!(
            "{}://{}/{}",
            self.config.upload_scheme, node.upload_host, store.store_uri
        )
    }

    async fn transfer_chunk(
        &self,
        node: &UploadNode,
        store: &StoreInfo,
        upload_id: &str,
        part_number: usize,
        chunk: &[u8],
        crc: &str,
    ) -> PlatformResult<()> {
        let url = format!(
            "{}?partNumber={}&uploadID={}&phase=transfer",
            self.store_url(node, store),
            part_number,
            upload_id
        );
        let request = self
            .http
            .post(url)
            .header("Authorization", &store.auth)
            .header("Content-Type", "application/octet-stream")
            .header("Content-Disposition", "attachment; filename=\"undefined\"")
            .header("Content-Crc32", crc)
            .body(chunk.to_vec());

        send(PublishStep::ChunkTransfer, request).await?;
        debug!(part_number, bytes = chunk.len(), "Chunk transferred");
        Ok(())
    }

    async fn finish(
        &self,
        node: &UploadNode,
        store: &StoreInfo,
        upload_id: &str,
        crcs: &[String],
    ) -> PlatformResult<()> {
        let url = format!(
            "{}?uploadID={}&phase=finish&uploadmode=part",
            self.store_url(node, store),
            upload_id
        );
        let request = self
            .http
            .post(url)
            .header("Authorization", &store.auth)
            .header("Content-Type", "text/plain;charset=UTF-8")
            .body(finish_body(crcs));

        send(PublishStep::FinishUpload, request).await?;
        Ok(())
    }

    async fn commit(
        &self,
        credentials: &TemporaryCredentials,
        node: &UploadNode,
    ) -> PlatformResult<()> {
        let query = format!(
            "Action=CommitUploadInner&SpaceName={}&Version={}",
            SPACE_NAME, VOD_VERSION
        );
        let payload = serde_json::to_vec(&serde_json::json!({
            "SessionKey": node.session_key,
            "Functions": [],
        }))?;
        let signed = sign_request(credentials, "POST", &query, &payload, Utc::now())?;

        let request = with_signature(
            self.http
                .post(format!("{}/?{}", self.config.vod_base, query))
                .header("Content-Type", "application/json")
                .body(payload),
            &signed,
        );
        send(PublishStep::CommitUpload, request).await?;
        Ok(())
    }
}

fn with_signature(
    request: reqwest::RequestBuilder,
    signed: &SignedHeaders,
) -> reqwest::RequestBuilder {
    request
        .header("Authorization", &signed.authorization)
        .header("X-Amz-Date", &signed.amz_date)
        .header("X-Amz-Security-Token", &signed.security_token)
}

/// Sorted ApplyUploadInner query.
fn apply_upload_query(file_size: u64, nonce: &str) -> String {
    format!(
        "Action=ApplyUploadInner&FileSize={}&FileType=video&IsInner=1&SpaceName={}&Version={}&s={}",
        file_size, SPACE_NAME, VOD_VERSION, nonce
    )
}

/// CRC32 of one chunk as unpadded lowercase hex.
pub fn chunk_crc(chunk: &[u8]) -> String {
    let mut crc = Crc::new();
    crc.update(chunk);
    format!("{:x}", crc.sum())
}

/// `1:<crc>,2:<crc>,...` body of the finish call.
pub fn finish_body(crcs: &[String]) -> String {
    crcs.iter()
        .enumerate()
        .map(|(i, crc)| format!("{}:{}", i + 1, crc))
        .collect::<Vec<_>>()
        .join(",")
}
