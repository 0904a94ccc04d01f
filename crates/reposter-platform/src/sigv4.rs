//! AWS Signature Version 4 for the video-on-demand control plane.
//!
//! Only the subset the ingest upload needs: path `/`, a pre-sorted query
//! string, and the `x-amz-date` / `x-amz-security-token` headers.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{PlatformError, PlatformResult};

type HmacSha256 = Hmac<Sha256>;

pub const REGION: &str = "us-east-1";
pub const SERVICE: &str = "vod";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "x-amz-date;x-amz-security-token";

/// Temporary credentials issued by the upload-auth endpoint.
#[derive(Clone)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// Headers to attach to one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub security_token: String,
}

/// Sign a request to `/` with the given sorted `query` and `payload`.
pub fn sign_request(
    credentials: &TemporaryCredentials,
    method: &str,
    query: &str,
    payload: &[u8],
    at: DateTime<Utc>,
) -> PlatformResult<SignedHeaders> {
    let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = at.format("%Y%m%d").to_string();

    let canonical_headers = format!(
        "x-amz-date:{}\nx-amz-security-token:{}\n",
        amz_date, credentials.session_token
    );
    let canonical_request = format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        method,
        query,
        canonical_headers,
        SIGNED_HEADERS,
        hex(&Sha256::digest(payload))
    );

    let scope = format!("{}/{}/{}/aws4_request", datestamp, REGION, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex(&Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, &datestamp)?;
    let signature = hex(&hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key_id, scope, SIGNED_HEADERS, signature
        ),
        amz_date,
        security_token: credentials.session_token.clone(),
    })
}

fn signing_key(secret: &str, datestamp: &str) -> PlatformResult<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), datestamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, REGION.as_bytes())?;
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> PlatformResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| PlatformError::config(format!("Invalid HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
