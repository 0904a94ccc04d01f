//! Shared HTTP plumbing: session construction and response checks.

use std::sync::Arc;
use std::time::Instant;

use reqwest::cookie::Jar;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use reposter_models::SessionCredential;

use crate::config::PlatformConfig;
use crate::error::{PlatformError, PlatformResult, PublishStep};
use crate::metrics::record_request;

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 2048;

/// Build a cookie-carrying HTTP session for one publish.
///
/// The `sessionid` cookie is set host-only on the regional and main hosts.
pub fn session_client(
    config: &PlatformConfig,
    credential: &SessionCredential,
) -> PlatformResult<Client> {
    let jar = Jar::default();
    for base in [&config.web_base, &config.www_base] {
        let url = Url::parse(base)
            .map_err(|e| PlatformError::config(format!("invalid base URL {}: {}", base, e)))?;
        jar.add_cookie_str(&format!("sessionid={}; Path=/", credential.expose()), &url);
    }

    let mut builder = base_builder(config).cookie_provider(Arc::new(jar));
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    Ok(builder.build()?)
}

/// Build a cookie-less client for anonymous reads.
pub fn anonymous_client(config: &PlatformConfig) -> PlatformResult<Client> {
    let mut builder = base_builder(config);
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    Ok(builder.build()?)
}

fn base_builder(config: &PlatformConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.clone())
}

/// Send `request`, failing with [`PlatformError::Network`] on a non-2xx status.
pub async fn send(step: PublishStep, request: RequestBuilder) -> PlatformResult<Response> {
    let start = Instant::now();
    let response = request.send().await?;
    let status = response.status();
    record_request(step.as_str(), status.as_u16(), start.elapsed().as_secs_f64() * 1000.0);
    debug!(step = %step, status = status.as_u16(), "Platform request finished");

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::network(step, status.as_u16(), truncate(body)))
}

/// Send `request` and parse a successful body as `T`.
pub async fn send_json<T: DeserializeOwned>(
    step: PublishStep,
    request: RequestBuilder,
) -> PlatformResult<T> {
    let body = send(step, request).await?.text().await?;
    parse_json(step, &body)
}

/// Parse `body` as `T`; a shape mismatch names the step.
pub fn parse_json<T: DeserializeOwned>(step: PublishStep, body: &str) -> PlatformResult<T> {
    serde_json::from_str(body).map_err(|e| {
        PlatformError::invalid_response(step, format!("{}: {}", e, truncate(body.to_string())))
    })
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
