use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::structs::chat_line::{ChatLine, PRETTY_TIMEFORMAT};
use crate::structs::config::PasteExpiration;
use crate::types::{ConfigurationError, UploadError};

/// Uploads slower than this usually mean an IPv4-only paste host reached over IPv6.
const SLOW_UPLOAD_WARNING: Duration = Duration::from_secs(60);

#[async_trait]
pub trait PasteService: Send + Sync {
    /// Stores `text` and returns the link to it. Single attempt.
    async fn upload(&self, text: &str, expiration: PasteExpiration) -> Result<String, UploadError>;
}

#[derive(Serialize)]
struct PasteRequest<'a> {
    text: &'a str,
    expiration: &'a str,
    formatter: &'a str,
}

#[derive(Deserialize)]
struct PasteReply {
    full_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PasteClient {
    http: Client,
    endpoint: Url,
}

impl PasteClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ConfigurationError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigurationError::Invalid {
            field: "pastebin_url",
            reason: format!("`{endpoint}`: {e}"),
        })?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                field: "pastebin_url",
                reason: format!("could not build HTTP client: {e}"),
            })?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PasteService for PasteClient {
    async fn upload(&self, text: &str, expiration: PasteExpiration) -> Result<String, UploadError> {
        debug!(endpoint = %self.endpoint, %expiration, bytes = text.len(), "Uploading context paste");
        let started = Instant::now();

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&PasteRequest {
                text,
                expiration: expiration.as_str(),
                formatter: "plaintext",
            })
            .send()
            .await?;

        let elapsed = started.elapsed();
        if elapsed > SLOW_UPLOAD_WARNING {
            warn!(
                elapsed_secs = elapsed.as_secs(),
                "Creating a paste was slow. Check your IPv6/IPv4 config: is the paste host IPv4-only?"
            );
        }

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: PasteReply = response.json().await?;
        reply
            .full_url
            .or(reply.url)
            .filter(|url| !url.is_empty())
            .ok_or(UploadError::MissingUrl)
    }
}

/// Paste body for a captured channel snapshot.
pub fn snapshot_text(channel: &str, taken_at: DateTime<Utc>, lines: &[ChatLine]) -> String {
    let mut text = Vec::with_capacity(lines.len() + 3);
    text.push(format!(
        "Snapshot for {} created at {} (UTC)",
        channel,
        taken_at.format(PRETTY_TIMEFORMAT)
    ));
    text.push("---------------------------------------------------------------".to_string());
    text.extend(lines.iter().map(ChatLine::render));
    text.push("-----------------------------//--------------------------------".to_string());
    text.join("\n")
}
