//! Unlock-service clients (Real-Debrid, Debrid-Link).
//!
//! Each service takes a raw hoster link via form-encoded POST with bearer auth
//! and answers with a direct download URL plus the hoster's filename.

use crate::url_model::derive_filename;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const REALDEBRID_UNRESTRICT_URL: &str = "https://api.real-debrid.com/rest/1.0/unrestrict/link";
pub const DEBRIDLINK_ADD_URL: &str = "https://debrid-link.com/api/v2/downloader/add";

/// Bodies longer than this are cut in error messages.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnlockService {
    #[default]
    RealDebrid,
    DebridLink,
}

impl UnlockService {
    /// Short label shown on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            UnlockService::RealDebrid => "RD",
            UnlockService::DebridLink => "DL",
        }
    }

    pub fn other(self) -> Self {
        match self {
            UnlockService::RealDebrid => UnlockService::DebridLink,
            UnlockService::DebridLink => UnlockService::RealDebrid,
        }
    }
}

impl fmt::Display for UnlockService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockService::RealDebrid => f.write_str("Real-Debrid"),
            UnlockService::DebridLink => f.write_str("Debrid-Link"),
        }
    }
}

#[derive(Debug, Error)]
pub enum UnlockError {
    #[error("no API token configured for {0}")]
    MissingToken(UnlockService),
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {status}: {body}")]
    Http { status: u32, body: String },
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("link rejected: {0}")]
    Rejected(String),
    #[error("response carried no download URL")]
    Empty,
}

/// Successful unlock: direct URL, sanitized filename and the service used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlocked {
    pub direct_url: String,
    pub filename: String,
    pub service: UnlockService,
}

/// One configured service endpoint.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub service: UnlockService,
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ServiceEndpoint {
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Unlocks `link`, blocking for at most the configured timeout.
    pub fn unlock(&self, link: &str) -> Result<Unlocked, UnlockError> {
        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(UnlockError::MissingToken(self.service))?;

        let field = match self.service {
            UnlockService::RealDebrid => "link",
            UnlockService::DebridLink => "url",
        };
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(field, link)
            .finish();

        let (status, response) = self.post(token, body.as_bytes())?;
        if !(200..300).contains(&status) {
            return Err(UnlockError::Http {
                status,
                body: truncate(&String::from_utf8_lossy(&response), ERROR_BODY_LIMIT),
            });
        }

        let (direct, name) = match self.service {
            UnlockService::RealDebrid => parse_realdebrid(&response)?,
            UnlockService::DebridLink => parse_debridlink(&response)?,
        };
        finish_unlock(direct, name, self.service)
    }

    fn post(&self, token: &str, body: &[u8]) -> Result<(u32, Vec<u8>), UnlockError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(&self.url)?;
        easy.post(true)?;
        easy.post_fields_copy(body)?;
        easy.follow_location(true)?;
        easy.timeout(self.timeout)?;
        easy.connect_timeout(self.timeout.min(Duration::from_secs(30)))?;

        let mut headers = curl::easy::List::new();
        headers.append(&format!("Authorization: Bearer {token}"))?;
        headers.append("Accept: application/json")?;
        easy.http_headers(headers)?;

        let mut response = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let status = easy.response_code()?;
        Ok((status, response))
    }
}

#[derive(Debug, Deserialize)]
struct RealDebridUnrestrict {
    download: Option<String>,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DebridLinkResponse {
    #[serde(default)]
    success: bool,
    value: Option<DebridLinkValue>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DebridLinkValue {
    Many(Vec<DebridLinkFile>),
    One(DebridLinkFile),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebridLinkFile {
    download_url: Option<String>,
    name: Option<String>,
}

fn parse_realdebrid(body: &[u8]) -> Result<(Option<String>, Option<String>), UnlockError> {
    let parsed: RealDebridUnrestrict = serde_json::from_slice(body)?;
    Ok((parsed.download, parsed.filename))
}

fn parse_debridlink(body: &[u8]) -> Result<(Option<String>, Option<String>), UnlockError> {
    let parsed: DebridLinkResponse = serde_json::from_slice(body)?;
    if !parsed.success {
        return Err(UnlockError::Rejected(
            parsed.error.unwrap_or_else(|| "success=false".to_string()),
        ));
    }
    let file = match parsed.value {
        Some(DebridLinkValue::Many(files)) => files.into_iter().next(),
        Some(DebridLinkValue::One(file)) => Some(file),
        None => None,
    };
    Ok(file.map(|f| (f.download_url, f.name)).unwrap_or((None, None)))
}

fn finish_unlock(
    direct: Option<String>,
    name: Option<String>,
    service: UnlockService,
) -> Result<Unlocked, UnlockError> {
    let direct_url = direct
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or(UnlockError::Empty)?;
    let filename = derive_filename(&direct_url, name.as_deref());
    Ok(Unlocked {
        direct_url,
        filename,
        service,
    })
}

/// Shortens `s` to at most `max` chars for log/error output.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}
