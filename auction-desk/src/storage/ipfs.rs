// IPFS HTTP API client (`/api/v0/add`) and gateway metadata fetch.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ContentId, ContentStore, Metadata, StoreError};
use crate::config::IpfsConfig;

/// One line of the newline-delimited JSON returned by `/api/v0/add`.
#[derive(Debug, Deserialize)]
struct AddEntry {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
}

pub struct IpfsClient {
    http: reqwest::Client,
    api_url: String,
    wrap_with_directory: bool,
    cid_version: u32,
    hash_alg: String,
}

impl IpfsClient {
    pub fn new(config: &IpfsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            wrap_with_directory: config.wrap_with_directory,
            cid_version: config.cid_version,
            hash_alg: config.hash_alg.clone(),
        }
    }
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn store(&self, name: &str, content: Vec<u8>) -> Result<ContentId, StoreError> {
        let url = format!("{}/api/v0/add", self.api_url);
        let size = content.len();
        let part = Part::bytes(content).file_name(name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .query(&[
                ("wrap-with-directory", self.wrap_with_directory.to_string()),
                ("cid-version", self.cid_version.to_string()),
                ("hash", self.hash_alg.clone()),
            ])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("ipfs add of {} rejected: {} {}", name, status, body);
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let id = parse_add_response(&body, self.wrap_with_directory)?;
        debug!("ipfs add {} ({} bytes) -> {}", name, size, id);
        Ok(id)
    }

    async fn fetch_metadata(&self, uri: &str) -> Result<Metadata, StoreError> {
        let response = self.http.get(uri).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Metadata {
                uri: uri.to_string(),
                message: format!("HTTP {status}"),
            });
        }
        response
            .json::<Metadata>()
            .await
            .map_err(|e| StoreError::Metadata {
                uri: uri.to_string(),
                message: e.to_string(),
            })
    }
}

/// Pick the returned identifier out of an `/api/v0/add` response body.
///
/// With directory wrapping the wrapper entry (empty `Name`) is the result;
/// without it the single file entry is.
pub fn parse_add_response(body: &str, wrapped: bool) -> Result<ContentId, StoreError> {
    let mut entries = Vec::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: AddEntry = serde_json::from_str(line)
            .map_err(|e| StoreError::BadResponse(format!("{e}: {line}")))?;
        entries.push(entry);
    }

    let picked = if wrapped {
        entries
            .iter()
            .rev()
            .find(|e| e.name.is_empty())
            .or_else(|| entries.last())
    } else {
        entries.last()
    };

    picked
        .map(|e| ContentId(e.hash.clone()))
        .ok_or_else(|| StoreError::BadResponse("empty add response".to_string()))
}
