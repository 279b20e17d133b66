// Content-addressed storage: upload bytes, get back a content identifier.

pub mod ipfs;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifier returned by the store for an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(pub String);

impl ContentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token metadata document, stored as JSON next to the asset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// File name used for the metadata document inside its wrapping directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content store unavailable: {0}")]
    StoreUnavailable(#[from] reqwest::Error),

    #[error("content store rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected content store response: {0}")]
    BadResponse(String),

    #[error("failed to load metadata from {uri}: {message}")]
    Metadata { uri: String, message: String },
}

// ---------------------------------------------------------------------------
// ContentStore trait
// ---------------------------------------------------------------------------

/// Upload and lookup operations the coordinator needs from a content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload `content` under `name` and return its identifier.
    async fn store(&self, name: &str, content: Vec<u8>) -> Result<ContentId, StoreError>;

    /// Fetch and decode a metadata document by URL.
    async fn fetch_metadata(&self, uri: &str) -> Result<Metadata, StoreError>;
}

/// `{base}/ipfs/{id}/{name}`. A trailing slash on `base` is tolerated.
pub fn gateway_url(base: &str, id: &ContentId, name: &str) -> String {
    format!("{}/ipfs/{}/{}", base.trim_end_matches('/'), id, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_url_composes_path() {
        let id = ContentId("bafy1".into());
        assert_eq!(
            gateway_url("http://127.0.0.1:8080", &id, "art.png"),
            "http://127.0.0.1:8080/ipfs/bafy1/art.png"
        );
        assert_eq!(
            gateway_url("http://127.0.0.1:8080/", &id, "art.png"),
            "http://127.0.0.1:8080/ipfs/bafy1/art.png"
        );
    }

    #[test]
    fn metadata_uses_camel_case_image_url() {
        let meta = Metadata {
            name: "Art".into(),
            description: "d".into(),
            image_url: "http://gw/ipfs/bafy1/art.png".into(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["imageUrl"], "http://gw/ipfs/bafy1/art.png");
        assert!(json.get("image_url").is_none());

        let parsed: Metadata = serde_json::from_str(
            r#"{"name":"n","description":"x","imageUrl":"http://gw/ipfs/c/f"}"#,
        )
        .unwrap();
        assert_eq!(parsed.image_url, "http://gw/ipfs/c/f");
    }
}
