// Listing pipeline: validate the draft, upload asset and metadata, mint.
//
// Uploads that succeed before a later step fails are left in the store.
// Their identifiers travel in the error so the caller can report them.

use std::path::{Path, PathBuf};

use alloy_primitives::U256;
use thiserror::Error;
use tracing::{info, warn};

use super::session::ListingDraft;
use super::ValidationError;
use crate::chain::abi::token_id_from_receipt;
use crate::chain::units::to_wei;
use crate::chain::{ChainError, ContractHandle, TokenId};
use crate::event_log::LogSink;
use crate::storage::{gateway_url, ContentId, ContentStore, Metadata, StoreError, METADATA_FILE_NAME};

/// A validated listing ready for the network.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    pub account: String,
    pub contract: String,
    pub title: String,
    pub description: String,
    /// Asset on local disk; read by the pipeline, not during validation.
    pub path: PathBuf,
    pub file_name: String,
    pub price_wei: U256,
    pub minutes: U256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingOutcome {
    pub asset_cid: ContentId,
    pub metadata_cid: ContentId,
    pub token_id: TokenId,
}

#[derive(Debug, Error)]
pub enum ListingError {
    /// The asset could not be read. Shown as an alert like any other
    /// validation failure.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("asset upload failed: {0}")]
    AssetUpload(#[source] StoreError),

    #[error("metadata upload failed (asset {asset_cid} orphaned): {source}")]
    MetadataUpload {
        asset_cid: ContentId,
        #[source]
        source: StoreError,
    },

    #[error("mint failed (asset {asset_cid}, metadata {metadata_cid} orphaned): {source}")]
    Mint {
        asset_cid: ContentId,
        metadata_cid: ContentId,
        #[source]
        source: ChainError,
    },

    #[error("mint receipt carries no Transfer event")]
    MissingTokenId {
        asset_cid: ContentId,
        metadata_cid: ContentId,
    },
}

impl ListingError {
    /// Identifiers uploaded before the failure, in upload order.
    pub fn orphaned(&self) -> Vec<&ContentId> {
        match self {
            ListingError::Invalid(_) | ListingError::AssetUpload(_) => vec![],
            ListingError::MetadataUpload { asset_cid, .. } => vec![asset_cid],
            ListingError::Mint {
                asset_cid,
                metadata_cid,
                ..
            }
            | ListingError::MissingTokenId {
                asset_cid,
                metadata_cid,
            } => vec![asset_cid, metadata_cid],
        }
    }
}

/// Check the draft. Touches neither the network nor the file system.
pub fn validate_listing(
    account: Option<&str>,
    contract: Option<&str>,
    draft: &ListingDraft,
) -> Result<ListingRequest, ValidationError> {
    let account = account.ok_or(ValidationError::MissingAccount)?;
    if draft.title.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if draft.description.trim().is_empty() {
        return Err(ValidationError::EmptyField("description"));
    }
    let path = draft.file.trim();
    if path.is_empty() {
        return Err(ValidationError::NoFile);
    }
    let contract = contract.ok_or(ValidationError::NoContract)?;

    let price_wei = to_wei(&draft.start_price).ok_or_else(|| ValidationError::InvalidAmount {
        field: "start price",
        value: draft.start_price.clone(),
    })?;
    let minutes = draft
        .duration_minutes
        .trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidAmount {
            field: "duration",
            value: draft.duration_minutes.clone(),
        })?;

    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();

    Ok(ListingRequest {
        account: account.to_string(),
        contract: contract.to_string(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        path: PathBuf::from(path),
        file_name,
        price_wei,
        minutes: U256::from(minutes),
    })
}

/// Read the asset, upload it, then metadata embedding the asset URL, then mint.
///
/// Each step starts only after the previous one returned an identifier.
/// Every failure is written to `log` here; callers only need the error.
pub async fn run_listing(
    store: &dyn ContentStore,
    contract: &ContractHandle,
    gateway: &str,
    request: ListingRequest,
    log: &LogSink,
) -> Result<ListingOutcome, ListingError> {
    let ListingRequest {
        account,
        title,
        description,
        path,
        file_name,
        price_wei,
        minutes,
        ..
    } = request;

    let content = tokio::fs::read(&path)
        .await
        .map_err(|e| ValidationError::UnreadableFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    log.push("upload ipfs to image.");
    let asset_cid = match store.store(&file_name, content).await {
        Ok(id) => id,
        Err(e) => {
            warn!("asset upload failed: {}", e);
            log.push(format!("upload ipfs to image failed: {e}"));
            return Err(ListingError::AssetUpload(e));
        }
    };
    let image_url = gateway_url(gateway, &asset_cid, &file_name);
    log.push(format!("upload ipfs to image cid[{asset_cid}] url[{image_url}]"));

    log.push("upload ipfs to metadata.");
    let metadata = Metadata {
        name: title,
        description,
        image_url,
    };
    let document = match serde_json::to_vec(&metadata) {
        Ok(d) => d,
        Err(e) => {
            let err = StoreError::BadResponse(format!("metadata encoding: {e}"));
            log.push(format!(
                "upload ipfs to metadata failed: {err} (orphaned cid[{asset_cid}])"
            ));
            return Err(ListingError::MetadataUpload {
                asset_cid,
                source: err,
            });
        }
    };
    let metadata_cid = match store.store(METADATA_FILE_NAME, document).await {
        Ok(id) => id,
        Err(e) => {
            warn!("metadata upload failed, asset {} orphaned: {}", asset_cid, e);
            log.push(format!(
                "upload ipfs to metadata failed: {e} (orphaned cid[{asset_cid}])"
            ));
            return Err(ListingError::MetadataUpload {
                asset_cid,
                source: e,
            });
        }
    };
    let metadata_url = gateway_url(gateway, &metadata_cid, METADATA_FILE_NAME);
    log.push(format!(
        "upload ipfs to metadata cid[{metadata_cid}] url[{metadata_url}]"
    ));

    log.push("mint.");
    let receipt = match contract
        .mint_token(&account, &metadata_url, price_wei, minutes, log)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(
                "mint failed, asset {} and metadata {} orphaned: {}",
                asset_cid, metadata_cid, e
            );
            return Err(ListingError::Mint {
                asset_cid,
                metadata_cid,
                source: e,
            });
        }
    };

    let Some(token_id) = token_id_from_receipt(&receipt) else {
        warn!("mint receipt {} has no Transfer log", receipt.tx_hash);
        log.push("mint receipt has no tokenId.");
        return Err(ListingError::MissingTokenId {
            asset_cid,
            metadata_cid,
        });
    };
    log.push(format!("mint tokenId[{token_id}]"));
    info!("minted token {} on {}", token_id, contract.address());

    Ok(ListingOutcome {
        asset_cid,
        metadata_cid,
        token_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_draft(file: &str) -> ListingDraft {
        ListingDraft {
            title: "Art".into(),
            description: "d".into(),
            file: file.into(),
            ..ListingDraft::default()
        }
    }

    fn temp_asset(name: &str) -> String {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, b"png bytes").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn validation_order_matches_form() {
        let draft = ListingDraft::default();
        assert_eq!(
            validate_listing(None, Some("0xabc"), &draft),
            Err(ValidationError::MissingAccount)
        );
        assert_eq!(
            validate_listing(Some("0xme"), Some("0xabc"), &draft),
            Err(ValidationError::EmptyField("name"))
        );

        let mut draft = filled_draft("");
        draft.description = "   ".into();
        assert_eq!(
            validate_listing(Some("0xme"), Some("0xabc"), &draft),
            Err(ValidationError::EmptyField("description"))
        );

        let draft = filled_draft("");
        assert_eq!(
            validate_listing(Some("0xme"), Some("0xabc"), &draft),
            Err(ValidationError::NoFile)
        );
    }

    #[test]
    fn missing_contract_and_bad_amounts_are_rejected() {
        let path = temp_asset("auction_listing_test_amounts.png");
        let draft = filled_draft(&path);
        assert_eq!(
            validate_listing(Some("0xme"), None, &draft),
            Err(ValidationError::NoContract)
        );

        let mut bad_price = filled_draft(&path);
        bad_price.start_price = "cheap".into();
        assert!(matches!(
            validate_listing(Some("0xme"), Some("0xabc"), &bad_price),
            Err(ValidationError::InvalidAmount { field: "start price", .. })
        ));

        let mut bad_duration = filled_draft(&path);
        bad_duration.duration_minutes = "-5".into();
        assert!(matches!(
            validate_listing(Some("0xme"), Some("0xabc"), &bad_duration),
            Err(ValidationError::InvalidAmount { field: "duration", .. })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn validation_does_not_read_the_file() {
        let draft = filled_draft("/definitely/not/here.png");
        let req = validate_listing(Some("0xme"), Some("0xabc"), &draft).unwrap();
        assert_eq!(req.path, PathBuf::from("/definitely/not/here.png"));
        assert_eq!(req.file_name, "here.png");
    }

    #[test]
    fn valid_draft_builds_request() {
        let req = validate_listing(Some("0xme"), Some("0xabc"), &filled_draft(" /tmp/art.png "))
            .unwrap();
        assert_eq!(req.path, PathBuf::from("/tmp/art.png"));
        assert_eq!(req.file_name, "art.png");
        assert_eq!(req.price_wei, U256::from(1_000_000_000_000_000u64));
        assert_eq!(req.minutes, U256::from(5));
    }

    #[test]
    fn orphaned_lists_uploaded_ids() {
        let err = ListingError::Mint {
            asset_cid: ContentId("bafy1".into()),
            metadata_cid: ContentId("bafy2".into()),
            source: ChainError::Reverted {
                tx_hash: "0x1".into(),
            },
        };
        let ids: Vec<&str> = err.orphaned().iter().map(|c| c.as_str()).collect();
        assert_eq!(ids, vec!["bafy1", "bafy2"]);
        assert!(ListingError::AssetUpload(StoreError::BadResponse("x".into()))
            .orphaned()
            .is_empty());
        assert!(ListingError::from(ValidationError::NoFile).orphaned().is_empty());
    }
}
