// Chain client: deploy, read-only calls, transactions, and event subscriptions
// against the auction contract.
//
// `ChainClient` is the raw transport seam (bytes in, bytes out). The typed
// `ContractHandle` wraps it with the contract's fixed ABI.

pub mod abi;
pub mod rpc;
pub mod subscription;
pub mod units;

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use self::abi::{ContractEvent, IItem};

/// Token identifiers are uint256 on chain.
pub type TokenId = U256;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("node unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    Malformed(String),

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("abi decode failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("failed to load contract artifact {path}: {message}")]
    Artifact { path: String, message: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

// ---------------------------------------------------------------------------
// Transaction progress
// ---------------------------------------------------------------------------

/// Lifecycle notifications for one transaction, emitted in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum TxProgress {
    Submitted { tx_hash: String },
    Confirmed { tx_hash: String, block: u64 },
    /// Only for contract creation.
    Deployed { address: String },
    Receipt { tx_hash: String },
    Error { message: String },
}

pub trait ProgressObserver: Send + Sync {
    fn notify(&self, progress: TxProgress);
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// A log entry as carried by a receipt or a subscription notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub contract_address: Option<String>,
    pub status: bool,
    pub logs: Vec<RawLog>,
}

/// Sender and attached value for a state-changing call.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRequest {
    pub from: String,
    pub value: U256,
}

// ---------------------------------------------------------------------------
// ChainClient trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Create a new auction contract from `from`. Returns its address.
    async fn deploy(
        &self,
        from: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<String, ChainError>;

    /// Read-only call; returns the raw ABI-encoded return data.
    async fn call(&self, contract: &str, data: Bytes) -> Result<Bytes, ChainError>;

    /// Submit a transaction and wait for its receipt.
    async fn send(
        &self,
        contract: &str,
        data: Bytes,
        tx: TxRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<Receipt, ChainError>;

    /// Start forwarding decoded events emitted by `contract` into `events`.
    ///
    /// Returns once the subscription is established. The stream is not
    /// restarted if the connection drops.
    async fn subscribe(
        &self,
        contract: &str,
        events: mpsc::Sender<ContractEvent>,
    ) -> Result<(), ChainError>;
}

// ---------------------------------------------------------------------------
// Typed contract handle
// ---------------------------------------------------------------------------

/// Decoded `getInfo` result.
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionInfo {
    pub beneficiary: String,
    pub price: U256,
    /// Seconds since the epoch.
    pub auction_end_time: U256,
    pub highest_bidder: String,
    pub ended: bool,
}

/// A deployed auction contract bound to a chain client.
#[derive(Clone)]
pub struct ContractHandle {
    chain: Arc<dyn ChainClient>,
    address: String,
}

impl ContractHandle {
    pub fn new(chain: Arc<dyn ChainClient>, address: impl Into<String>) -> Self {
        Self {
            chain,
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn owner_of(&self, token_id: TokenId) -> Result<String, ChainError> {
        let data = IItem::ownerOfCall { tokenId: token_id }.abi_encode();
        let ret = self.chain.call(&self.address, data.into()).await?;
        let owner = Address::abi_decode(&ret)?;
        Ok(owner.to_string())
    }

    pub async fn token_uri(&self, token_id: TokenId) -> Result<String, ChainError> {
        let data = IItem::tokenURICall { tokenId: token_id }.abi_encode();
        let ret = self.chain.call(&self.address, data.into()).await?;
        Ok(String::abi_decode(&ret)?)
    }

    pub async fn get_info(&self, token_id: TokenId) -> Result<AuctionInfo, ChainError> {
        let data = IItem::getInfoCall { tokenId: token_id }.abi_encode();
        let ret = self.chain.call(&self.address, data.into()).await?;
        let (beneficiary, price, auction_end_time, highest_bidder, ended) =
            <(Address, U256, U256, Address, bool)>::abi_decode_params(&ret)?;
        Ok(AuctionInfo {
            beneficiary: beneficiary.to_string(),
            price,
            auction_end_time,
            highest_bidder: highest_bidder.to_string(),
            ended,
        })
    }

    /// Mint a token listed at `price` wei for `minutes` minutes.
    pub async fn mint_token(
        &self,
        from: &str,
        metadata_uri: &str,
        price: U256,
        minutes: U256,
        observer: &dyn ProgressObserver,
    ) -> Result<Receipt, ChainError> {
        let data = IItem::mintTokenCall {
            metadataURI: metadata_uri.to_string(),
            price,
            time: minutes,
        }
        .abi_encode();
        info!("mintToken on {} from {}", self.address, from);
        self.send(data, from, U256::ZERO, observer).await
    }

    pub async fn bid(
        &self,
        from: &str,
        token_id: TokenId,
        value: U256,
        observer: &dyn ProgressObserver,
    ) -> Result<Receipt, ChainError> {
        let data = IItem::bidCall { tokenId: token_id }.abi_encode();
        info!("bid on {} token {} value {}", self.address, token_id, value);
        self.send(data, from, value, observer).await
    }

    pub async fn auction_end(
        &self,
        from: &str,
        token_id: TokenId,
        observer: &dyn ProgressObserver,
    ) -> Result<Receipt, ChainError> {
        let data = IItem::auctionEndCall { tokenId: token_id }.abi_encode();
        info!("auctionEnd on {} token {}", self.address, token_id);
        self.send(data, from, U256::ZERO, observer).await
    }

    async fn send(
        &self,
        data: Vec<u8>,
        from: &str,
        value: U256,
        observer: &dyn ProgressObserver,
    ) -> Result<Receipt, ChainError> {
        let tx = TxRequest {
            from: from.to_string(),
            value,
        };
        let result = self.chain.send(&self.address, data.into(), tx, observer).await;
        if let Err(e) = &result {
            warn!("transaction to {} failed: {}", self.address, e);
        }
        result
    }
}

/// Case-insensitive address equality.
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
