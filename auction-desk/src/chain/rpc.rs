// JSON-RPC over HTTP: wallet accounts, eth_call, and transaction submission
// with receipt polling.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{hex, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::abi::ContractEvent;
use super::{subscription, ChainClient, ChainError, ProgressObserver, RawLog, Receipt, TxProgress, TxRequest};
use crate::account_sync::WalletProvider;
use crate::config::Config;

// ---------------------------------------------------------------------------
// JsonRpcClient
// ---------------------------------------------------------------------------

/// Minimal JSON-RPC 2.0 client over HTTP POST.
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, ChainError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(id, method, "rpc request");

        let envelope: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        parse_envelope(envelope)
    }
}

/// Split a JSON-RPC response into its result or error object.
fn parse_envelope<R: DeserializeOwned>(mut envelope: Value) -> Result<R, ChainError> {
    if let Some(err) = envelope.get("error").filter(|e| !e.is_null()) {
        let err: RpcErrorObject = serde_json::from_value(err.clone())
            .map_err(|e| ChainError::Malformed(format!("error object: {e}")))?;
        return Err(ChainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    let result = envelope
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null);
    serde_json::from_value(result).map_err(|e| ChainError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Log object as returned in receipts and `eth_subscription` notifications.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LogJson {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

impl TryFrom<LogJson> for RawLog {
    type Error = ChainError;

    fn try_from(log: LogJson) -> Result<Self, Self::Error> {
        let topics = log
            .topics
            .iter()
            .map(|t| {
                t.parse::<B256>()
                    .map_err(|_| ChainError::Malformed(format!("bad topic {t}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RawLog {
            address: log.address,
            topics,
            data: decode_hex(&log.data)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptJson {
    transaction_hash: String,
    block_number: Option<String>,
    contract_address: Option<String>,
    status: Option<String>,
    #[serde(default)]
    logs: Vec<LogJson>,
}

impl TryFrom<ReceiptJson> for Receipt {
    type Error = ChainError;

    fn try_from(r: ReceiptJson) -> Result<Self, Self::Error> {
        let block_number = r
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .unwrap_or(0);
        // Pre-Byzantium receipts carry no status; treat them as success.
        let status = r.status.as_deref().map(|s| s != "0x0").unwrap_or(true);
        let logs = r
            .logs
            .into_iter()
            .map(RawLog::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Receipt {
            tx_hash: r.transaction_hash,
            block_number,
            contract_address: r.contract_address,
            status,
            logs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Artifact {
    bytecode: String,
}

fn decode_hex(s: &str) -> Result<Bytes, ChainError> {
    hex::decode(s)
        .map(Bytes::from)
        .map_err(|e| ChainError::Malformed(format!("bad hex data: {e}")))
}

fn parse_quantity(s: &str) -> Result<u64, ChainError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|_| ChainError::Malformed(format!("bad quantity {s}")))
}

// ---------------------------------------------------------------------------
// RpcChain
// ---------------------------------------------------------------------------

/// `ChainClient` backed by a node's JSON-RPC (HTTP) and subscription (WebSocket)
/// endpoints. Transactions are signed by the node's unlocked accounts.
pub struct RpcChain {
    rpc: Arc<JsonRpcClient>,
    ws_url: String,
    artifact_path: PathBuf,
    gas_price: u64,
    receipt_poll: Duration,
}

impl RpcChain {
    pub fn new(config: &Config, rpc: Arc<JsonRpcClient>) -> Self {
        Self {
            rpc,
            ws_url: config.rpc.ws_url.clone(),
            artifact_path: config.deploy.artifact_path.clone(),
            gas_price: config.deploy.gas_price,
            receipt_poll: config.rpc.receipt_poll(),
        }
    }

    async fn load_bytecode(&self) -> Result<String, ChainError> {
        let artifact_err = |message: String| ChainError::Artifact {
            path: self.artifact_path.display().to_string(),
            message,
        };
        let text = tokio::fs::read_to_string(&self.artifact_path)
            .await
            .map_err(|e| artifact_err(e.to_string()))?;
        let artifact: Artifact =
            serde_json::from_str(&text).map_err(|e| artifact_err(e.to_string()))?;
        if artifact.bytecode.trim_start_matches("0x").is_empty() {
            return Err(artifact_err("empty bytecode".to_string()));
        }
        Ok(artifact.bytecode)
    }

    /// Send a transaction and poll until its receipt appears. No timeout.
    async fn submit(
        &self,
        tx: Value,
        observer: &dyn ProgressObserver,
    ) -> Result<Receipt, ChainError> {
        let tx_hash: String = match self.rpc.request("eth_sendTransaction", [tx]).await {
            Ok(hash) => hash,
            Err(e) => {
                observer.notify(TxProgress::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        observer.notify(TxProgress::Submitted {
            tx_hash: tx_hash.clone(),
        });

        let receipt = loop {
            tokio::time::sleep(self.receipt_poll).await;
            let polled: Result<Option<ReceiptJson>, ChainError> = self
                .rpc
                .request("eth_getTransactionReceipt", [&tx_hash])
                .await;
            match polled {
                Ok(Some(r)) => break Receipt::try_from(r),
                Ok(None) => continue,
                Err(e) => break Err(e),
            }
        };

        let receipt = match receipt {
            Ok(r) => r,
            Err(e) => {
                observer.notify(TxProgress::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        if !receipt.status {
            let err = ChainError::Reverted {
                tx_hash: receipt.tx_hash.clone(),
            };
            observer.notify(TxProgress::Error {
                message: err.to_string(),
            });
            return Err(err);
        }

        observer.notify(TxProgress::Confirmed {
            tx_hash: receipt.tx_hash.clone(),
            block: receipt.block_number,
        });
        observer.notify(TxProgress::Receipt {
            tx_hash: receipt.tx_hash.clone(),
        });
        Ok(receipt)
    }
}

#[async_trait]
impl ChainClient for RpcChain {
    async fn deploy(
        &self,
        from: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<String, ChainError> {
        let bytecode = match self.load_bytecode().await {
            Ok(b) => b,
            Err(e) => {
                observer.notify(TxProgress::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        let tx = json!({
            "from": from,
            "data": bytecode,
            "gasPrice": format!("0x{:x}", self.gas_price),
        });

        let receipt = self.submit(tx, observer).await?;
        let Some(address) = receipt.contract_address else {
            let err = ChainError::Malformed("deploy receipt has no contractAddress".into());
            observer.notify(TxProgress::Error {
                message: err.to_string(),
            });
            return Err(err);
        };
        info!("contract deployed at {} by {}", address, from);
        observer.notify(TxProgress::Deployed {
            address: address.clone(),
        });
        Ok(address)
    }

    async fn call(&self, contract: &str, data: Bytes) -> Result<Bytes, ChainError> {
        let params = json!([{ "to": contract, "data": hex::encode_prefixed(&data) }, "latest"]);
        let ret: String = self.rpc.request("eth_call", params).await?;
        decode_hex(&ret)
    }

    async fn send(
        &self,
        contract: &str,
        data: Bytes,
        tx: TxRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<Receipt, ChainError> {
        let tx = json!({
            "from": tx.from,
            "to": contract,
            "data": hex::encode_prefixed(&data),
            "value": format!("0x{:x}", tx.value),
        });
        self.submit(tx, observer).await
    }

    async fn subscribe(
        &self,
        contract: &str,
        events: mpsc::Sender<ContractEvent>,
    ) -> Result<(), ChainError> {
        subscription::spawn(&self.ws_url, contract, events).await
    }
}

// ---------------------------------------------------------------------------
// RpcWallet
// ---------------------------------------------------------------------------

/// Wallet provider backed by the node's account list.
pub struct RpcWallet {
    rpc: Arc<JsonRpcClient>,
    accounts_method: String,
}

impl RpcWallet {
    pub fn new(rpc: Arc<JsonRpcClient>, accounts_method: impl Into<String>) -> Self {
        Self {
            rpc,
            accounts_method: accounts_method.into(),
        }
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, ChainError> {
        self.rpc
            .request(&self.accounts_method, Vec::<Value>::new())
            .await
    }

    async fn probe(&self) -> Result<String, ChainError> {
        let version: String = self
            .rpc
            .request("web3_clientVersion", Vec::<Value>::new())
            .await?;
        if version.is_empty() {
            warn!("wallet provider returned an empty client version");
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_error_maps_to_rpc_error() {
        let env = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "insufficient funds"}});
        let err = parse_envelope::<String>(env).unwrap_err();
        match err {
            ChainError::Rpc { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "insufficient funds");
            }
            other => panic!("expected Rpc, got {other}"),
        }
    }

    #[test]
    fn null_result_is_none_for_optional() {
        let env = json!({"jsonrpc": "2.0", "id": 1, "result": null});
        let r: Option<ReceiptJson> = parse_envelope(env).unwrap();
        assert!(r.is_none());
    }

    #[test]
    fn null_result_is_malformed_for_required() {
        let env = json!({"jsonrpc": "2.0", "id": 1, "result": null});
        let err = parse_envelope::<String>(env).unwrap_err();
        assert!(matches!(err, ChainError::Malformed(_)));
    }

    #[test]
    fn receipt_json_converts() {
        let env = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {
                "transactionHash": "0xaa",
                "blockNumber": "0x1b",
                "contractAddress": "0x00000000000000000000000000000000000000AB",
                "status": "0x1",
                "logs": [{
                    "address": "0x00000000000000000000000000000000000000ab",
                    "topics": ["0x0000000000000000000000000000000000000000000000000000000000000001"],
                    "data": "0x0102"
                }]
            }
        });
        let r: Option<ReceiptJson> = parse_envelope(env).unwrap();
        let receipt = Receipt::try_from(r.unwrap()).unwrap();
        assert_eq!(receipt.tx_hash, "0xaa");
        assert_eq!(receipt.block_number, 27);
        assert!(receipt.status);
        assert_eq!(
            receipt.contract_address.as_deref(),
            Some("0x00000000000000000000000000000000000000AB")
        );
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].data.as_ref(), &[1u8, 2][..]);
        assert_eq!(receipt.logs[0].topics[0], B256::with_last_byte(1));
    }

    #[test]
    fn failed_status_is_not_success() {
        let r = ReceiptJson {
            transaction_hash: "0xbb".into(),
            block_number: Some("0x2".into()),
            contract_address: None,
            status: Some("0x0".into()),
            logs: vec![],
        };
        assert!(!Receipt::try_from(r).unwrap().status);
    }

    #[test]
    fn bad_topic_is_malformed() {
        let log = LogJson {
            address: "0xab".into(),
            topics: vec!["zz".into()],
            data: "0x".into(),
        };
        assert!(matches!(
            RawLog::try_from(log),
            Err(ChainError::Malformed(_))
        ));
    }
}
