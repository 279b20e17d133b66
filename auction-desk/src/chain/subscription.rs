// Contract event subscription over WebSocket (`eth_subscribe` logs).

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::abi::ContractEvent;
use super::rpc::LogJson;
use super::{ChainError, RawLog};

/// Connect to `ws_url`, subscribe to logs emitted by `contract`, and spawn a
/// task that forwards decoded events into `events`.
///
/// The forwarding task ends when the socket closes or the receiver is
/// dropped. It does not reconnect.
pub async fn spawn(
    ws_url: &str,
    contract: &str,
    events: mpsc::Sender<ContractEvent>,
) -> Result<(), ChainError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url).await?;
    let (mut write, read) = ws_stream.split();

    let subscribe_msg = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_subscribe",
        "params": ["logs", { "address": contract }]
    });
    write
        .send(Message::Text(subscribe_msg.to_string().into()))
        .await
        .map_err(|e| ChainError::Subscription(e.to_string()))?;
    info!("subscribed to events of {}", contract);

    let contract = contract.to_string();
    tokio::spawn(async move {
        // Keep the write half alive for the lifetime of the subscription.
        let _write = write;
        if process_message_stream(read, &events, &contract).await.is_err() {
            debug!("event receiver for {} dropped", contract);
        }
        info!("event subscription for {} ended", contract);
    });
    Ok(())
}

/// Forward every log notification in `stream` to `tx` as a `ContractEvent`.
///
/// Returns `Err(())` if the channel is closed. Generic over the stream so it
/// can be driven by an in-memory sequence in tests.
pub async fn process_message_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<ContractEvent>,
    contract: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let Some(log) = parse_notification(&text) else {
                    continue;
                };
                match ContractEvent::from_raw(&log) {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            return Err(());
                        }
                    }
                    None => debug!("undecodable log from {}", contract),
                }
            }
            Ok(Message::Close(_)) => {
                info!("node closed event stream for {}", contract);
                break;
            }
            Err(e) => {
                warn!("event stream error for {}: {}", contract, e);
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Extract the raw log from an `eth_subscription` notification.
///
/// Subscription confirmations and other replies yield `None`.
pub fn parse_notification(text: &str) -> Option<RawLog> {
    let json: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("unparseable subscription message: {}", e);
            return None;
        }
    };

    if json.get("method").and_then(Value::as_str) != Some("eth_subscription") {
        if let Some(id) = json.get("result").and_then(Value::as_str) {
            debug!("subscription confirmed: {}", id);
        }
        return None;
    }

    let result = json.get("params")?.get("result")?.clone();
    let log: LogJson = match serde_json::from_value(result) {
        Ok(l) => l,
        Err(e) => {
            warn!("malformed log notification: {}", e);
            return None;
        }
    };
    match RawLog::try_from(log) {
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!("malformed log notification: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::abi::test_support::raw_log;
    use crate::chain::abi::{EventPayload, IItem};
    use alloy_primitives::{hex, Address, U256};
    use futures_util::stream;
    use tokio_tungstenite::tungstenite::Error as WsError;

    fn mock_stream(
        messages: Vec<Result<Message, WsError>>,
    ) -> impl Stream<Item = Result<Message, WsError>> + Unpin {
        stream::iter(messages)
    }

    fn notification(log: &RawLog) -> String {
        let topics: Vec<String> = log.topics.iter().map(|t| t.to_string()).collect();
        json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {
                "subscription": "0x1",
                "result": {
                    "address": log.address,
                    "topics": topics,
                    "data": hex::encode_prefixed(&log.data),
                }
            }
        })
        .to_string()
    }

    fn bid_log(address: &str, token: u64) -> RawLog {
        raw_log(
            address,
            &IItem::HighestBidIncreased {
                tokenId: U256::from(token),
                bidder: Address::repeat_byte(0x07),
                amount: U256::from(1000),
            },
        )
    }

    #[test]
    fn confirmation_is_not_a_log() {
        let text = r#"{"jsonrpc":"2.0","id":1,"result":"0xcd0c3e8af590364c09d0fa6a1210faf5"}"#;
        assert!(parse_notification(text).is_none());
    }

    #[test]
    fn notification_round_trips_log() {
        let log = bid_log("0xAbC", 4);
        let parsed = parse_notification(&notification(&log)).unwrap();
        assert_eq!(parsed, log);
    }

    #[tokio::test]
    async fn events_forwarded_in_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let messages = vec![
            Ok(Message::Text(
                r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#.into(),
            )),
            Ok(Message::Text(notification(&bid_log("0xabc", 1)).into())),
            Ok(Message::Text(notification(&bid_log("0xabc", 2)).into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "0xabc")
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.payload.token_id(), U256::from(1));
        assert_eq!(second.payload.token_id(), U256::from(2));
        assert!(matches!(
            first.payload,
            EventPayload::HighestBidIncreased { .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_frame_ends_stream() {
        let (tx, mut rx) = mpsc::channel(16);
        let messages = vec![
            Ok(Message::Close(None)),
            Ok(Message::Text(notification(&bid_log("0xabc", 1)).into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "0xabc")
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn garbage_is_skipped() {
        let (tx, mut rx) = mpsc::channel(16);
        let messages = vec![
            Ok(Message::Text("not json".into())),
            Ok(Message::Binary(vec![1, 2].into())),
            Ok(Message::Text(notification(&bid_log("0xabc", 9)).into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "0xabc")
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().payload.token_id(), U256::from(9));
    }

    #[tokio::test]
    async fn returns_err_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        let messages = vec![Ok(Message::Text(notification(&bid_log("0xabc", 1)).into()))];
        let result = process_message_stream(mock_stream(messages), &tx, "0xabc").await;
        assert!(result.is_err());
    }
}
