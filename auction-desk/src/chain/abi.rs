// Auction contract ABI and typed contract events.

use alloy_primitives::{LogData, U256};
use alloy_sol_types::{sol, SolEvent};
use tracing::debug;

use super::{RawLog, Receipt, TokenId};

sol! {
    interface IItem {
        function mintToken(string metadataURI, uint256 price, uint256 time) external;
        function bid(uint256 tokenId) external payable;
        function auctionEnd(uint256 tokenId) external;
        function getInfo(uint256 tokenId) external view returns (
            address beneficiary,
            uint256 price,
            uint256 auctionEndTime,
            address highestBidder,
            bool ended
        );
        function ownerOf(uint256 tokenId) external view returns (address);
        function tokenURI(uint256 tokenId) external view returns (string);

        event MintEvent(uint256 tokenId, address creater, string metadataURI, uint256 price, uint256 auctionEndTime);
        event HighestBidIncreased(uint256 tokenId, address bidder, uint256 amount);
        event AuctionEnded(uint256 tokenId, address bidder, uint256 amount);
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

/// An event emitted by one auction contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractEvent {
    /// Emitting contract, as reported by the node.
    pub address: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Mint {
        token_id: TokenId,
        creater: String,
        metadata_uri: String,
        price: U256,
        auction_end_time: U256,
    },
    HighestBidIncreased {
        token_id: TokenId,
        bidder: String,
        amount: U256,
    },
    AuctionEnded {
        token_id: TokenId,
        bidder: String,
        amount: U256,
    },
    Transfer {
        from: String,
        to: String,
        token_id: TokenId,
    },
}

impl EventPayload {
    pub fn token_id(&self) -> TokenId {
        match self {
            EventPayload::Mint { token_id, .. }
            | EventPayload::HighestBidIncreased { token_id, .. }
            | EventPayload::AuctionEnded { token_id, .. }
            | EventPayload::Transfer { token_id, .. } => *token_id,
        }
    }
}

impl ContractEvent {
    /// Decode a raw log into one of the known contract events.
    ///
    /// Returns `None` for logs with an unknown signature or a payload that
    /// does not decode.
    pub fn from_raw(log: &RawLog) -> Option<ContractEvent> {
        let topic0 = *log.topics.first()?;
        let data = LogData::new(log.topics.clone(), log.data.clone())?;

        let payload = if topic0 == IItem::MintEvent::SIGNATURE_HASH {
            let e = IItem::MintEvent::decode_log_data(&data).ok()?;
            EventPayload::Mint {
                token_id: e.tokenId,
                creater: e.creater.to_string(),
                metadata_uri: e.metadataURI,
                price: e.price,
                auction_end_time: e.auctionEndTime,
            }
        } else if topic0 == IItem::HighestBidIncreased::SIGNATURE_HASH {
            let e = IItem::HighestBidIncreased::decode_log_data(&data).ok()?;
            EventPayload::HighestBidIncreased {
                token_id: e.tokenId,
                bidder: e.bidder.to_string(),
                amount: e.amount,
            }
        } else if topic0 == IItem::AuctionEnded::SIGNATURE_HASH {
            let e = IItem::AuctionEnded::decode_log_data(&data).ok()?;
            EventPayload::AuctionEnded {
                token_id: e.tokenId,
                bidder: e.bidder.to_string(),
                amount: e.amount,
            }
        } else if topic0 == IItem::Transfer::SIGNATURE_HASH {
            let e = IItem::Transfer::decode_log_data(&data).ok()?;
            EventPayload::Transfer {
                from: e.from.to_string(),
                to: e.to.to_string(),
                token_id: e.tokenId,
            }
        } else {
            debug!("ignoring log with unknown topic {}", topic0);
            return None;
        };

        Some(ContractEvent {
            address: log.address.clone(),
            payload,
        })
    }
}

/// Token id assigned by a mint, taken from the receipt's `Transfer` log.
pub fn token_id_from_receipt(receipt: &Receipt) -> Option<TokenId> {
    receipt
        .logs
        .iter()
        .filter_map(ContractEvent::from_raw)
        .find_map(|event| match event.payload {
            EventPayload::Transfer { token_id, .. } => Some(token_id),
            _ => None,
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Raw log for an encoded event, as a node would deliver it.
    pub fn raw_log<E: SolEvent>(address: &str, event: &E) -> RawLog {
        let data = event.encode_log_data();
        RawLog {
            address: address.to_string(),
            topics: data.topics().to_vec(),
            data: data.data.clone(),
        }
    }
}
