// Session-scoped state: contract binding status, selection, listing draft,
// and the cached view of the selected token.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};

use crate::chain::abi::EventPayload;
use crate::chain::units::from_wei;
use crate::chain::{same_address, AuctionInfo, TokenId};
use crate::protocol::{FieldEdit, FormField};
use crate::storage::Metadata;

/// Placeholder shown for an unselected contract or token.
pub const UNSELECTED: &str = "---";

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Contract binding status of the active account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractState {
    #[default]
    NoContract,
    Deploying,
    Ready,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The (contract, token) pair being inspected. Either half may be unset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub contract: Option<String>,
    pub token_id: Option<TokenId>,
}

impl Selection {
    /// Both halves are set.
    pub fn complete(&self) -> Option<(&str, TokenId)> {
        Some((self.contract.as_deref()?, self.token_id?))
    }

    /// Whether an event from `contract` about `token_id` concerns this
    /// selection. Addresses compare case-insensitively.
    pub fn matches(&self, contract: &str, token_id: TokenId) -> bool {
        match self.complete() {
            Some((selected, id)) => same_address(selected, contract) && id == token_id,
            None => false,
        }
    }

    pub fn contract_label(&self) -> &str {
        self.contract.as_deref().unwrap_or(UNSELECTED)
    }

    pub fn token_label(&self) -> String {
        self.token_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| UNSELECTED.to_string())
    }
}

// ---------------------------------------------------------------------------
// Listing draft
// ---------------------------------------------------------------------------

/// Text entered in the listing form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    /// Path of the asset file on disk.
    pub file: String,
    /// Starting price in ether.
    pub start_price: String,
    pub duration_minutes: String,
}

impl Default for ListingDraft {
    fn default() -> Self {
        ListingDraft {
            title: String::new(),
            description: String::new(),
            file: String::new(),
            start_price: DEFAULT_PRICE.to_string(),
            duration_minutes: "5".to_string(),
        }
    }
}

/// Initial start and bid price, in ether.
pub const DEFAULT_PRICE: &str = "0.001";

impl ListingDraft {
    /// Apply a keystroke. Returns `false` for fields outside the draft.
    pub fn apply(&mut self, field: FormField, edit: FieldEdit) -> bool {
        let target = match field {
            FormField::Title => &mut self.title,
            FormField::Description => &mut self.description,
            FormField::File => &mut self.file,
            FormField::StartPrice => &mut self.start_price,
            FormField::Duration => &mut self.duration_minutes,
            FormField::BidPrice => return false,
        };
        apply_edit(target, edit);
        true
    }

    pub fn value(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::Title => Some(&self.title),
            FormField::Description => Some(&self.description),
            FormField::File => Some(&self.file),
            FormField::StartPrice => Some(&self.start_price),
            FormField::Duration => Some(&self.duration_minutes),
            FormField::BidPrice => None,
        }
    }
}

pub fn apply_edit(target: &mut String, edit: FieldEdit) {
    match edit {
        FieldEdit::Push(c) => target.push(c),
        FieldEdit::Pop => {
            target.pop();
        }
    }
}

// ---------------------------------------------------------------------------
// Token view
// ---------------------------------------------------------------------------

/// Auction phase of a token as far as the cached fields tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionPhase {
    Unminted,
    Listed,
    Bidding,
    Ended,
}

/// Cached on-chain state of the selected token. Each field is filled by its
/// own read or event; there is no atomicity across them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenView {
    pub metadata: Option<Metadata>,
    pub beneficiary: String,
    pub owner: String,
    pub highest_bidder: String,
    /// Current price in ether.
    pub price: Option<String>,
    /// Auction deadline in milliseconds since the epoch (chain seconds * 1000).
    pub auction_end_time_ms: u64,
    pub ended: bool,
}

/// Chain seconds to display milliseconds.
pub fn end_time_ms(seconds: U256) -> u64 {
    u64::try_from(seconds).unwrap_or(u64::MAX).saturating_mul(1000)
}

impl TokenView {
    pub fn apply_info(&mut self, info: &AuctionInfo) {
        self.beneficiary = info.beneficiary.clone();
        self.price = Some(from_wei(info.price));
        self.auction_end_time_ms = end_time_ms(info.auction_end_time);
        self.highest_bidder = info.highest_bidder.clone();
        self.ended = info.ended;
    }

    /// Apply a contract event that has already been matched to the selection.
    /// Returns `true` if any field changed.
    pub fn apply_event(&mut self, payload: &EventPayload) -> bool {
        match payload {
            EventPayload::HighestBidIncreased { bidder, amount, .. } => {
                self.highest_bidder = bidder.clone();
                self.price = Some(from_wei(*amount));
                true
            }
            EventPayload::AuctionEnded { bidder, amount, .. } => {
                self.highest_bidder = bidder.clone();
                self.price = Some(from_wei(*amount));
                self.ended = true;
                true
            }
            EventPayload::Transfer { to, .. } => {
                self.owner = to.clone();
                true
            }
            EventPayload::Mint { .. } => false,
        }
    }

    pub fn phase(&self) -> AuctionPhase {
        if self.price.is_none() {
            AuctionPhase::Unminted
        } else if self.ended {
            AuctionPhase::Ended
        } else if self.highest_bidder.is_empty() || same_address(&self.highest_bidder, ZERO_ADDRESS)
        {
            AuctionPhase::Listed
        } else {
            AuctionPhase::Bidding
        }
    }

    /// `auction_end_time_ms` as a UTC timestamp, if representable.
    pub fn auction_end(&self) -> Option<DateTime<Utc>> {
        if self.auction_end_time_ms == 0 {
            return None;
        }
        i64::try_from(self.auction_end_time_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// The active account owns the token and may end its auction.
    pub fn owned_by(&self, account: Option<&str>) -> bool {
        match account {
            Some(a) if !self.owner.is_empty() => same_address(a, &self.owner),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_defaults() {
        let d = ListingDraft::default();
        assert!(d.title.is_empty());
        assert!(d.file.is_empty());
        assert_eq!(d.start_price, "0.001");
        assert_eq!(d.duration_minutes, "5");
    }

    #[test]
    fn draft_edits() {
        let mut d = ListingDraft::default();
        assert!(d.apply(FormField::Title, FieldEdit::Push('A')));
        assert!(d.apply(FormField::Title, FieldEdit::Push('r')));
        assert!(d.apply(FormField::Duration, FieldEdit::Pop));
        assert!(d.apply(FormField::Duration, FieldEdit::Push('9')));
        assert!(!d.apply(FormField::BidPrice, FieldEdit::Push('1')));
        assert_eq!(d.title, "Ar");
        assert_eq!(d.duration_minutes, "9");

        let mut empty = String::new();
        apply_edit(&mut empty, FieldEdit::Pop);
        assert!(empty.is_empty());
    }

    #[test]
    fn selection_matches_ignoring_case() {
        let sel = Selection {
            contract: Some("0xAbC".into()),
            token_id: Some(U256::from(1)),
        };
        assert!(sel.matches("0xabc", U256::from(1)));
        assert!(sel.matches("0XABC".to_lowercase().as_str(), U256::from(1)));
        assert!(!sel.matches("0xabd", U256::from(1)));
        assert!(!sel.matches("0xabc", U256::from(2)));

        let half = Selection {
            contract: Some("0xabc".into()),
            token_id: None,
        };
        assert!(!half.matches("0xabc", U256::from(1)));
        assert_eq!(half.token_label(), UNSELECTED);
    }

    #[test]
    fn end_time_is_seconds_times_thousand() {
        assert_eq!(end_time_ms(U256::from(1_700_000_000u64)), 1_700_000_000_000);
        assert_eq!(end_time_ms(U256::MAX), u64::MAX);
    }

    #[test]
    fn info_then_events_drive_phase() {
        let mut view = TokenView::default();
        assert_eq!(view.phase(), AuctionPhase::Unminted);

        view.apply_info(&AuctionInfo {
            beneficiary: "0xSeller".into(),
            price: U256::from(1_000_000_000_000_000u64),
            auction_end_time: U256::from(1_700_000_000u64),
            highest_bidder: ZERO_ADDRESS.into(),
            ended: false,
        });
        assert_eq!(view.phase(), AuctionPhase::Listed);
        assert_eq!(view.price.as_deref(), Some("0.001"));
        assert_eq!(view.auction_end_time_ms, 1_700_000_000_000);
        assert!(view.auction_end().is_some());

        assert!(view.apply_event(&EventPayload::HighestBidIncreased {
            token_id: U256::from(1),
            bidder: "0xBuyer".into(),
            amount: U256::from(2_000_000_000_000_000u64),
        }));
        assert_eq!(view.phase(), AuctionPhase::Bidding);
        assert_eq!(view.price.as_deref(), Some("0.002"));

        assert!(view.apply_event(&EventPayload::AuctionEnded {
            token_id: U256::from(1),
            bidder: "0xBuyer".into(),
            amount: U256::from(2_000_000_000_000_000u64),
        }));
        assert_eq!(view.phase(), AuctionPhase::Ended);

        assert!(view.apply_event(&EventPayload::Transfer {
            from: "0xSeller".into(),
            to: "0xBuyer".into(),
            token_id: U256::from(1),
        }));
        assert!(view.owned_by(Some("0xbuyer")));
        assert!(!view.owned_by(Some("0xseller")));
        assert!(!view.owned_by(None));
    }
}
