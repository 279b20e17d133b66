// Message types exchanged between the coordinator loop and the TUI.

use std::collections::BTreeMap;

use crate::auction::session::{ContractState, ListingDraft, Selection, TokenView};
use crate::chain::TokenId;

/// Which half of the UI is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Listing,
    Bidding,
}

/// Editable text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    File,
    StartPrice,
    Duration,
    BidPrice,
}

impl FormField {
    /// Focus order of the fields in each mode.
    pub fn cycle(mode: Mode) -> &'static [FormField] {
        match mode {
            Mode::Listing => &[
                FormField::Title,
                FormField::Description,
                FormField::File,
                FormField::StartPrice,
                FormField::Duration,
            ],
            Mode::Bidding => &[FormField::BidPrice],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Name",
            FormField::Description => "Description",
            FormField::File => "File",
            FormField::StartPrice => "Start price (eth)",
            FormField::Duration => "Duration (min)",
            FormField::BidPrice => "Bid (eth)",
        }
    }
}

/// One keystroke applied to a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEdit {
    Push(char),
    Pop,
}

/// Commands sent from the TUI to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SwitchMode(Mode),
    Edit { field: FormField, edit: FieldEdit },
    Deploy,
    List,
    SelectContract(Option<String>),
    SelectToken(Option<TokenId>),
    Bid,
    EndAuction,
    Quit,
}

/// Updates pushed from the coordinator to the TUI.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    Snapshot(Box<AppSnapshot>),
    /// One character drained from the event log.
    LogAppend(char),
    /// Scroll the event log to its end.
    TailLog,
    /// Blocking message for the user.
    Alert(String),
}

/// Everything the TUI renders apart from the event log.
#[derive(Debug, Clone, Default)]
pub struct AppSnapshot {
    pub account: Option<String>,
    pub mode: Mode,
    pub contract_state: ContractState,
    /// Contract bound to the active account.
    pub contract_address: Option<String>,
    /// All contracts deployed this session, keyed by deploying account.
    pub contracts: BTreeMap<String, String>,
    /// Token ids of the selected contract, in mint order.
    pub token_ids: Vec<TokenId>,
    pub selection: Selection,
    pub draft: ListingDraft,
    pub added_file_cid: Option<String>,
    pub added_metadata_cid: Option<String>,
    pub token: TokenView,
    pub bid_price: String,
    /// The active account owns the selected token.
    pub can_end: bool,
    pub log_capacity: Option<usize>,
}
