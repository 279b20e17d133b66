// TUI widget modules for each screen zone.

pub mod bidding;
pub mod event_log;
pub mod listing;
pub mod modal;
pub mod status_bar;
pub mod wallet_missing;
