// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod account_sync;
pub mod app;
pub mod auction;
pub mod chain;
pub mod config;
pub mod event_log;
pub mod protocol;
pub mod storage;
pub mod tui;
