// Auction lifecycle: session-scoped view state and the listing pipeline.

pub mod listing;
pub mod session;

use thiserror::Error;

/// Local input problems. Reported to the user as a blocking alert; nothing is
/// sent to the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no wallet account is active")]
    MissingAccount,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("no file selected")]
    NoFile,

    #[error("cannot read {path}: {message}")]
    UnreadableFile { path: String, message: String },

    #[error("invalid {field}: {value:?}")]
    InvalidAmount { field: &'static str, value: String },

    #[error("no contract deployed for this account")]
    NoContract,

    #[error("no token selected")]
    NoSelection,
}
