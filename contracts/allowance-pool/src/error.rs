use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("No active allowance for {beneficiary}")]
    NotFound { beneficiary: String },

    #[error("Requested {requested} exceeds remaining allowance of {available}")]
    ExceedsAllowance {
        requested: Uint128,
        available: Uint128,
    },

    #[error("Token transfer failed: {reason}")]
    TransferFailed { reason: String },

    #[error("Unknown reply id {id}")]
    UnknownReplyId { id: u64 },

    #[error("Cannot migrate: {reason}")]
    InvalidMigration { reason: String },
}
