use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

/// Failures reported by the ledger collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("nonce too low: {0}")]
    NonceTooLow(String),
    #[error("rejected by node: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("pool {pool} does not match pair {token_in} -> {token_out}")]
    PairMismatch { pool: Address, token_in: Address, token_out: Address },

    #[error("contract logic error: {0}")]
    ContractLogic(String),

    #[error("no suitable venue: {answered} of {attempted} venues answered, none passed the reserve guard")]
    NoSuitableVenue { attempted: usize, answered: usize },

    #[error("insufficient balance of {token}: required {required}, available {available}")]
    InsufficientBalance { token: Address, required: U256, available: U256 },

    #[error("{operation} timed out (tx: {tx_hash:?})")]
    TimeoutExceeded { operation: String, tx_hash: Option<B256> },

    #[error("nonce conflict at {nonce}: {reason}")]
    NonceConflict { nonce: u64, reason: String },

    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("transaction {hash} failed with status {status}")]
    TransactionFailed { hash: B256, status: u64 },

    #[error("gas price {requested_gwei} gwei exceeds ceiling {ceiling_gwei} gwei")]
    GasPriceTooHigh { requested_gwei: u64, ceiling_gwei: u64 },

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("ledger error (tx: {tx_hash:?}): {source}")]
    Ledger {
        #[source]
        source: LedgerError,
        tx_hash: Option<B256>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SwapError {
    /// Hash of the transaction involved in the failure, if one was submitted.
    pub fn tx_hash(&self) -> Option<B256> {
        match self {
            SwapError::TransactionFailed { hash, .. } => Some(*hash),
            SwapError::TimeoutExceeded { tx_hash, .. } | SwapError::Ledger { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }

    pub fn timeout(operation: impl Into<String>, tx_hash: Option<B256>) -> Self {
        SwapError::TimeoutExceeded { operation: operation.into(), tx_hash }
    }
}

impl From<LedgerError> for SwapError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound(what) => SwapError::NotFound(what),
            LedgerError::Reverted(reason) => SwapError::ContractLogic(reason),
            err => SwapError::Ledger { source: err, tx_hash: None },
        }
    }
}

pub type Result<T> = std::result::Result<T, SwapError>;
