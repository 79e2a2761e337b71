//! Error types for the orchestration client

use thiserror::Error;

/// Main error type covering the full transaction lifecycle
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid signing credential: {0}")]
    InvalidCredential(String),

    #[error("Chain connection error: {0}")]
    ChainConnection(String),

    #[error("Unknown function {function} on contract {contract}")]
    UnknownFunction { contract: String, function: String },

    #[error("Invalid arguments for {function}: {message}")]
    InvalidArguments { function: String, message: String },

    #[error("Incompatible units: {left} vs {right} decimals")]
    IncompatibleUnits { left: u8, right: u8 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance of {token}: have {have}, need {need}")]
    InsufficientBalance {
        token: String,
        have: String,
        need: String,
    },

    #[error("Insufficient allowance for {spender} on {token}: have {have}, need {need}")]
    InsufficientAllowance {
        token: String,
        spender: String,
        have: String,
        need: String,
    },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Nonce error: {0}")]
    Nonce(String),

    #[error("Pre-flight simulation would revert: {reason}")]
    WouldRevert { reason: String },

    #[error("Submission rejected (nonce {nonce}): {reason}")]
    SubmissionRejected { nonce: u64, reason: String },

    #[error("Transaction {tx_hash} reverted on-chain (nonce {nonce}): {reason}")]
    Reverted {
        tx_hash: String,
        nonce: u64,
        reason: String,
    },

    #[error("Transaction {tx_hash} dropped after {blocks_waited} blocks (nonce {nonce})")]
    Dropped {
        tx_hash: String,
        nonce: u64,
        blocks_waited: u64,
    },

    #[error("Timed out after {waited_secs}s waiting on {tx_hash}; still pending, re-attach with `watch`")]
    TimedOut { tx_hash: String, waited_secs: u64 },
}

impl OrchestratorError {
    /// True when the failure is known to have happened before anything
    /// was broadcast, so no fee was spent and nothing is in flight.
    /// `ChainConnection` is excluded: the transport can also fail while
    /// a broadcast transaction is being watched.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Configuration(_)
                | OrchestratorError::InvalidCredential(_)
                | OrchestratorError::UnknownFunction { .. }
                | OrchestratorError::InvalidArguments { .. }
                | OrchestratorError::IncompatibleUnits { .. }
                | OrchestratorError::InvalidAmount(_)
                | OrchestratorError::InsufficientBalance { .. }
                | OrchestratorError::InsufficientAllowance { .. }
                | OrchestratorError::GasEstimation(_)
                | OrchestratorError::Nonce(_)
                | OrchestratorError::WouldRevert { .. }
                | OrchestratorError::SubmissionRejected { .. }
        )
    }

    /// The hash of the broadcast transaction, if one exists.
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            OrchestratorError::Reverted { tx_hash, .. }
            | OrchestratorError::Dropped { tx_hash, .. }
            | OrchestratorError::TimedOut { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }
}

/// Result type for orchestration operations
pub type OrchResult<T> = Result<T, OrchestratorError>;
