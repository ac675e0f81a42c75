use sicbo_types::sicbo::{
    RoundStatus, ERROR_COPROCESSOR, ERROR_INSUFFICIENT_ALLOWANCE, ERROR_INSUFFICIENT_BANKROLL,
    ERROR_INSUFFICIENT_FUNDS, ERROR_INVALID_AMOUNT, ERROR_INVALID_BET_PARAMETERS,
    ERROR_INVALID_PROOF, ERROR_INVALID_ROUND_STATE, ERROR_NOT_AUTHORIZED,
    ERROR_RANDOMNESS_UNAVAILABLE, ERROR_RATE_LIMITED, ERROR_ROUND_LIMIT_REACHED,
    ERROR_ROUND_NOT_FOUND,
};
use thiserror::Error as ThisError;

use crate::coprocessor::CoprocessorError;

/// Reasons an instruction fails. A failed instruction leaves no trace in state.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    #[error("invalid bet parameters: {0}")]
    InvalidBetParameters(&'static str),
    #[error("round {round_id} is {status:?}")]
    InvalidRoundState { round_id: u64, status: RoundStatus },
    #[error("round {0} not found")]
    RoundNotFound(u64),
    #[error("player already holds {limit} rounds")]
    RoundLimitReached { limit: usize },
    #[error("caller is not the player of round {0}")]
    NotAuthorized(u64),
    #[error("decryption proof does not open the committed ciphertext")]
    InvalidProof,
    #[error("bankroll holds {available}, payout requires {required}")]
    InsufficientBankroll { available: u64, required: u64 },
    #[error("balance {balance} is below {required}")]
    InsufficientFunds { balance: u64, required: u64 },
    #[error("allowance {allowance} is below {required}")]
    InsufficientAllowance { allowance: u64, required: u64 },
    #[error("invalid amount")]
    InvalidAmount,
    #[error("randomness unavailable")]
    RandomnessUnavailable,
    #[error("faucet already claimed, next claim at {next_claim}")]
    RateLimited { next_claim: u64 },
    #[error("sealed reveal holds {got} values, {expected} handles requested")]
    MalformedReveal { expected: usize, got: usize },
    #[error("coprocessor: {0}")]
    Coprocessor(CoprocessorError),
}

impl Error {
    /// Stable code reported in `Event::Rejected`.
    pub fn code(&self) -> u8 {
        match self {
            Self::InvalidBetParameters(_) => ERROR_INVALID_BET_PARAMETERS,
            Self::InvalidRoundState { .. } => ERROR_INVALID_ROUND_STATE,
            Self::RoundNotFound(_) => ERROR_ROUND_NOT_FOUND,
            Self::RoundLimitReached { .. } => ERROR_ROUND_LIMIT_REACHED,
            Self::NotAuthorized(_) => ERROR_NOT_AUTHORIZED,
            Self::InvalidProof => ERROR_INVALID_PROOF,
            Self::InsufficientBankroll { .. } => ERROR_INSUFFICIENT_BANKROLL,
            Self::InsufficientFunds { .. } => ERROR_INSUFFICIENT_FUNDS,
            Self::InsufficientAllowance { .. } => ERROR_INSUFFICIENT_ALLOWANCE,
            Self::InvalidAmount => ERROR_INVALID_AMOUNT,
            Self::RandomnessUnavailable => ERROR_RANDOMNESS_UNAVAILABLE,
            Self::RateLimited { .. } => ERROR_RATE_LIMITED,
            Self::MalformedReveal { .. } | Self::Coprocessor(_) => ERROR_COPROCESSOR,
        }
    }
}

impl From<CoprocessorError> for Error {
    fn from(err: CoprocessorError) -> Self {
        match err {
            CoprocessorError::RandomnessUnavailable => Self::RandomnessUnavailable,
            err => Self::Coprocessor(err),
        }
    }
}
