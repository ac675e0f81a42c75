//! Confidential Sic Bo round settlement.
//!
//! Bets are placed against encrypted dice. The payout is computed on
//! ciphertexts and only becomes public once the player asks for settlement,
//! after which anyone may finalize the round with a proven decryption.

pub mod coprocessor;
pub mod decryption;
pub mod dice;
pub mod fhe;
pub mod ledger;
pub mod payout;
pub mod token;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod error;
mod layer;
mod state;

pub use error::Error;
pub use layer::Layer;
pub use payout::Limits;
pub use state::{load_account, nonce, Memory, PrepareError, State};
