//! Interface to the encrypted-computation runtime.
//!
//! The round settlement core never sees plaintext dice or payouts. It asks a
//! [Coprocessor] to create ciphertexts, combine them homomorphically, manage who
//! may read them, and open them with a proof once a round is ready to settle.

use commonware_cryptography::{ed25519::PublicKey, sha256::Digest};
use sicbo_types::sicbo::{DecryptionProof, Handle, Sealed, SignedUserDecrypt};
use thiserror::Error;

mod simulated;

pub use simulated::Simulated;

/// Plaintext type of a ciphertext.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FheType {
    Bool,
    U8,
    U64,
}

impl FheType {
    /// Reduces `value` to the range of this type.
    pub fn truncate(self, value: u64) -> u64 {
        match self {
            Self::Bool => value & 1,
            Self::U8 => value & 0xff,
            Self::U64 => value,
        }
    }

    /// Big-endian encoding of a plaintext as returned by public decryption.
    pub fn encode_clear(self, value: u64) -> Vec<u8> {
        match self {
            Self::Bool | Self::U8 => vec![self.truncate(value) as u8],
            Self::U64 => value.to_be_bytes().to_vec(),
        }
    }
}

/// Context a ciphertext belongs to. Ciphertexts of different bindings never
/// combine, so a handle from one round cannot stand in for another's.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    pub contract: Digest,
    pub round_id: u64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoprocessorError {
    #[error("unknown handle {0}")]
    UnknownHandle(Handle),
    #[error("type mismatch: expected {expected:?}, got {got:?}")]
    TypeMismatch { expected: FheType, got: FheType },
    #[error("operands belong to different bindings")]
    BindingMismatch,
    #[error("identity not allowed to decrypt {0}")]
    NotAllowed(Handle),
    #[error("handle {0} is not publicly decryptable")]
    NotPubliclyDecryptable(Handle),
    #[error("invalid user decryption consent")]
    InvalidConsent,
    #[error("user decryption consent expired")]
    ConsentExpired,
    #[error("randomness unavailable")]
    RandomnessUnavailable,
    #[error("invalid range [{min}, {max}]")]
    InvalidRange { min: u8, max: u8 },
}

/// Encrypted-computation runtime.
///
/// Binary operations require both operands to share a [Binding] and return a
/// ciphertext with that binding. Comparisons and `and`/`not` return [FheType::Bool].
pub trait Coprocessor {
    /// Uniform encrypted `U8` in `[min, max]`.
    fn random(&mut self, binding: &Binding, min: u8, max: u8) -> Result<Handle, CoprocessorError>;

    /// Encrypts a public constant.
    fn trivial(
        &mut self,
        binding: &Binding,
        ty: FheType,
        value: u64,
    ) -> Result<Handle, CoprocessorError>;

    /// Wrapping addition of two `U8` or two `U64` ciphertexts.
    fn add(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError>;

    fn equals(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError>;
    fn at_least(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError>;
    fn at_most(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError>;
    fn and(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError>;
    fn not(&mut self, value: &Handle) -> Result<Handle, CoprocessorError>;

    /// `condition ? if_true : if_false` without revealing `condition`.
    fn select(
        &mut self,
        condition: &Handle,
        if_true: &Handle,
        if_false: &Handle,
    ) -> Result<Handle, CoprocessorError>;

    /// Lets `identity` privately decrypt `handle`.
    fn allow(&mut self, handle: &Handle, identity: &PublicKey) -> Result<(), CoprocessorError>;

    /// Lets anyone publicly decrypt `handle`. Irreversible.
    fn allow_public(&mut self, handle: &Handle) -> Result<(), CoprocessorError>;

    /// Opens a publicly decryptable handle. Returns the big-endian clear bytes
    /// and a proof that they are the plaintext of exactly `handle`.
    fn public_decrypt(&self, handle: &Handle) -> Result<(Vec<u8>, DecryptionProof), CoprocessorError>;

    /// Checks that `proof` attests `clear` is the plaintext of `handle`.
    fn verify_decryption(&self, handle: &Handle, clear: &[u8], proof: &DecryptionProof) -> bool;

    /// Reveals `handles` to the identity that signed `consent`, if it is on
    /// every handle's ACL and the consent covers the handles' contract at `now`.
    /// Values come back sealed to the consent's ephemeral key.
    fn user_decrypt(
        &self,
        handles: &[Handle],
        consent: &SignedUserDecrypt,
        now: u64,
    ) -> Result<Sealed, CoprocessorError>;
}
