//! Messages exchanged with the coprocessor's decryption services.
//!
//! Two unrelated flows live here:
//! - public decryption: the KMS signers attest that `clear` is the plaintext of a
//!   specific handle ([DecryptionProof]). Anyone may verify it.
//! - user decryption: a player signs a time-bounded consent ([SignedUserDecrypt])
//!   naming a one-time X25519 key. The coprocessor reveals handles on the
//!   player's ACL sealed to that key ([Sealed]), so only the holder of its
//!   private half can read them.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, RangeCfg, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey, Signature},
    sha256::{Digest, Sha256},
    Hasher, Signer, Verifier,
};
use commonware_utils::union;

use super::{
    Handle, MAX_ATTESTATIONS, MAX_CLEAR_BYTES, MAX_CONSENT_CONTRACTS, MAX_USER_DECRYPT_HANDLES,
    REENCRYPTION_KEY_SIZE, SEALED_VALUE_SIZE, SECONDS_PER_DAY,
};

pub const KMS_SUFFIX: &[u8] = b"_KMS";
pub const USER_DECRYPT_SUFFIX: &[u8] = b"_USER_DECRYPT";
pub const SEAL_SUFFIX: &[u8] = b"_SEAL";

#[inline]
pub fn kms_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, KMS_SUFFIX)
}

#[inline]
pub fn user_decrypt_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, USER_DECRYPT_SUFFIX)
}

/// Identity of the application that owns ciphertexts, derived from its namespace.
pub fn contract_id(namespace: &[u8]) -> Digest {
    Sha256::hash(namespace)
}

/// Payload a KMS signer attests to: the handle followed by the clear bytes.
pub fn public_decryption_message(handle: &Handle, clear: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(Handle::SIZE + clear.len());
    message.extend_from_slice(handle.as_ref());
    message.extend_from_slice(clear);
    message
}

/// One KMS signer's signature over a [public_decryption_message].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attestation {
    pub signer: PublicKey,
    pub signature: Signature,
}

impl Attestation {
    pub fn sign(kms: &PrivateKey, namespace: &[u8], handle: &Handle, clear: &[u8]) -> Self {
        Self {
            signer: kms.public_key(),
            signature: kms.sign(
                Some(&kms_namespace(namespace)),
                &public_decryption_message(handle, clear),
            ),
        }
    }

    pub fn verify(&self, namespace: &[u8], handle: &Handle, clear: &[u8]) -> bool {
        self.signer.verify(
            Some(&kms_namespace(namespace)),
            &public_decryption_message(handle, clear),
            &self.signature,
        )
    }
}

impl Write for Attestation {
    fn write(&self, writer: &mut impl BufMut) {
        self.signer.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Attestation {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            signer: PublicKey::read(reader)?,
            signature: Signature::read(reader)?,
        })
    }
}

impl FixedSize for Attestation {
    const SIZE: usize = PublicKey::SIZE + Signature::SIZE;
}

/// Proof that some clear bytes are the plaintext of one particular handle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecryptionProof {
    pub attestations: Vec<Attestation>,
}

impl Write for DecryptionProof {
    fn write(&self, writer: &mut impl BufMut) {
        self.attestations.write(writer);
    }
}

impl Read for DecryptionProof {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            attestations: Vec::<Attestation>::read_range(reader, 0..=MAX_ATTESTATIONS)?,
        })
    }
}

impl EncodeSize for DecryptionProof {
    fn encode_size(&self) -> usize {
        self.attestations.encode_size()
    }
}

/// Result of a public decryption: the clear bytes and the proof binding them
/// to `handle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opening {
    pub handle: Handle,
    pub clear: Vec<u8>,
    pub proof: DecryptionProof,
}

impl Write for Opening {
    fn write(&self, writer: &mut impl BufMut) {
        self.handle.write(writer);
        self.clear.write(writer);
        self.proof.write(writer);
    }
}

impl Read for Opening {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            handle: Handle::read(reader)?,
            clear: Vec::<u8>::read_range(reader, 0..=MAX_CLEAR_BYTES)?,
            proof: DecryptionProof::read(reader)?,
        })
    }
}

impl EncodeSize for Opening {
    fn encode_size(&self) -> usize {
        self.handle.encode_size() + self.clear.encode_size() + self.proof.encode_size()
    }
}

/// What a player consents to when asking for a private decryption.
///
/// Binary: [ephemeral:32] [contracts:vec<32>] [startSecs:u64] [durationDays:u32]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDecryptRequest {
    /// X25519 public key generated for this request only. Revealed values are
    /// sealed to it.
    pub ephemeral: [u8; REENCRYPTION_KEY_SIZE],
    /// Applications whose ciphertexts may be revealed.
    pub contracts: Vec<Digest>,
    pub start_secs: u64,
    pub duration_days: u32,
}

impl UserDecryptRequest {
    /// First second after which the consent no longer holds.
    pub fn expires_at(&self) -> u64 {
        self.start_secs
            .saturating_add(SECONDS_PER_DAY.saturating_mul(self.duration_days as u64))
    }

    pub fn is_valid_at(&self, now_secs: u64) -> bool {
        now_secs >= self.start_secs && now_secs < self.expires_at()
    }
}

impl Write for UserDecryptRequest {
    fn write(&self, writer: &mut impl BufMut) {
        self.ephemeral.write(writer);
        self.contracts.write(writer);
        self.start_secs.write(writer);
        self.duration_days.write(writer);
    }
}

impl Read for UserDecryptRequest {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            ephemeral: <[u8; REENCRYPTION_KEY_SIZE]>::read(reader)?,
            contracts: Vec::<Digest>::read_cfg(
                reader,
                &(RangeCfg::from(1..=MAX_CONSENT_CONTRACTS), ()),
            )?,
            start_secs: u64::read(reader)?,
            duration_days: u32::read(reader)?,
        })
    }
}

impl EncodeSize for UserDecryptRequest {
    fn encode_size(&self) -> usize {
        self.ephemeral.encode_size()
            + self.contracts.encode_size()
            + self.start_secs.encode_size()
            + self.duration_days.encode_size()
    }
}

/// A [UserDecryptRequest] signed by the player it authorizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedUserDecrypt {
    pub request: UserDecryptRequest,
    pub user: PublicKey,
    pub signature: Signature,
}

impl SignedUserDecrypt {
    fn payload(request: &UserDecryptRequest) -> Vec<u8> {
        let mut payload = Vec::with_capacity(request.encode_size());
        request.write(&mut payload);
        payload
    }

    pub fn sign(user: &PrivateKey, namespace: &[u8], request: UserDecryptRequest) -> Self {
        let signature = user.sign(
            Some(&user_decrypt_namespace(namespace)),
            &Self::payload(&request),
        );
        Self {
            request,
            user: user.public_key(),
            signature,
        }
    }

    pub fn verify(&self, namespace: &[u8]) -> bool {
        self.user.verify(
            Some(&user_decrypt_namespace(namespace)),
            &Self::payload(&self.request),
            &self.signature,
        )
    }
}

impl Write for SignedUserDecrypt {
    fn write(&self, writer: &mut impl BufMut) {
        self.request.write(writer);
        self.user.write(writer);
        self.signature.write(writer);
    }
}

impl Read for SignedUserDecrypt {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            request: UserDecryptRequest::read(reader)?,
            user: PublicKey::read(reader)?,
            signature: Signature::read(reader)?,
        })
    }
}

impl EncodeSize for SignedUserDecrypt {
    fn encode_size(&self) -> usize {
        self.request.encode_size() + self.user.encode_size() + self.signature.encode_size()
    }
}

/// Pad XORed over the clear value of `handle` when it is sealed under the
/// X25519 secret `shared`.
pub fn seal_pad(shared: &[u8; 32], handle: &Handle) -> [u8; SEALED_VALUE_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(SEAL_SUFFIX);
    hasher.update(shared);
    hasher.update(handle.as_ref());
    let digest = hasher.finalize();
    let mut pad = [0u8; SEALED_VALUE_SIZE];
    pad.copy_from_slice(&digest.as_ref()[..SEALED_VALUE_SIZE]);
    pad
}

/// XORs `pad` over `bytes`. Seals a clear value and opens a sealed one.
pub fn apply_pad(
    bytes: [u8; SEALED_VALUE_SIZE],
    pad: &[u8; SEALED_VALUE_SIZE],
) -> [u8; SEALED_VALUE_SIZE] {
    let mut out = bytes;
    for (byte, mask) in out.iter_mut().zip(pad) {
        *byte ^= mask;
    }
    out
}

/// Result of a user decryption: one sealed value per requested handle, in
/// request order, readable only with the private half of the consent's
/// ephemeral key.
///
/// Binary: [sender:32] [values:vec<8>]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    /// X25519 key of the coprocessor that sealed the values.
    pub sender: [u8; REENCRYPTION_KEY_SIZE],
    pub values: Vec<[u8; SEALED_VALUE_SIZE]>,
}

impl Write for Sealed {
    fn write(&self, writer: &mut impl BufMut) {
        self.sender.write(writer);
        self.values.write(writer);
    }
}

impl Read for Sealed {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            sender: <[u8; REENCRYPTION_KEY_SIZE]>::read(reader)?,
            values: Vec::<[u8; SEALED_VALUE_SIZE]>::read_range(
                reader,
                0..=MAX_USER_DECRYPT_HANDLES,
            )?,
        })
    }
}

impl EncodeSize for Sealed {
    fn encode_size(&self) -> usize {
        self.sender.encode_size() + self.values.encode_size()
    }
}
