use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    PrivateKeyExt, Signer,
};
use rand::{rngs::StdRng, SeedableRng};
use sicbo_types::{
    execution::{Instruction, Output, Transaction},
    sicbo::{contract_id, SignedUserDecrypt, UserDecryptRequest, DEFAULT_GRANT_DURATION_DAYS},
    NAMESPACE,
};

use crate::{
    coprocessor::Simulated, decryption::EphemeralKey, state::nonce, Layer, Limits, Memory, State,
};

/// Seeds below this are left for account keys.
const KMS_SEED_OFFSET: u64 = 1 << 32;

/// KMS signers of [create_coprocessor].
pub const TEST_KMS_SIGNERS: usize = 3;

/// Attestations [create_coprocessor] requires per proof.
pub const TEST_KMS_THRESHOLD: usize = 2;

/// Creates an account keypair for Ed25519 signatures used by users
pub fn create_account_keypair(seed: u64) -> (PrivateKey, PublicKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = PrivateKey::from_rng(&mut rng);
    let public = private.public_key();
    (private, public)
}

/// Creates `signers` KMS keys that never collide with account keys
pub fn create_kms(signers: usize) -> Vec<PrivateKey> {
    (0..signers as u64)
        .map(|i| create_account_keypair(KMS_SEED_OFFSET + i).0)
        .collect()
}

/// Creates a coprocessor for [NAMESPACE] with a 2-of-3 KMS
pub fn create_coprocessor() -> Simulated {
    Simulated::new(
        NAMESPACE,
        b"test-entropy",
        create_kms(TEST_KMS_SIGNERS),
        TEST_KMS_THRESHOLD,
    )
}

/// Creates a consent for `user` to read [NAMESPACE] ciphertexts, valid from
/// `now` for the default grant duration, and the key that opens what it reveals
pub fn create_consent(user: &PrivateKey, now: u64) -> (EphemeralKey, SignedUserDecrypt) {
    let mut rng = StdRng::seed_from_u64(now);
    let ephemeral = EphemeralKey::generate(&mut rng);
    let request = UserDecryptRequest {
        ephemeral: ephemeral.public_key(),
        contracts: vec![contract_id(NAMESPACE)],
        start_secs: now,
        duration_days: DEFAULT_GRANT_DURATION_DAYS,
    };
    (ephemeral, SignedUserDecrypt::sign(user, NAMESPACE, request))
}

/// Signs `instruction` with the next nonce `signer` has in `state`
pub async fn sign_next<S: State>(
    state: &S,
    signer: &PrivateKey,
    instruction: Instruction,
) -> Transaction {
    let nonce = nonce(state, &signer.public_key()).await;
    Transaction::sign(signer, nonce, instruction)
}

/// Executes `transactions` as one batch and applies the result to `state`
pub async fn execute(
    state: &mut Memory,
    coprocessor: &mut Simulated,
    limits: Limits,
    now: u64,
    transactions: Vec<Transaction>,
) -> Vec<Output> {
    let (outputs, changes) = {
        let mut layer = Layer::new(&*state, coprocessor, NAMESPACE, limits, now);
        let (outputs, _) = layer.execute(transactions).await;
        (outputs, layer.commit())
    };
    state.apply(changes).await;
    outputs
}
