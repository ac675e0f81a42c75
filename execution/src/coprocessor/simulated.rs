use std::collections::{BTreeSet, HashMap, HashSet};

use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    sha256::{Digest, Sha256},
    Hasher, Signer,
};
use sicbo_types::sicbo::{
    apply_pad, contract_id, seal_pad, Attestation, DecryptionProof, Handle, Sealed,
    SignedUserDecrypt, MAX_GRANT_DURATION_DAYS,
};
use tracing::debug;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::{Binding, Coprocessor, CoprocessorError, FheType};

/// Deterministic byte stream: a SHA-256 hash chain over a seed.
struct Entropy {
    state: [u8; 32],
    index: usize,
}

impl Entropy {
    fn new(seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"entropy");
        hasher.update(seed);
        Self {
            state: hasher.finalize().0,
            index: 0,
        }
    }

    fn next_byte(&mut self) -> u8 {
        if self.index >= 32 {
            let mut hasher = Sha256::new();
            hasher.update(&self.state);
            self.state = hasher.finalize().0;
            self.index = 0;
        }
        let result = self.state[self.index];
        self.index += 1;
        result
    }

    /// Uniform value in `[0, max)` by rejection sampling.
    fn next_bounded(&mut self, max: u16) -> u8 {
        debug_assert!(max > 0 && max <= 256);
        let limit = 256 - (256 % max);
        loop {
            let value = self.next_byte() as u16;
            if value < limit {
                return (value % max) as u8;
            }
        }
    }
}

struct Ciphertext {
    ty: FheType,
    value: u64,
    binding: Binding,
}

/// In-memory [Coprocessor].
///
/// Plaintexts live next to their handles. Public decryption is attested by a
/// set of KMS signers, and a proof is valid once `threshold` distinct signers
/// from that set have attested the same `(handle, clear)` pair.
pub struct Simulated {
    namespace: Vec<u8>,
    entropy: Entropy,
    counter: u64,
    randomness_available: bool,

    ciphertexts: HashMap<Handle, Ciphertext>,
    acl: HashMap<Handle, BTreeSet<PublicKey>>,
    public: HashSet<Handle>,

    kms: Vec<PrivateKey>,
    threshold: usize,
    reencryption: StaticSecret,
}

/// Key user decryptions are sealed with, derived from the coprocessor seed.
fn reencryption_secret(seed: &[u8]) -> StaticSecret {
    let mut hasher = Sha256::new();
    hasher.update(b"reencryption");
    hasher.update(seed);
    StaticSecret::from(hasher.finalize().0)
}

impl Simulated {
    pub fn new(namespace: &[u8], seed: &[u8], kms: Vec<PrivateKey>, threshold: usize) -> Self {
        assert!(
            threshold > 0 && threshold <= kms.len(),
            "threshold must be in [1, signers]"
        );
        Self {
            namespace: namespace.to_vec(),
            entropy: Entropy::new(seed),
            counter: 0,
            randomness_available: true,
            ciphertexts: HashMap::new(),
            acl: HashMap::new(),
            public: HashSet::new(),
            kms,
            threshold,
            reencryption: reencryption_secret(seed),
        }
    }

    pub fn kms_signers(&self) -> Vec<PublicKey> {
        self.kms.iter().map(|signer| signer.public_key()).collect()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// X25519 key user decryptions are sealed from.
    pub fn reencryption_key(&self) -> [u8; 32] {
        X25519PublicKey::from(&self.reencryption).to_bytes()
    }

    /// Contract identity of the namespace this coprocessor serves.
    pub fn contract(&self) -> Digest {
        contract_id(&self.namespace)
    }

    /// Failure injection for the randomness source.
    pub fn set_randomness_available(&mut self, available: bool) {
        self.randomness_available = available;
    }

    pub fn is_public(&self, handle: &Handle) -> bool {
        self.public.contains(handle)
    }

    fn store(&mut self, binding: Binding, ty: FheType, value: u64, op: u8) -> Handle {
        self.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(&binding.contract);
        hasher.update(&binding.round_id.to_be_bytes());
        hasher.update(&self.counter.to_be_bytes());
        hasher.update(&[op]);
        let handle = Handle::new(hasher.finalize());
        self.ciphertexts.insert(
            handle,
            Ciphertext {
                ty,
                value: ty.truncate(value),
                binding,
            },
        );
        handle
    }

    fn load(&self, handle: &Handle) -> Result<&Ciphertext, CoprocessorError> {
        self.ciphertexts
            .get(handle)
            .ok_or(CoprocessorError::UnknownHandle(*handle))
    }

    fn load_typed(&self, handle: &Handle, ty: FheType) -> Result<&Ciphertext, CoprocessorError> {
        let ciphertext = self.load(handle)?;
        if ciphertext.ty != ty {
            return Err(CoprocessorError::TypeMismatch {
                expected: ty,
                got: ciphertext.ty,
            });
        }
        Ok(ciphertext)
    }

    /// Loads two operands of the same numeric type and binding.
    fn operands(
        &self,
        lhs: &Handle,
        rhs: &Handle,
    ) -> Result<(FheType, u64, u64, Binding), CoprocessorError> {
        let left = self.load(lhs)?;
        let right = self.load(rhs)?;
        if left.ty == FheType::Bool {
            return Err(CoprocessorError::TypeMismatch {
                expected: FheType::U64,
                got: FheType::Bool,
            });
        }
        if left.ty != right.ty {
            return Err(CoprocessorError::TypeMismatch {
                expected: left.ty,
                got: right.ty,
            });
        }
        if left.binding != right.binding {
            return Err(CoprocessorError::BindingMismatch);
        }
        Ok((left.ty, left.value, right.value, left.binding))
    }

    fn compare(
        &mut self,
        lhs: &Handle,
        rhs: &Handle,
        op: u8,
        f: impl Fn(u64, u64) -> bool,
    ) -> Result<Handle, CoprocessorError> {
        let (_, left, right, binding) = self.operands(lhs, rhs)?;
        Ok(self.store(binding, FheType::Bool, f(left, right) as u64, op))
    }
}

impl Coprocessor for Simulated {
    fn random(&mut self, binding: &Binding, min: u8, max: u8) -> Result<Handle, CoprocessorError> {
        if !self.randomness_available {
            return Err(CoprocessorError::RandomnessUnavailable);
        }
        if min > max {
            return Err(CoprocessorError::InvalidRange { min, max });
        }
        let span = max as u16 - min as u16 + 1;
        let value = min + self.entropy.next_bounded(span);
        Ok(self.store(*binding, FheType::U8, value as u64, 0))
    }

    fn trivial(
        &mut self,
        binding: &Binding,
        ty: FheType,
        value: u64,
    ) -> Result<Handle, CoprocessorError> {
        Ok(self.store(*binding, ty, value, 1))
    }

    fn add(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError> {
        let (ty, left, right, binding) = self.operands(lhs, rhs)?;
        Ok(self.store(binding, ty, left.wrapping_add(right), 2))
    }

    fn equals(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError> {
        self.compare(lhs, rhs, 3, |a, b| a == b)
    }

    fn at_least(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError> {
        self.compare(lhs, rhs, 4, |a, b| a >= b)
    }

    fn at_most(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError> {
        self.compare(lhs, rhs, 5, |a, b| a <= b)
    }

    fn and(&mut self, lhs: &Handle, rhs: &Handle) -> Result<Handle, CoprocessorError> {
        let left = self.load_typed(lhs, FheType::Bool)?;
        let right = self.load_typed(rhs, FheType::Bool)?;
        if left.binding != right.binding {
            return Err(CoprocessorError::BindingMismatch);
        }
        let (value, binding) = (left.value & right.value, left.binding);
        Ok(self.store(binding, FheType::Bool, value, 6))
    }

    fn not(&mut self, value: &Handle) -> Result<Handle, CoprocessorError> {
        let operand = self.load_typed(value, FheType::Bool)?;
        let (value, binding) = (operand.value ^ 1, operand.binding);
        Ok(self.store(binding, FheType::Bool, value, 7))
    }

    fn select(
        &mut self,
        condition: &Handle,
        if_true: &Handle,
        if_false: &Handle,
    ) -> Result<Handle, CoprocessorError> {
        let condition = self.load_typed(condition, FheType::Bool)?;
        let (cond_value, cond_binding) = (condition.value, condition.binding);
        let (ty, yes, no, binding) = self.operands(if_true, if_false)?;
        if cond_binding != binding {
            return Err(CoprocessorError::BindingMismatch);
        }
        let value = if cond_value == 1 { yes } else { no };
        Ok(self.store(binding, ty, value, 8))
    }

    fn allow(&mut self, handle: &Handle, identity: &PublicKey) -> Result<(), CoprocessorError> {
        self.load(handle)?;
        self.acl.entry(*handle).or_default().insert(identity.clone());
        Ok(())
    }

    fn allow_public(&mut self, handle: &Handle) -> Result<(), CoprocessorError> {
        self.load(handle)?;
        if self.public.insert(*handle) {
            debug!(%handle, "marked publicly decryptable");
        }
        Ok(())
    }

    fn public_decrypt(&self, handle: &Handle) -> Result<(Vec<u8>, DecryptionProof), CoprocessorError> {
        let ciphertext = self.load(handle)?;
        if !self.public.contains(handle) {
            return Err(CoprocessorError::NotPubliclyDecryptable(*handle));
        }
        let clear = ciphertext.ty.encode_clear(ciphertext.value);
        let attestations = self
            .kms
            .iter()
            .map(|signer| Attestation::sign(signer, &self.namespace, handle, &clear))
            .collect();
        Ok((clear, DecryptionProof { attestations }))
    }

    fn verify_decryption(&self, handle: &Handle, clear: &[u8], proof: &DecryptionProof) -> bool {
        let signers = self.kms_signers();
        let mut attested = BTreeSet::new();
        for attestation in &proof.attestations {
            if !signers.contains(&attestation.signer) || attested.contains(&attestation.signer) {
                continue;
            }
            if attestation.verify(&self.namespace, handle, clear) {
                attested.insert(attestation.signer.clone());
            }
        }
        attested.len() >= self.threshold
    }

    fn user_decrypt(
        &self,
        handles: &[Handle],
        consent: &SignedUserDecrypt,
        now: u64,
    ) -> Result<Sealed, CoprocessorError> {
        let request = &consent.request;
        if request.duration_days == 0
            || request.duration_days > MAX_GRANT_DURATION_DAYS
            || !consent.verify(&self.namespace)
        {
            return Err(CoprocessorError::InvalidConsent);
        }
        if !request.is_valid_at(now) {
            return Err(CoprocessorError::ConsentExpired);
        }
        let shared = self
            .reencryption
            .diffie_hellman(&X25519PublicKey::from(request.ephemeral));
        if !shared.was_contributory() {
            return Err(CoprocessorError::InvalidConsent);
        }

        let values = handles
            .iter()
            .map(|handle| {
                let ciphertext = self.load(handle)?;
                if !request.contracts.contains(&ciphertext.binding.contract) {
                    return Err(CoprocessorError::InvalidConsent);
                }
                let allowed = self
                    .acl
                    .get(handle)
                    .is_some_and(|identities| identities.contains(&consent.user));
                if !allowed {
                    return Err(CoprocessorError::NotAllowed(*handle));
                }
                let pad = seal_pad(shared.as_bytes(), handle);
                Ok(apply_pad(ciphertext.value.to_be_bytes(), &pad))
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(user = ?consent.user, handles = handles.len(), "sealed user decryption");
        Ok(Sealed {
            sender: self.reencryption_key(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{create_account_keypair, create_coprocessor};
    use sicbo_types::{
        sicbo::{UserDecryptRequest, SECONDS_PER_DAY},
        NAMESPACE,
    };

    fn binding(round_id: u64) -> Binding {
        Binding {
            contract: contract_id(NAMESPACE),
            round_id,
        }
    }

    #[test]
    fn test_entropy_bounded() {
        let mut entropy = Entropy::new(b"seed");
        let mut seen = [0u32; 6];
        for _ in 0..6_000 {
            let value = entropy.next_bounded(6);
            assert!(value < 6);
            seen[value as usize] += 1;
        }
        // Every face shows up with roughly uniform frequency
        for count in seen {
            assert!(count > 800 && count < 1_200, "count {count}");
        }
    }

    #[test]
    fn test_random_range() {
        let mut coprocessor = create_coprocessor();
        for _ in 0..200 {
            let handle = coprocessor.random(&binding(1), 1, 6).unwrap();
            let value = coprocessor.load(&handle).unwrap().value;
            assert!((1..=6).contains(&value));
        }
        assert!(matches!(
            coprocessor.random(&binding(1), 6, 1),
            Err(CoprocessorError::InvalidRange { .. })
        ));

        coprocessor.set_randomness_available(false);
        assert_eq!(
            coprocessor.random(&binding(1), 1, 6),
            Err(CoprocessorError::RandomnessUnavailable)
        );
    }

    #[test]
    fn test_handles_unique() {
        let mut coprocessor = create_coprocessor();
        let a = coprocessor.trivial(&binding(1), FheType::U8, 3).unwrap();
        let b = coprocessor.trivial(&binding(1), FheType::U8, 3).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_operations() {
        let mut coprocessor = create_coprocessor();
        let b = binding(1);
        let two = coprocessor.trivial(&b, FheType::U8, 2).unwrap();
        let five = coprocessor.trivial(&b, FheType::U8, 5).unwrap();

        let seven = coprocessor.add(&two, &five).unwrap();
        assert_eq!(coprocessor.load(&seven).unwrap().value, 7);

        let eq = coprocessor.equals(&two, &five).unwrap();
        let ge = coprocessor.at_least(&five, &two).unwrap();
        let le = coprocessor.at_most(&five, &two).unwrap();
        assert_eq!(coprocessor.load(&eq).unwrap().value, 0);
        assert_eq!(coprocessor.load(&ge).unwrap().value, 1);
        assert_eq!(coprocessor.load(&le).unwrap().value, 0);

        let not_eq = coprocessor.not(&eq).unwrap();
        let both = coprocessor.and(&not_eq, &ge).unwrap();
        assert_eq!(coprocessor.load(&both).unwrap().value, 1);

        let chosen = coprocessor.select(&both, &seven, &two).unwrap();
        assert_eq!(coprocessor.load(&chosen).unwrap().value, 7);
        let chosen = coprocessor.select(&eq, &seven, &two).unwrap();
        assert_eq!(coprocessor.load(&chosen).unwrap().value, 2);

        // U8 arithmetic wraps
        let big = coprocessor.trivial(&b, FheType::U8, 255).unwrap();
        let wrapped = coprocessor.add(&big, &two).unwrap();
        assert_eq!(coprocessor.load(&wrapped).unwrap().value, 1);
    }

    #[test]
    fn test_operand_checks() {
        let mut coprocessor = create_coprocessor();
        let small = coprocessor.trivial(&binding(1), FheType::U8, 1).unwrap();
        let wide = coprocessor.trivial(&binding(1), FheType::U64, 1).unwrap();
        let other_round = coprocessor.trivial(&binding(2), FheType::U8, 1).unwrap();
        let flag = coprocessor.equals(&small, &small).unwrap();

        assert!(matches!(
            coprocessor.add(&small, &wide),
            Err(CoprocessorError::TypeMismatch { .. })
        ));
        assert_eq!(
            coprocessor.add(&small, &other_round),
            Err(CoprocessorError::BindingMismatch)
        );
        assert!(matches!(
            coprocessor.add(&flag, &flag),
            Err(CoprocessorError::TypeMismatch { .. })
        ));
        assert!(matches!(
            coprocessor.not(&small),
            Err(CoprocessorError::TypeMismatch { .. })
        ));
        assert_eq!(
            coprocessor.select(&flag, &other_round, &other_round),
            Err(CoprocessorError::BindingMismatch)
        );

        let unknown = Handle::new(Sha256::hash(b"unknown"));
        assert_eq!(
            coprocessor.not(&unknown),
            Err(CoprocessorError::UnknownHandle(unknown))
        );
    }

    #[test]
    fn test_public_decryption() {
        let mut coprocessor = create_coprocessor();
        let payout = coprocessor
            .trivial(&binding(1), FheType::U64, 42)
            .unwrap();
        let other = coprocessor
            .trivial(&binding(1), FheType::U64, 42)
            .unwrap();

        assert_eq!(
            coprocessor.public_decrypt(&payout),
            Err(CoprocessorError::NotPubliclyDecryptable(payout))
        );
        coprocessor.allow_public(&payout).unwrap();

        let (clear, proof) = coprocessor.public_decrypt(&payout).unwrap();
        assert_eq!(clear, 42u64.to_be_bytes().to_vec());
        assert!(coprocessor.verify_decryption(&payout, &clear, &proof));

        // Idempotent
        let (again, proof_again) = coprocessor.public_decrypt(&payout).unwrap();
        assert_eq!(again, clear);
        assert!(coprocessor.verify_decryption(&payout, &again, &proof_again));

        // Bound to the exact ciphertext, even one with the same plaintext
        assert!(!coprocessor.verify_decryption(&other, &clear, &proof));
        assert!(!coprocessor.verify_decryption(&payout, &43u64.to_be_bytes(), &proof));
    }

    #[test]
    fn test_proof_threshold() {
        let mut coprocessor = create_coprocessor();
        let payout = coprocessor.trivial(&binding(1), FheType::U64, 9).unwrap();
        coprocessor.allow_public(&payout).unwrap();
        let (clear, proof) = coprocessor.public_decrypt(&payout).unwrap();

        // Below threshold
        let mut partial = proof.clone();
        partial.attestations.truncate(coprocessor.threshold() - 1);
        assert!(!coprocessor.verify_decryption(&payout, &clear, &partial));

        // Repeating one signer does not count twice
        let mut repeated = DecryptionProof::default();
        for _ in 0..coprocessor.threshold() {
            repeated.attestations.push(proof.attestations[0].clone());
        }
        assert!(!coprocessor.verify_decryption(&payout, &clear, &repeated));

        // Signers outside the KMS do not count
        let (outsider, _) = create_account_keypair(1_000);
        let forged = DecryptionProof {
            attestations: (0..coprocessor.threshold())
                .map(|_| Attestation::sign(&outsider, NAMESPACE, &payout, &clear))
                .collect(),
        };
        assert!(!coprocessor.verify_decryption(&payout, &clear, &forged));
    }

    #[test]
    fn test_user_decryption() {
        let mut coprocessor = create_coprocessor();
        let (player, player_public) = create_account_keypair(1);
        let (stranger, _) = create_account_keypair(3);
        let die = coprocessor.trivial(&binding(1), FheType::U8, 4).unwrap();
        coprocessor.allow(&die, &player_public).unwrap();

        let ephemeral = StaticSecret::from([2u8; 32]);
        let request = UserDecryptRequest {
            ephemeral: X25519PublicKey::from(&ephemeral).to_bytes(),
            contracts: vec![coprocessor.contract()],
            start_secs: 100,
            duration_days: 10,
        };
        let consent = SignedUserDecrypt::sign(&player, NAMESPACE, request.clone());
        let sealed = coprocessor.user_decrypt(&[die], &consent, 100).unwrap();
        assert_eq!(sealed.sender, coprocessor.reencryption_key());
        let shared = ephemeral.diffie_hellman(&X25519PublicKey::from(sealed.sender));
        let pad = seal_pad(shared.as_bytes(), &die);
        assert_eq!(apply_pad(sealed.values[0], &pad), 4u64.to_be_bytes());

        // Low-order ephemeral keys would seal to a predictable secret
        let mut degenerate = request.clone();
        degenerate.ephemeral = [0u8; 32];
        let consent = SignedUserDecrypt::sign(&player, NAMESPACE, degenerate);
        assert_eq!(
            coprocessor.user_decrypt(&[die], &consent, 100),
            Err(CoprocessorError::InvalidConsent)
        );
        let consent = SignedUserDecrypt::sign(&player, NAMESPACE, request.clone());

        // Window
        assert_eq!(
            coprocessor.user_decrypt(&[die], &consent, 99),
            Err(CoprocessorError::ConsentExpired)
        );
        assert_eq!(
            coprocessor.user_decrypt(&[die], &consent, 100 + 10 * SECONDS_PER_DAY),
            Err(CoprocessorError::ConsentExpired)
        );

        // Only identities on the ACL
        let consent = SignedUserDecrypt::sign(&stranger, NAMESPACE, request.clone());
        assert_eq!(
            coprocessor.user_decrypt(&[die], &consent, 100),
            Err(CoprocessorError::NotAllowed(die))
        );

        // Consent must name the contract
        let mut elsewhere = request.clone();
        elsewhere.contracts = vec![contract_id(b"_ELSEWHERE")];
        let consent = SignedUserDecrypt::sign(&player, NAMESPACE, elsewhere);
        assert_eq!(
            coprocessor.user_decrypt(&[die], &consent, 100),
            Err(CoprocessorError::InvalidConsent)
        );

        // Consent must be signed in this namespace
        let consent = SignedUserDecrypt::sign(&player, b"_ELSEWHERE", request);
        assert_eq!(
            coprocessor.user_decrypt(&[die], &consent, 100),
            Err(CoprocessorError::InvalidConsent)
        );
    }
}
