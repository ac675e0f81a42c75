//! Decryption authorization.
//!
//! [PrivateDecryption] and [PublicDecryption] wrap the same coprocessor but are
//! separate capabilities: a private grant reveals values sealed to one
//! request's [EphemeralKey] and yields no proof, so it can never feed
//! settlement. Only a [PublicDecryption] opening carries a [DecryptionProof].

use commonware_cryptography::{ed25519::PrivateKey, sha256::Digest};
use rand::{CryptoRng, RngCore};
use sicbo_types::sicbo::{
    apply_pad, seal_pad, DecryptionProof, Handle, Opening, Sealed, SignedUserDecrypt,
    UserDecryptRequest, MAX_GRANT_DURATION_DAYS, REENCRYPTION_KEY_SIZE,
};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::{
    coprocessor::{Coprocessor, CoprocessorError},
    Error,
};

/// Private half of the key a user decryption request names. Values revealed
/// under that request can only be opened with it.
pub struct EphemeralKey(StaticSecret);

impl EphemeralKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(StaticSecret::random_from_rng(rng))
    }

    pub fn public_key(&self) -> [u8; REENCRYPTION_KEY_SIZE] {
        X25519PublicKey::from(&self.0).to_bytes()
    }

    /// Opens the values of `sealed`, which must answer a request for `handles`.
    pub fn open(&self, handles: &[Handle], sealed: &Sealed) -> Result<Vec<u64>, Error> {
        if handles.len() != sealed.values.len() {
            return Err(Error::MalformedReveal {
                expected: handles.len(),
                got: sealed.values.len(),
            });
        }
        let shared = self.0.diffie_hellman(&X25519PublicKey::from(sealed.sender));
        Ok(handles
            .iter()
            .zip(&sealed.values)
            .map(|(handle, value)| {
                u64::from_be_bytes(apply_pad(*value, &seal_pad(shared.as_bytes(), handle)))
            })
            .collect())
    }
}

/// Player-scoped reveal of ciphertexts on the player's ACL.
pub struct PrivateDecryption<'c, C: Coprocessor> {
    coprocessor: &'c C,
}

impl<'c, C: Coprocessor> PrivateDecryption<'c, C> {
    pub fn new(coprocessor: &'c C) -> Self {
        Self { coprocessor }
    }

    /// Generates an ephemeral key and has `user` sign consent to decrypt
    /// ciphertexts of `contracts` during `[start_secs, start_secs + duration_days)`.
    pub fn request<R: RngCore + CryptoRng>(
        rng: &mut R,
        user: &PrivateKey,
        namespace: &[u8],
        contracts: Vec<Digest>,
        start_secs: u64,
        duration_days: u32,
    ) -> Result<(EphemeralKey, SignedUserDecrypt), Error> {
        if duration_days == 0 || duration_days > MAX_GRANT_DURATION_DAYS || contracts.is_empty() {
            return Err(CoprocessorError::InvalidConsent.into());
        }
        let ephemeral = EphemeralKey::generate(rng);
        let request = UserDecryptRequest {
            ephemeral: ephemeral.public_key(),
            contracts,
            start_secs,
            duration_days,
        };
        Ok((ephemeral, SignedUserDecrypt::sign(user, namespace, request)))
    }

    /// Reveals every handle in `handles` under one consent, in order, sealed
    /// to the consent's ephemeral key. Safe to relay: the result is opaque to
    /// anyone without the matching [EphemeralKey].
    pub fn decrypt(
        &self,
        handles: &[Handle],
        consent: &SignedUserDecrypt,
        now: u64,
    ) -> Result<Sealed, Error> {
        Ok(self.coprocessor.user_decrypt(handles, consent, now)?)
    }
}

/// Proof-carrying opening of publicly decryptable ciphertexts.
pub struct PublicDecryption<'c, C: Coprocessor> {
    coprocessor: &'c C,
}

impl<'c, C: Coprocessor> PublicDecryption<'c, C> {
    pub fn new(coprocessor: &'c C) -> Self {
        Self { coprocessor }
    }

    /// Opens `handle`. Repeated calls return the same clear bytes, each with
    /// an independently valid proof.
    pub fn decrypt(&self, handle: &Handle) -> Result<Opening, Error> {
        let (clear, proof) = self.coprocessor.public_decrypt(handle)?;
        Ok(Opening {
            handle: *handle,
            clear,
            proof,
        })
    }

    /// Fails with [Error::InvalidProof] unless `proof` binds `clear` to `handle`.
    pub fn verify(&self, handle: &Handle, clear: &[u8], proof: &DecryptionProof) -> Result<(), Error> {
        if !self.coprocessor.verify_decryption(handle, clear, proof) {
            return Err(Error::InvalidProof);
        }
        Ok(())
    }
}

/// Parses the 8-byte big-endian clear encoding of a `U64` ciphertext.
pub fn decode_clear_u64(clear: &[u8]) -> Result<u64, Error> {
    let bytes: [u8; 8] = clear.try_into().map_err(|_| Error::InvalidProof)?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        coprocessor::{Binding, FheType},
        mocks::{create_account_keypair, create_coprocessor},
    };
    use commonware_cryptography::Signer;
    use rand::{rngs::StdRng, SeedableRng};
    use sicbo_types::{sicbo::contract_id, NAMESPACE};

    #[test]
    fn test_request_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let (player, _) = create_account_keypair(1);
        let contracts = vec![contract_id(NAMESPACE)];

        for days in [0, MAX_GRANT_DURATION_DAYS + 1] {
            assert!(matches!(
                PrivateDecryption::<crate::coprocessor::Simulated>::request(
                    &mut rng,
                    &player,
                    NAMESPACE,
                    contracts.clone(),
                    0,
                    days
                ),
                Err(Error::Coprocessor(CoprocessorError::InvalidConsent))
            ));
        }

        let (ephemeral, consent) = PrivateDecryption::<crate::coprocessor::Simulated>::request(
            &mut rng, &player, NAMESPACE, contracts, 0, 10,
        )
        .unwrap();
        assert_eq!(consent.request.ephemeral, ephemeral.public_key());
        assert_eq!(consent.user, player.public_key());
        assert!(consent.verify(NAMESPACE));
    }

    #[test]
    fn test_paths_agree() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut coprocessor = create_coprocessor();
        let (player, public) = create_account_keypair(1);
        let binding = Binding {
            contract: contract_id(NAMESPACE),
            round_id: 1,
        };
        let die = coprocessor.random(&binding, 1, 6).unwrap();
        coprocessor.allow(&die, &public).unwrap();

        let (ephemeral, consent) = PrivateDecryption::<crate::coprocessor::Simulated>::request(
            &mut rng,
            &player,
            NAMESPACE,
            vec![binding.contract],
            0,
            10,
        )
        .unwrap();
        let sealed = PrivateDecryption::new(&coprocessor)
            .decrypt(&[die], &consent, 0)
            .unwrap();
        let private = ephemeral.open(&[die], &sealed).unwrap();

        // Not yet public
        assert!(PublicDecryption::new(&coprocessor).decrypt(&die).is_err());
        coprocessor.allow_public(&die).unwrap();

        let public_path = PublicDecryption::new(&coprocessor);
        let opening = public_path.decrypt(&die).unwrap();
        assert_eq!(opening.clear, FheType::U8.encode_clear(private[0]));
        assert_eq!(public_path.verify(&die, &opening.clear, &opening.proof), Ok(()));
        assert_eq!(
            public_path.verify(&die, &[0], &opening.proof),
            Err(Error::InvalidProof)
        );
    }

    #[test]
    fn test_reveal_needs_ephemeral_key() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut coprocessor = create_coprocessor();
        let (player, public) = create_account_keypair(1);
        let binding = Binding {
            contract: contract_id(NAMESPACE),
            round_id: 1,
        };
        let die = coprocessor.trivial(&binding, FheType::U8, 5).unwrap();
        let payout = coprocessor.trivial(&binding, FheType::U64, 600).unwrap();
        coprocessor.allow(&die, &public).unwrap();
        coprocessor.allow(&payout, &public).unwrap();
        let handles = [die, payout];

        let (ephemeral, consent) = PrivateDecryption::<crate::coprocessor::Simulated>::request(
            &mut rng,
            &player,
            NAMESPACE,
            vec![binding.contract],
            0,
            10,
        )
        .unwrap();

        // A relay holding only the consent sees sealed bytes
        let private = PrivateDecryption::new(&coprocessor);
        let sealed = private.decrypt(&handles, &consent, 0).unwrap();
        assert_eq!(sealed.sender, coprocessor.reencryption_key());
        assert_ne!(sealed.values[0], 5u64.to_be_bytes());
        assert_ne!(sealed.values[1], 600u64.to_be_bytes());

        // Replaying the consent later in its window yields the same opaque bytes
        let replayed = private.decrypt(&handles, &consent, 9 * 86_400).unwrap();
        assert_eq!(replayed, sealed);

        // Any other key opens garbage
        let stranger = EphemeralKey::generate(&mut rng);
        assert_ne!(stranger.open(&handles, &sealed).unwrap(), vec![5, 600]);

        // Only the requester's key opens the values
        assert_eq!(ephemeral.open(&handles, &sealed).unwrap(), vec![5, 600]);
        assert_eq!(
            ephemeral.open(&handles[..1], &sealed),
            Err(Error::MalformedReveal {
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn test_decode_clear_u64() {
        assert_eq!(decode_clear_u64(&600u64.to_be_bytes()), Ok(600));
        assert_eq!(decode_clear_u64(&[1, 2, 3]), Err(Error::InvalidProof));
        assert_eq!(decode_clear_u64(&[0; 9]), Err(Error::InvalidProof));
    }
}
