use sicbo_types::sicbo::{Handle, DICE_PER_ROUND, DIE_MAX, DIE_MIN};

use crate::{
    coprocessor::{Coprocessor, CoprocessorError},
    fhe::{EncryptedBool, EncryptedU8, Fhe},
};

/// Three encrypted dice of one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedDice([EncryptedU8; DICE_PER_ROUND]);

impl EncryptedDice {
    pub fn dice(&self) -> &[EncryptedU8; DICE_PER_ROUND] {
        &self.0
    }

    pub fn handles(&self) -> [Handle; DICE_PER_ROUND] {
        self.0.map(|die| die.handle())
    }

    /// Encrypted `d1 + d2 + d3` (always in 3..=18).
    pub fn sum<C: Coprocessor>(&self, fhe: &mut Fhe<'_, C>) -> Result<EncryptedU8, CoprocessorError> {
        let [d1, d2, d3] = &self.0;
        let partial = fhe.add_u8(d1, d2)?;
        fhe.add_u8(&partial, d3)
    }

    /// Encrypted `d1 == d2 == d3`.
    pub fn is_triple<C: Coprocessor>(
        &self,
        fhe: &mut Fhe<'_, C>,
    ) -> Result<EncryptedBool, CoprocessorError> {
        let [d1, d2, d3] = &self.0;
        let first = fhe.equals(d1, d2)?;
        let second = fhe.equals(d2, d3)?;
        fhe.and(&first, &second)
    }
}

/// Rolls three independent dice in the binding of `fhe`. Fails without
/// producing any dice if randomness is unavailable.
pub fn roll<C: Coprocessor>(fhe: &mut Fhe<'_, C>) -> Result<EncryptedDice, CoprocessorError> {
    Ok(EncryptedDice([
        fhe.random_u8(DIE_MIN, DIE_MAX)?,
        fhe.random_u8(DIE_MIN, DIE_MAX)?,
        fhe.random_u8(DIE_MIN, DIE_MAX)?,
    ]))
}

#[cfg(test)]
pub(crate) fn from_constants<C: Coprocessor>(
    fhe: &mut Fhe<'_, C>,
    faces: [u8; DICE_PER_ROUND],
) -> Result<EncryptedDice, CoprocessorError> {
    Ok(EncryptedDice([
        fhe.constant_u8(faces[0])?,
        fhe.constant_u8(faces[1])?,
        fhe.constant_u8(faces[2])?,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{coprocessor::Binding, mocks::create_coprocessor};
    use sicbo_types::{sicbo::contract_id, NAMESPACE};

    #[test]
    fn test_roll_in_range() {
        let mut coprocessor = create_coprocessor();
        let (player, public) = crate::mocks::create_account_keypair(1);
        let mut rolled = Vec::new();
        for round_id in 1..=50 {
            let binding = Binding {
                contract: contract_id(NAMESPACE),
                round_id,
            };
            let dice = roll(&mut Fhe::new(&mut coprocessor, binding)).unwrap();
            for handle in dice.handles() {
                coprocessor.allow(&handle, &public).unwrap();
            }
            rolled.push(dice.handles());
        }

        let (ephemeral, consent) = crate::mocks::create_consent(&player, 0);
        for handles in rolled {
            let sealed = coprocessor.user_decrypt(&handles, &consent, 0).unwrap();
            let faces = ephemeral.open(&handles, &sealed).unwrap();
            let sum: u64 = faces.iter().sum();
            assert!(faces.iter().all(|face| (1..=6).contains(face)));
            assert!((3..=18).contains(&sum));
        }
    }

    #[test]
    fn test_roll_fails_atomically() {
        let mut coprocessor = create_coprocessor();
        coprocessor.set_randomness_available(false);
        let binding = Binding {
            contract: contract_id(NAMESPACE),
            round_id: 1,
        };
        assert_eq!(
            roll(&mut Fhe::new(&mut coprocessor, binding)),
            Err(CoprocessorError::RandomnessUnavailable)
        );
    }
}
