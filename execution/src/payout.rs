//! Bet validation and the encrypted payout engine.

use sicbo_types::sicbo::{
    Bet, BetType, BIG, DEFAULT_GRANT_DURATION_DAYS, DEFAULT_MAX_STAKE, DEFAULT_MIN_STAKE, DIE_MAX,
    DIE_MIN, SMALL,
};

use crate::{
    coprocessor::Coprocessor,
    dice::EncryptedDice,
    fhe::{EncryptedU64, Fhe},
    Error,
};

/// Multiple paid by [BetType::AnyTriple].
pub const ANY_TRIPLE_MULTIPLE: u64 = 30;

/// Multiple paid by [BetType::SpecificTriple].
pub const SPECIFIC_TRIPLE_MULTIPLE: u64 = 180;

/// Operator-configured bounds applied to every bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub min_stake: u64,
    pub max_stake: u64,
    /// Validity of private decryption consents issued to players.
    pub grant_duration_days: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_stake: DEFAULT_MIN_STAKE,
            max_stake: DEFAULT_MAX_STAKE,
            grant_duration_days: DEFAULT_GRANT_DURATION_DAYS,
        }
    }
}

/// Fixed multiple paid when the three dice total exactly `total`.
///
/// | total    | 3/18 | 4/17 | 5/16 | 6/15 | 7/14 | 8/13 | 9/12 | 10/11 |
/// |----------|------|------|------|------|------|------|------|-------|
/// | multiple | 180  | 50   | 18   | 14   | 12   | 8    | 6    | 6     |
pub fn sum_exact_multiple(total: u8) -> u64 {
    match total {
        3 | 18 => 180,
        4 | 17 => 50,
        5 | 16 => 18,
        6 | 15 => 14,
        7 | 14 => 12,
        8 | 13 => 8,
        9 | 12 => 6,
        10 | 11 => 6,
        _ => 0,
    }
}

/// Largest multiple `bet` can pay.
fn max_multiple(bet: &Bet) -> u64 {
    match bet.bet_type {
        BetType::BigSmall => 1,
        BetType::SumExact => sum_exact_multiple(bet.a),
        BetType::AnyTriple => ANY_TRIPLE_MULTIPLE,
        BetType::SpecificTriple => SPECIFIC_TRIPLE_MULTIPLE,
        BetType::SingleNumber => 3,
    }
}

/// Checks a bet's shape and stake. Runs before anything is debited.
pub fn validate(limits: &Limits, bet: &Bet, stake: u64) -> Result<(), Error> {
    if stake < limits.min_stake || stake > limits.max_stake {
        return Err(Error::InvalidBetParameters("stake out of range"));
    }
    if bet.b != 0 {
        return Err(Error::InvalidBetParameters("paramB is unused and must be 0"));
    }
    let face = DIE_MIN..=DIE_MAX;
    let valid = match bet.bet_type {
        BetType::BigSmall => bet.a == SMALL || bet.a == BIG,
        BetType::SumExact => (3..=18).contains(&bet.a),
        BetType::AnyTriple => bet.a == 0,
        BetType::SpecificTriple | BetType::SingleNumber => face.contains(&bet.a),
    };
    if !valid {
        return Err(Error::InvalidBetParameters("paramA out of range"));
    }
    scaled(max_multiple(bet), stake)?;
    Ok(())
}

/// `multiple * stake`, or an error if the payout does not fit a `u64`.
fn scaled(multiple: u64, stake: u64) -> Result<u64, Error> {
    multiple
        .checked_mul(stake)
        .ok_or(Error::InvalidBetParameters("payout overflows"))
}

/// Encrypted token amount `bet` pays on `dice` for `stake`: `multiple * stake`
/// on a win, 0 on a loss. Every outcome is decided by encrypted comparisons
/// and selects. Fails before touching the coprocessor if the largest payout of
/// `bet` overflows.
pub fn compute_payout<C: Coprocessor>(
    fhe: &mut Fhe<'_, C>,
    bet: &Bet,
    dice: &EncryptedDice,
    stake: u64,
) -> Result<EncryptedU64, Error> {
    scaled(max_multiple(bet), stake)?;
    let zero = fhe.constant_u64(0)?;
    match bet.bet_type {
        BetType::BigSmall => {
            let (min, max) = if bet.a == SMALL { (4, 10) } else { (11, 17) };
            let sum = dice.sum(fhe)?;
            let in_range = fhe.in_range(&sum, min, max)?;
            let triple = dice.is_triple(fhe)?;
            let not_triple = fhe.not(&triple)?;
            let win = fhe.and(&in_range, &not_triple)?;
            let amount = fhe.constant_u64(stake)?;
            Ok(fhe.select_u64(&win, &amount, &zero)?)
        }
        BetType::SumExact => {
            let sum = dice.sum(fhe)?;
            let win = fhe.equals_const(&sum, bet.a)?;
            let amount = fhe.constant_u64(scaled(sum_exact_multiple(bet.a), stake)?)?;
            Ok(fhe.select_u64(&win, &amount, &zero)?)
        }
        BetType::AnyTriple => {
            let win = dice.is_triple(fhe)?;
            let amount = fhe.constant_u64(scaled(ANY_TRIPLE_MULTIPLE, stake)?)?;
            Ok(fhe.select_u64(&win, &amount, &zero)?)
        }
        BetType::SpecificTriple => {
            let triple = dice.is_triple(fhe)?;
            let [first, _, _] = dice.dice();
            let face = fhe.equals_const(first, bet.a)?;
            let win = fhe.and(&triple, &face)?;
            let amount = fhe.constant_u64(scaled(SPECIFIC_TRIPLE_MULTIPLE, stake)?)?;
            Ok(fhe.select_u64(&win, &amount, &zero)?)
        }
        BetType::SingleNumber => {
            // One stake per matching die
            let amount = fhe.constant_u64(stake)?;
            let mut total = zero;
            for die in dice.dice() {
                let hit = fhe.equals_const(die, bet.a)?;
                let paid = fhe.select_u64(&hit, &amount, &zero)?;
                total = fhe.add_u64(&total, &paid)?;
            }
            Ok(total)
        }
    }
}
