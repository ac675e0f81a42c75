//! Token balances, allowances and the shared bankroll.

use commonware_cryptography::ed25519::PublicKey;
use sicbo_types::{
    execution::{Account, Key, Value},
    sicbo::{FAUCET_AMOUNT, SECONDS_PER_DAY},
};

use crate::{state::load_account, Error, State};

async fn store<S: State>(state: &mut S, owner: &PublicKey, account: Account) {
    state
        .insert(Key::Account(owner.clone()), Value::Account(account))
        .await;
}

pub async fn balance<S: State>(state: &S, owner: &PublicKey) -> u64 {
    load_account(state, owner).await.balance
}

pub async fn bankroll<S: State>(state: &S) -> u64 {
    match state.get(&Key::Bankroll).await {
        Some(Value::Bankroll(amount)) => amount,
        _ => 0,
    }
}

async fn set_bankroll<S: State>(state: &mut S, amount: u64) {
    state.insert(Key::Bankroll, Value::Bankroll(amount)).await;
}

/// Adds `amount` to `owner`'s balance and returns the new balance.
pub async fn credit<S: State>(state: &mut S, owner: &PublicKey, amount: u64) -> Result<u64, Error> {
    let mut account = load_account(state, owner).await;
    account.balance = account
        .balance
        .checked_add(amount)
        .ok_or(Error::InvalidAmount)?;
    let balance = account.balance;
    store(state, owner, account).await;
    Ok(balance)
}

/// Removes `amount` from `owner`'s balance and returns the new balance.
pub async fn debit<S: State>(state: &mut S, owner: &PublicKey, amount: u64) -> Result<u64, Error> {
    let mut account = load_account(state, owner).await;
    account.balance = account
        .balance
        .checked_sub(amount)
        .ok_or(Error::InsufficientFunds {
            balance: account.balance,
            required: amount,
        })?;
    let balance = account.balance;
    store(state, owner, account).await;
    Ok(balance)
}

/// Overwrites the amount the game may spend on `owner`'s behalf.
pub async fn approve<S: State>(state: &mut S, owner: &PublicKey, amount: u64) {
    let mut account = load_account(state, owner).await;
    account.allowance = amount;
    store(state, owner, account).await;
}

/// Moves a stake from `owner` into the bankroll, spending allowance.
pub async fn collect_stake<S: State>(
    state: &mut S,
    owner: &PublicKey,
    stake: u64,
) -> Result<(), Error> {
    let mut account = load_account(state, owner).await;
    if account.allowance < stake {
        return Err(Error::InsufficientAllowance {
            allowance: account.allowance,
            required: stake,
        });
    }
    if account.balance < stake {
        return Err(Error::InsufficientFunds {
            balance: account.balance,
            required: stake,
        });
    }
    let total = bankroll(state)
        .await
        .checked_add(stake)
        .ok_or(Error::InvalidAmount)?;

    account.allowance -= stake;
    account.balance -= stake;
    store(state, owner, account).await;
    set_bankroll(state, total).await;
    Ok(())
}

/// Moves `amount` from `funder`'s balance into the bankroll and returns the
/// new bankroll.
pub async fn fund_bankroll<S: State>(
    state: &mut S,
    funder: &PublicKey,
    amount: u64,
) -> Result<u64, Error> {
    if amount == 0 {
        return Err(Error::InvalidAmount);
    }
    let total = bankroll(state)
        .await
        .checked_add(amount)
        .ok_or(Error::InvalidAmount)?;
    debit(state, funder, amount).await?;
    set_bankroll(state, total).await;
    Ok(total)
}

/// Pays `amount` out of the bankroll to `player`. The balance check and the
/// debit happen in one step.
pub async fn pay_out<S: State>(state: &mut S, player: &PublicKey, amount: u64) -> Result<(), Error> {
    let available = bankroll(state).await;
    let remaining = available
        .checked_sub(amount)
        .ok_or(Error::InsufficientBankroll {
            available,
            required: amount,
        })?;
    credit(state, player, amount).await?;
    set_bankroll(state, remaining).await;
    Ok(())
}

/// Credits [FAUCET_AMOUNT] at most once per day. Returns the new balance.
pub async fn claim_faucet<S: State>(
    state: &mut S,
    owner: &PublicKey,
    now: u64,
) -> Result<u64, Error> {
    let mut account = load_account(state, owner).await;
    if account.last_faucet != 0 {
        let next_claim = account.last_faucet.saturating_add(SECONDS_PER_DAY);
        if now < next_claim {
            return Err(Error::RateLimited { next_claim });
        }
    }
    account.balance = account
        .balance
        .checked_add(FAUCET_AMOUNT)
        .ok_or(Error::InvalidAmount)?;
    account.last_faucet = now.max(1);
    let balance = account.balance;
    store(state, owner, account).await;
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mocks::create_account_keypair, Memory};
    use commonware_runtime::{deterministic::Runner, Runner as _};

    #[test]
    fn test_credit_debit() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let (_, alice) = create_account_keypair(1);

            assert_eq!(credit(&mut state, &alice, 100).await, Ok(100));
            assert_eq!(debit(&mut state, &alice, 40).await, Ok(60));
            assert_eq!(
                debit(&mut state, &alice, 61).await,
                Err(Error::InsufficientFunds {
                    balance: 60,
                    required: 61
                })
            );
            assert_eq!(balance(&state, &alice).await, 60);
            assert_eq!(
                credit(&mut state, &alice, u64::MAX).await,
                Err(Error::InvalidAmount)
            );
        });
    }

    #[test]
    fn test_collect_stake() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let (_, alice) = create_account_keypair(1);
            credit(&mut state, &alice, 100).await.unwrap();

            // Allowance gates spending
            assert_eq!(
                collect_stake(&mut state, &alice, 10).await,
                Err(Error::InsufficientAllowance {
                    allowance: 0,
                    required: 10
                })
            );

            approve(&mut state, &alice, 500).await;
            collect_stake(&mut state, &alice, 30).await.unwrap();
            let account = load_account(&state, &alice).await;
            assert_eq!(account.balance, 70);
            assert_eq!(account.allowance, 470);
            assert_eq!(bankroll(&state).await, 30);

            assert_eq!(
                collect_stake(&mut state, &alice, 71).await,
                Err(Error::InsufficientFunds {
                    balance: 70,
                    required: 71
                })
            );
        });
    }

    #[test]
    fn test_bankroll() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let (_, house) = create_account_keypair(1);
            let (_, alice) = create_account_keypair(2);
            credit(&mut state, &house, 1_000).await.unwrap();

            assert_eq!(
                fund_bankroll(&mut state, &house, 0).await,
                Err(Error::InvalidAmount)
            );
            assert_eq!(fund_bankroll(&mut state, &house, 400).await, Ok(400));
            assert_eq!(balance(&state, &house).await, 600);

            pay_out(&mut state, &alice, 150).await.unwrap();
            assert_eq!(bankroll(&state).await, 250);
            assert_eq!(balance(&state, &alice).await, 150);

            assert_eq!(
                pay_out(&mut state, &alice, 251).await,
                Err(Error::InsufficientBankroll {
                    available: 250,
                    required: 251
                })
            );
            assert_eq!(bankroll(&state).await, 250);
            assert_eq!(balance(&state, &alice).await, 150);
        });
    }

    #[test]
    fn test_faucet_daily() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let (_, alice) = create_account_keypair(1);
            let start = 1_700_000_000;

            assert_eq!(claim_faucet(&mut state, &alice, start).await, Ok(FAUCET_AMOUNT));
            assert_eq!(
                claim_faucet(&mut state, &alice, start + SECONDS_PER_DAY - 1).await,
                Err(Error::RateLimited {
                    next_claim: start + SECONDS_PER_DAY
                })
            );
            assert_eq!(
                claim_faucet(&mut state, &alice, start + SECONDS_PER_DAY).await,
                Ok(2 * FAUCET_AMOUNT)
            );
        });
    }
}
