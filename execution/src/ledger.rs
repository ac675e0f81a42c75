//! Round ledger: the round map, the per-player index and the round counter.
//!
//! Rounds are never deleted. Each mutator only advances a round one step along
//! `Created -> SettleRequested -> Settled` and fails with
//! [Error::InvalidRoundState] otherwise, leaving the round untouched.

use commonware_cryptography::ed25519::PublicKey;
use sicbo_types::{
    execution::{Key, Value},
    sicbo::{Round, RoundStatus, MAX_PLAYER_ROUNDS},
};

use crate::{Error, State};

/// Number of rounds created so far.
pub async fn count<S: State>(state: &S) -> u64 {
    match state.get(&Key::RoundCount).await {
        Some(Value::RoundCount(count)) => count,
        _ => 0,
    }
}

/// Id the next created round will receive (ids start at 1).
pub async fn next_round_id<S: State>(state: &S) -> u64 {
    count(state).await + 1
}

/// Stores a new round. `round.id` must be [next_round_id] and the player may
/// hold at most [MAX_PLAYER_ROUNDS] rounds.
pub async fn create<S: State>(state: &mut S, round: Round) -> Result<u64, Error> {
    let id = round.id;
    if id != next_round_id(state).await || state.get(&Key::Round(id)).await.is_some() {
        return Err(Error::InvalidRoundState {
            round_id: id,
            status: round.status(),
        });
    }

    let mut rounds = list_by_player(state, &round.player).await;
    if rounds.len() >= MAX_PLAYER_ROUNDS {
        return Err(Error::RoundLimitReached {
            limit: MAX_PLAYER_ROUNDS,
        });
    }
    rounds.push(id);
    state
        .insert(Key::PlayerRounds(round.player.clone()), Value::PlayerRounds(rounds))
        .await;
    state.insert(Key::RoundCount, Value::RoundCount(id)).await;
    state.insert(Key::Round(id), Value::Round(round)).await;
    Ok(id)
}

pub async fn get<S: State>(state: &S, round_id: u64) -> Result<Round, Error> {
    match state.get(&Key::Round(round_id)).await {
        Some(Value::Round(round)) => Ok(round),
        _ => Err(Error::RoundNotFound(round_id)),
    }
}

/// Round ids created by `player`, oldest first.
pub async fn list_by_player<S: State>(state: &S, player: &PublicKey) -> Vec<u64> {
    match state.get(&Key::PlayerRounds(player.clone())).await {
        Some(Value::PlayerRounds(rounds)) => rounds,
        _ => Vec::new(),
    }
}

pub async fn mark_settle_requested<S: State>(state: &mut S, round_id: u64) -> Result<Round, Error> {
    let mut round = get(state, round_id).await?;
    if !round.request_settlement() {
        return Err(Error::InvalidRoundState {
            round_id,
            status: round.status(),
        });
    }
    state
        .insert(Key::Round(round_id), Value::Round(round.clone()))
        .await;
    Ok(round)
}

pub async fn mark_settled<S: State>(
    state: &mut S,
    round_id: u64,
    clear_payout: u64,
) -> Result<Round, Error> {
    let mut round = get(state, round_id).await?;
    if !round.settle(clear_payout) {
        return Err(Error::InvalidRoundState {
            round_id,
            status: round.status(),
        });
    }
    state
        .insert(Key::Round(round_id), Value::Round(round.clone()))
        .await;
    Ok(round)
}

/// Fails with [Error::InvalidRoundState] unless `round` is in `expected`.
pub fn ensure_status(round: &Round, expected: RoundStatus) -> Result<(), Error> {
    if round.status() != expected {
        return Err(Error::InvalidRoundState {
            round_id: round.id,
            status: round.status(),
        });
    }
    Ok(())
}
