use commonware_cryptography::{ed25519::PublicKey, sha256::Digest};
use sicbo_types::{
    execution::{Event, Instruction, Key, Output, Transaction, Value},
    sicbo::contract_id,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{
    coprocessor::{Binding, Coprocessor},
    state::{load_account, validate_and_increment_nonce, PrepareError, State},
    Error, Limits,
};

mod handlers;

/// Buffers the writes of a batch of transactions on top of `state`.
///
/// Every instruction runs against a checkpoint of the pending writes: if it
/// fails, its writes are discarded, the nonce stays consumed and an
/// [Event::Rejected] is emitted instead.
pub struct Layer<'a, S: State, C: Coprocessor> {
    state: &'a S,
    coprocessor: &'a mut C,
    pending: BTreeMap<Key, Value>,

    contract: Digest,
    limits: Limits,
    now: u64,
}

impl<'a, S: State, C: Coprocessor> Layer<'a, S, C> {
    pub fn new(
        state: &'a S,
        coprocessor: &'a mut C,
        namespace: &[u8],
        limits: Limits,
        now: u64,
    ) -> Self {
        Self {
            state,
            coprocessor,
            pending: BTreeMap::new(),

            contract: contract_id(namespace),
            limits,
            now,
        }
    }

    fn binding(&self, round_id: u64) -> Binding {
        Binding {
            contract: self.contract,
            round_id,
        }
    }

    async fn prepare(&mut self, transaction: &Transaction) -> Result<(), PrepareError> {
        let mut account = load_account(self, &transaction.public).await;
        validate_and_increment_nonce(&mut account, transaction.nonce)?;
        self.insert(
            Key::Account(transaction.public.clone()),
            Value::Account(account),
        )
        .await;

        Ok(())
    }

    async fn dispatch(
        &mut self,
        public: &PublicKey,
        instruction: &Instruction,
    ) -> Result<Vec<Event>, Error> {
        match instruction {
            Instruction::PlaceBet { bet, stake } => self.handle_place_bet(public, bet, *stake).await,
            Instruction::RequestSettle { round_id } => {
                self.handle_request_settle(public, *round_id).await
            }
            Instruction::FinalizeSettle {
                round_id,
                clear_payout,
                proof,
            } => {
                self.handle_finalize_settle(*round_id, clear_payout, proof)
                    .await
            }
            Instruction::Approve { amount } => self.handle_approve(public, *amount).await,
            Instruction::Faucet => self.handle_faucet(public).await,
            Instruction::FundBankroll { amount } => {
                self.handle_fund_bankroll(public, *amount).await
            }
        }
    }

    /// Runs `instruction` for `public`. On error, every write it made is undone.
    pub async fn apply(
        &mut self,
        public: &PublicKey,
        instruction: &Instruction,
    ) -> Result<Vec<Event>, Error> {
        let checkpoint = self.pending.clone();
        let result = self.dispatch(public, instruction).await;
        if result.is_err() {
            self.pending = checkpoint;
        }
        result
    }

    pub async fn execute(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> (Vec<Output>, BTreeMap<PublicKey, u64>) {
        let mut processed_nonces = BTreeMap::new();
        let mut outputs = Vec::new();

        for tx in transactions {
            if let Err(err) = self.prepare(&tx).await {
                debug!(public = ?tx.public, ?err, "skipping transaction");
                continue;
            }
            processed_nonces.insert(tx.public.clone(), tx.nonce.saturating_add(1));
            match self.apply(&tx.public, &tx.instruction).await {
                Ok(events) => outputs.extend(events.into_iter().map(Output::Event)),
                Err(err) => {
                    warn!(public = ?tx.public, nonce = tx.nonce, %err, "instruction rejected");
                    outputs.push(Output::Event(Event::Rejected {
                        player: tx.public.clone(),
                        round_id: round_of(&tx.instruction),
                        error_code: err.code(),
                        message: err.to_string(),
                    }));
                }
            }
            outputs.push(Output::Transaction(tx));
        }

        (outputs, processed_nonces)
    }

    pub fn commit(self) -> Vec<(Key, Value)> {
        self.pending.into_iter().collect()
    }
}

/// Round an instruction targets, if it names one.
fn round_of(instruction: &Instruction) -> Option<u64> {
    match instruction {
        Instruction::RequestSettle { round_id } | Instruction::FinalizeSettle { round_id, .. } => {
            Some(*round_id)
        }
        _ => None,
    }
}

impl<'a, S: State, C: Coprocessor> State for Layer<'a, S, C> {
    async fn get(&self, key: &Key) -> Option<Value> {
        match self.pending.get(key) {
            Some(value) => Some(value.clone()),
            None => self.state.get(key).await,
        }
    }

    async fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, value);
    }
}
