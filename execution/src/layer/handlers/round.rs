use super::super::*;
use crate::{
    decryption::{decode_clear_u64, PublicDecryption},
    dice,
    fhe::Fhe,
    ledger, payout, token,
};
use sicbo_types::sicbo::{Bet, DecryptionProof, Round, RoundStatus};

impl<'a, S: State, C: Coprocessor> Layer<'a, S, C> {
    pub(in crate::layer) async fn handle_place_bet(
        &mut self,
        public: &PublicKey,
        bet: &Bet,
        stake: u64,
    ) -> Result<Vec<Event>, Error> {
        payout::validate(&self.limits, bet, stake)?;
        token::collect_stake(self, public, stake).await?;

        let round_id = ledger::next_round_id(self).await;
        let binding = self.binding(round_id);
        let (dice, encrypted_payout) = {
            let mut fhe = Fhe::new(&mut *self.coprocessor, binding);
            let dice = dice::roll(&mut fhe)?;
            let encrypted_payout = payout::compute_payout(&mut fhe, bet, &dice, stake)?;
            (dice.handles(), encrypted_payout.handle())
        };

        // Only the player may privately read their dice and payout
        for handle in dice.iter().chain([&encrypted_payout]) {
            self.coprocessor.allow(handle, public)?;
        }

        let round = Round::new(
            round_id,
            public.clone(),
            stake,
            *bet,
            dice,
            encrypted_payout,
            self.now,
        );
        ledger::create(self, round).await?;
        debug!(round_id, player = ?public, bet_type = ?bet.bet_type, stake, "round created");

        Ok(vec![Event::RoundCreated {
            round_id,
            player: public.clone(),
            bet_type: bet.bet_type,
        }])
    }

    pub(in crate::layer) async fn handle_request_settle(
        &mut self,
        public: &PublicKey,
        round_id: u64,
    ) -> Result<Vec<Event>, Error> {
        let round = ledger::get(self, round_id).await?;
        if &round.player != public {
            return Err(Error::NotAuthorized(round_id));
        }
        let round = ledger::mark_settle_requested(self, round_id).await?;

        self.coprocessor.allow_public(&round.encrypted_payout)?;
        for die in &round.dice {
            self.coprocessor.allow_public(die)?;
        }
        debug!(round_id, "settlement requested");

        Ok(vec![Event::SettleRequested {
            round_id,
            encrypted_payout: round.encrypted_payout,
        }])
    }

    /// Anyone may finalize: the proof, not the caller, is what is trusted.
    pub(in crate::layer) async fn handle_finalize_settle(
        &mut self,
        round_id: u64,
        clear_payout: &[u8],
        proof: &DecryptionProof,
    ) -> Result<Vec<Event>, Error> {
        let round = ledger::get(self, round_id).await?;
        ledger::ensure_status(&round, RoundStatus::SettleRequested)?;

        PublicDecryption::new(&*self.coprocessor).verify(
            &round.encrypted_payout,
            clear_payout,
            proof,
        )?;
        let amount = decode_clear_u64(clear_payout)?;

        if amount > 0 {
            token::pay_out(self, &round.player, amount).await?;
        }
        ledger::mark_settled(self, round_id, amount).await?;
        debug!(round_id, amount, "round settled");

        Ok(vec![Event::RoundSettled {
            round_id,
            clear_payout: amount,
        }])
    }
}
