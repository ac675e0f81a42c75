use super::super::*;
use crate::token;
use sicbo_types::sicbo::FAUCET_AMOUNT;

impl<'a, S: State, C: Coprocessor> Layer<'a, S, C> {
    pub(in crate::layer) async fn handle_approve(
        &mut self,
        public: &PublicKey,
        amount: u64,
    ) -> Result<Vec<Event>, Error> {
        token::approve(self, public, amount).await;
        Ok(vec![Event::Approved {
            owner: public.clone(),
            amount,
        }])
    }

    pub(in crate::layer) async fn handle_faucet(
        &mut self,
        public: &PublicKey,
    ) -> Result<Vec<Event>, Error> {
        let now = self.now;
        let balance = token::claim_faucet(self, public, now).await?;
        Ok(vec![Event::Deposited {
            player: public.clone(),
            amount: FAUCET_AMOUNT,
            balance,
        }])
    }

    pub(in crate::layer) async fn handle_fund_bankroll(
        &mut self,
        public: &PublicKey,
        amount: u64,
    ) -> Result<Vec<Event>, Error> {
        let bankroll = token::fund_bankroll(self, public, amount).await?;
        debug!(funder = ?public, amount, bankroll, "bankroll funded");
        Ok(vec![Event::BankrollFunded {
            funder: public.clone(),
            amount,
            bankroll,
        }])
    }
}
