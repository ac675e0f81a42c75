use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use serde::Serialize;

use super::{Bet, Handle, DICE_PER_ROUND};

/// Lifecycle position of a [Round].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RoundStatus {
    Created,
    SettleRequested,
    Settled,
}

/// One bet-to-settlement unit of play.
///
/// `dice` and `encrypted_payout` are written once at creation. `settle_requested`
/// and `settled` only ever move from false to true, in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub id: u64,
    pub player: PublicKey,
    pub stake: u64,
    pub bet: Bet,
    pub dice: [Handle; DICE_PER_ROUND],
    pub encrypted_payout: Handle,
    settle_requested: bool,
    settled: bool,
    clear_payout: u64,
    pub created_at: u64,
}

impl Round {
    pub fn new(
        id: u64,
        player: PublicKey,
        stake: u64,
        bet: Bet,
        dice: [Handle; DICE_PER_ROUND],
        encrypted_payout: Handle,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            player,
            stake,
            bet,
            dice,
            encrypted_payout,
            settle_requested: false,
            settled: false,
            clear_payout: 0,
            created_at,
        }
    }

    pub fn status(&self) -> RoundStatus {
        match (self.settle_requested, self.settled) {
            (_, true) => RoundStatus::Settled,
            (true, false) => RoundStatus::SettleRequested,
            (false, false) => RoundStatus::Created,
        }
    }

    pub fn settle_requested(&self) -> bool {
        self.settle_requested
    }

    pub fn settled(&self) -> bool {
        self.settled
    }

    /// Decrypted payout, only available once the round is settled.
    pub fn clear_payout(&self) -> Option<u64> {
        self.settled.then_some(self.clear_payout)
    }

    /// Flags the round for public decryption. Returns false (and changes
    /// nothing) unless the round was just created.
    pub fn request_settlement(&mut self) -> bool {
        if self.status() != RoundStatus::Created {
            return false;
        }
        self.settle_requested = true;
        true
    }

    /// Records the decrypted payout. Returns false (and changes nothing) unless
    /// the round is awaiting settlement.
    pub fn settle(&mut self, clear_payout: u64) -> bool {
        if self.status() != RoundStatus::SettleRequested {
            return false;
        }
        self.settled = true;
        self.clear_payout = clear_payout;
        true
    }
}

impl Write for Round {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.player.write(writer);
        self.stake.write(writer);
        self.bet.write(writer);
        for die in &self.dice {
            die.write(writer);
        }
        self.encrypted_payout.write(writer);
        self.settle_requested.write(writer);
        self.settled.write(writer);
        self.clear_payout.write(writer);
        self.created_at.write(writer);
    }
}

impl Read for Round {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let id = u64::read(reader)?;
        let player = PublicKey::read(reader)?;
        let stake = u64::read(reader)?;
        let bet = Bet::read(reader)?;
        let dice = [
            Handle::read(reader)?,
            Handle::read(reader)?,
            Handle::read(reader)?,
        ];
        let encrypted_payout = Handle::read(reader)?;
        let settle_requested = bool::read(reader)?;
        let settled = bool::read(reader)?;
        if settled && !settle_requested {
            return Err(Error::Invalid("Round", "settled without settlement request"));
        }
        let clear_payout = u64::read(reader)?;
        let created_at = u64::read(reader)?;

        Ok(Self {
            id,
            player,
            stake,
            bet,
            dice,
            encrypted_payout,
            settle_requested,
            settled,
            clear_payout,
            created_at,
        })
    }
}

impl EncodeSize for Round {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.player.encode_size()
            + self.stake.encode_size()
            + self.bet.encode_size()
            + self.dice.iter().map(EncodeSize::encode_size).sum::<usize>()
            + self.encrypted_payout.encode_size()
            + self.settle_requested.encode_size()
            + self.settled.encode_size()
            + self.clear_payout.encode_size()
            + self.created_at.encode_size()
    }
}
