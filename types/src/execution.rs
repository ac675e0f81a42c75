use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{
    ed25519::{self, Batch, PublicKey},
    BatchVerifier, Signer,
};
use commonware_utils::union;

use crate::sicbo::{
    read_string, string_encode_size, write_string, Bet, BetType, DecryptionProof, Handle, Round,
    MAX_CLEAR_BYTES, MAX_MESSAGE_LENGTH, MAX_PLAYER_ROUNDS,
};

pub const NAMESPACE: &[u8] = b"_CONFIDENTIAL_SICBO";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub instruction: Instruction,

    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl Transaction {
    fn payload(nonce: &u64, instruction: &Instruction) -> Vec<u8> {
        let mut payload = Vec::with_capacity(u64::SIZE + instruction.encode_size());
        nonce.write(&mut payload);
        instruction.write(&mut payload);
        payload
    }

    pub fn sign(private: &ed25519::PrivateKey, nonce: u64, instruction: Instruction) -> Self {
        let signature = private.sign(
            Some(&transaction_namespace(NAMESPACE)),
            &Self::payload(&nonce, &instruction),
        );

        Self {
            nonce,
            instruction,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify_batch(&self, batch: &mut Batch) {
        batch.add(
            Some(&transaction_namespace(NAMESPACE)),
            &Self::payload(&self.nonce, &self.instruction),
            &self.public,
            &self.signature,
        );
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.instruction.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
            instruction: Instruction::read(reader)?,
            public: ed25519::PublicKey::read(reader)?,
            signature: ed25519::Signature::read(reader)?,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.instruction.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Stake tokens on a bet. Creates a round with freshly rolled encrypted dice.
    /// Binary: [0] [bet:3] [stake:u64 BE]
    PlaceBet { bet: Bet, stake: u64 },

    /// Ask for the round's payout to be opened publicly. Only the round's player.
    /// Binary: [1] [roundId:u64 BE]
    RequestSettle { round_id: u64 },

    /// Complete settlement with a proven public decryption of the payout.
    /// Binary: [2] [roundId:u64 BE] [clearPayout:vec<u8>] [proof]
    FinalizeSettle {
        round_id: u64,
        clear_payout: Vec<u8>,
        proof: DecryptionProof,
    },

    /// Set how much of the caller's balance the game may spend on bets.
    /// Binary: [3] [amount:u64 BE]
    Approve { amount: u64 },

    /// Claim the daily development allocation.
    /// Binary: [4]
    Faucet,

    /// Move tokens from the caller's balance into the shared bankroll.
    /// Binary: [5] [amount:u64 BE]
    FundBankroll { amount: u64 },
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::PlaceBet { bet, stake } => {
                0u8.write(writer);
                bet.write(writer);
                stake.write(writer);
            }
            Self::RequestSettle { round_id } => {
                1u8.write(writer);
                round_id.write(writer);
            }
            Self::FinalizeSettle {
                round_id,
                clear_payout,
                proof,
            } => {
                2u8.write(writer);
                round_id.write(writer);
                clear_payout.write(writer);
                proof.write(writer);
            }
            Self::Approve { amount } => {
                3u8.write(writer);
                amount.write(writer);
            }
            Self::Faucet => 4u8.write(writer),
            Self::FundBankroll { amount } => {
                5u8.write(writer);
                amount.write(writer);
            }
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            0 => Self::PlaceBet {
                bet: Bet::read(reader)?,
                stake: u64::read(reader)?,
            },
            1 => Self::RequestSettle {
                round_id: u64::read(reader)?,
            },
            2 => Self::FinalizeSettle {
                round_id: u64::read(reader)?,
                clear_payout: Vec::<u8>::read_range(reader, 0..=MAX_CLEAR_BYTES)?,
                proof: DecryptionProof::read(reader)?,
            },
            3 => Self::Approve {
                amount: u64::read(reader)?,
            },
            4 => Self::Faucet,
            5 => Self::FundBankroll {
                amount: u64::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::PlaceBet { .. } => Bet::SIZE + u64::SIZE,
                Self::RequestSettle { .. } => u64::SIZE,
                Self::FinalizeSettle {
                    clear_payout,
                    proof,
                    ..
                } => u64::SIZE + clear_payout.encode_size() + proof.encode_size(),
                Self::Approve { .. } | Self::FundBankroll { .. } => u64::SIZE,
                Self::Faucet => 0,
            }
    }
}

/// Per-player token account.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Account {
    /// Next expected transaction nonce.
    pub nonce: u64,
    pub balance: u64,
    /// Remaining amount the game may spend from `balance`.
    pub allowance: u64,
    /// Unix seconds of the last faucet claim (0 if never).
    pub last_faucet: u64,
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.balance.write(writer);
        self.allowance.write(writer);
        self.last_faucet.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
            balance: u64::read(reader)?,
            allowance: u64::read(reader)?,
            last_faucet: u64::read(reader)?,
        })
    }
}

impl FixedSize for Account {
    const SIZE: usize = 4 * u64::SIZE;
}

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    Account(PublicKey),
    Round(u64),
    /// Round ids created by a player, in creation order.
    PlayerRounds(PublicKey),
    /// Number of rounds created so far (also the last assigned id).
    RoundCount,
    Bankroll,
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(pk) => {
                0u8.write(writer);
                pk.write(writer);
            }
            Self::Round(id) => {
                1u8.write(writer);
                id.write(writer);
            }
            Self::PlayerRounds(pk) => {
                2u8.write(writer);
                pk.write(writer);
            }
            Self::RoundCount => 3u8.write(writer),
            Self::Bankroll => 4u8.write(writer),
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Account(PublicKey::read(reader)?),
            1 => Self::Round(u64::read(reader)?),
            2 => Self::PlayerRounds(PublicKey::read(reader)?),
            3 => Self::RoundCount,
            4 => Self::Bankroll,
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) | Self::PlayerRounds(_) => PublicKey::SIZE,
                Self::Round(_) => u64::SIZE,
                Self::RoundCount | Self::Bankroll => 0,
            }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    Account(Account),
    Round(Round),
    PlayerRounds(Vec<u64>),
    RoundCount(u64),
    Bankroll(u64),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Self::Round(round) => {
                1u8.write(writer);
                round.write(writer);
            }
            Self::PlayerRounds(ids) => {
                2u8.write(writer);
                ids.write(writer);
            }
            Self::RoundCount(count) => {
                3u8.write(writer);
                count.write(writer);
            }
            Self::Bankroll(amount) => {
                4u8.write(writer);
                amount.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Account(Account::read(reader)?),
            1 => Self::Round(Round::read(reader)?),
            2 => Self::PlayerRounds(Vec::<u64>::read_range(reader, 0..=MAX_PLAYER_ROUNDS)?),
            3 => Self::RoundCount(u64::read(reader)?),
            4 => Self::Bankroll(u64::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(account) => account.encode_size(),
                Self::Round(round) => round.encode_size(),
                Self::PlayerRounds(ids) => ids.encode_size(),
                Self::RoundCount(count) => count.encode_size(),
                Self::Bankroll(amount) => amount.encode_size(),
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RoundCreated {
        round_id: u64,
        player: PublicKey,
        bet_type: BetType,
    },
    /// The payout (and dice) of `round_id` may now be publicly decrypted.
    SettleRequested {
        round_id: u64,
        encrypted_payout: Handle,
    },
    RoundSettled {
        round_id: u64,
        clear_payout: u64,
    },
    Approved {
        owner: PublicKey,
        amount: u64,
    },
    Deposited {
        player: PublicKey,
        amount: u64,
        balance: u64,
    },
    BankrollFunded {
        funder: PublicKey,
        amount: u64,
        bankroll: u64,
    },
    /// A transaction was accepted (nonce consumed) but its instruction failed.
    Rejected {
        player: PublicKey,
        round_id: Option<u64>,
        error_code: u8,
        message: String,
    },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::RoundCreated {
                round_id,
                player,
                bet_type,
            } => {
                0u8.write(writer);
                round_id.write(writer);
                player.write(writer);
                bet_type.write(writer);
            }
            Self::SettleRequested {
                round_id,
                encrypted_payout,
            } => {
                1u8.write(writer);
                round_id.write(writer);
                encrypted_payout.write(writer);
            }
            Self::RoundSettled {
                round_id,
                clear_payout,
            } => {
                2u8.write(writer);
                round_id.write(writer);
                clear_payout.write(writer);
            }
            Self::Approved { owner, amount } => {
                3u8.write(writer);
                owner.write(writer);
                amount.write(writer);
            }
            Self::Deposited {
                player,
                amount,
                balance,
            } => {
                4u8.write(writer);
                player.write(writer);
                amount.write(writer);
                balance.write(writer);
            }
            Self::BankrollFunded {
                funder,
                amount,
                bankroll,
            } => {
                5u8.write(writer);
                funder.write(writer);
                amount.write(writer);
                bankroll.write(writer);
            }
            Self::Rejected {
                player,
                round_id,
                error_code,
                message,
            } => {
                6u8.write(writer);
                player.write(writer);
                round_id.write(writer);
                error_code.write(writer);
                write_string(message, writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            0 => Self::RoundCreated {
                round_id: u64::read(reader)?,
                player: PublicKey::read(reader)?,
                bet_type: BetType::read(reader)?,
            },
            1 => Self::SettleRequested {
                round_id: u64::read(reader)?,
                encrypted_payout: Handle::read(reader)?,
            },
            2 => Self::RoundSettled {
                round_id: u64::read(reader)?,
                clear_payout: u64::read(reader)?,
            },
            3 => Self::Approved {
                owner: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
            },
            4 => Self::Deposited {
                player: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
                balance: u64::read(reader)?,
            },
            5 => Self::BankrollFunded {
                funder: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
                bankroll: u64::read(reader)?,
            },
            6 => Self::Rejected {
                player: PublicKey::read(reader)?,
                round_id: Option::<u64>::read(reader)?,
                error_code: u8::read(reader)?,
                message: read_string(reader, MAX_MESSAGE_LENGTH)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::RoundCreated { .. } => u64::SIZE + PublicKey::SIZE + BetType::SIZE,
                Self::SettleRequested { .. } => u64::SIZE + Handle::SIZE,
                Self::RoundSettled { .. } => 2 * u64::SIZE,
                Self::Approved { .. } => PublicKey::SIZE + u64::SIZE,
                Self::Deposited { .. } => PublicKey::SIZE + 2 * u64::SIZE,
                Self::BankrollFunded { .. } => PublicKey::SIZE + 2 * u64::SIZE,
                Self::Rejected {
                    round_id, message, ..
                } => {
                    PublicKey::SIZE
                        + round_id.encode_size()
                        + u8::SIZE
                        + string_encode_size(message)
                }
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Event(event) => event.encode_size(),
                Self::Transaction(transaction) => transaction.encode_size(),
            }
    }
}
