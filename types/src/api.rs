use crate::{
    execution::Transaction,
    sicbo::{Handle, SignedUserDecrypt, MAX_USER_DECRYPT_HANDLES},
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};

/// Maximum number of transactions that can be submitted in a single submission
pub const MAX_SUBMISSION_TRANSACTIONS: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Transactions(Vec<Transaction>),
}

impl Write for Submission {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Submission::Transactions(txs) => {
                0u8.write(writer);
                txs.write(writer);
            }
        }
    }
}

impl Read for Submission {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Submission::Transactions(Vec::read_range(
                reader,
                1..=MAX_SUBMISSION_TRANSACTIONS,
            )?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Submission {
    fn encode_size(&self) -> usize {
        1 + match self {
            Submission::Transactions(txs) => txs.encode_size(),
        }
    }
}

/// Request to privately reveal `handles` to the player that signed `consent`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDecryptSubmission {
    pub handles: Vec<Handle>,
    pub consent: SignedUserDecrypt,
}

impl Write for UserDecryptSubmission {
    fn write(&self, writer: &mut impl BufMut) {
        self.handles.write(writer);
        self.consent.write(writer);
    }
}

impl Read for UserDecryptSubmission {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            handles: Vec::<Handle>::read_range(reader, 1..=MAX_USER_DECRYPT_HANDLES)?,
            consent: SignedUserDecrypt::read(reader)?,
        })
    }
}

impl EncodeSize for UserDecryptSubmission {
    fn encode_size(&self) -> usize {
        self.handles.encode_size() + self.consent.encode_size()
    }
}
