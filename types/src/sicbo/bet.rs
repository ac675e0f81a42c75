use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use serde::Serialize;

/// Bet categories offered by the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum BetType {
    /// `a`: 0 = Small (4-10), 1 = Big (11-17). Triples lose.
    BigSmall = 0,
    /// `a`: exact total in 3..=18.
    SumExact = 1,
    /// No parameters, wins on any triple.
    AnyTriple = 2,
    /// `a`: face in 1..=6, wins when all three dice show it.
    SpecificTriple = 3,
    /// `a`: face in 1..=6, pays once per die showing it.
    SingleNumber = 4,
}

impl BetType {
    pub const ALL: [BetType; 5] = [
        BetType::BigSmall,
        BetType::SumExact,
        BetType::AnyTriple,
        BetType::SpecificTriple,
        BetType::SingleNumber,
    ];
}

impl TryFrom<u8> for BetType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::BigSmall),
            1 => Ok(Self::SumExact),
            2 => Ok(Self::AnyTriple),
            3 => Ok(Self::SpecificTriple),
            4 => Ok(Self::SingleNumber),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl Write for BetType {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for BetType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Self::try_from(u8::read(reader)?)
    }
}

impl FixedSize for BetType {
    const SIZE: usize = 1;
}

/// `a` value selecting Small for [BetType::BigSmall].
pub const SMALL: u8 = 0;

/// `a` value selecting Big for [BetType::BigSmall].
pub const BIG: u8 = 1;

/// Shape of a wager. Whether `a` and `b` are meaningful depends on `bet_type`.
///
/// Binary: [betType:u8] [a:u8] [b:u8]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bet {
    pub bet_type: BetType,
    pub a: u8,
    pub b: u8,
}

impl Bet {
    pub fn new(bet_type: BetType, a: u8, b: u8) -> Self {
        Self { bet_type, a, b }
    }

    pub fn small() -> Self {
        Self::new(BetType::BigSmall, SMALL, 0)
    }

    pub fn big() -> Self {
        Self::new(BetType::BigSmall, BIG, 0)
    }

    pub fn sum(total: u8) -> Self {
        Self::new(BetType::SumExact, total, 0)
    }

    pub fn any_triple() -> Self {
        Self::new(BetType::AnyTriple, 0, 0)
    }

    pub fn specific_triple(face: u8) -> Self {
        Self::new(BetType::SpecificTriple, face, 0)
    }

    pub fn single(face: u8) -> Self {
        Self::new(BetType::SingleNumber, face, 0)
    }
}

impl Write for Bet {
    fn write(&self, writer: &mut impl BufMut) {
        self.bet_type.write(writer);
        self.a.write(writer);
        self.b.write(writer);
    }
}

impl Read for Bet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            bet_type: BetType::read(reader)?,
            a: u8::read(reader)?,
            b: u8::read(reader)?,
        })
    }
}

impl FixedSize for Bet {
    const SIZE: usize = BetType::SIZE + u8::SIZE + u8::SIZE;
}
