//! Typed ciphertexts.
//!
//! Payout logic only ever holds these wrappers. They expose the operations the
//! coprocessor supports and nothing that would reveal a plaintext, so there is
//! no way to branch on an encrypted value.

use sicbo_types::sicbo::Handle;

use crate::coprocessor::{Binding, Coprocessor, CoprocessorError, FheType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedBool(Handle);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedU8(Handle);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedU64(Handle);

impl EncryptedBool {
    pub fn handle(&self) -> Handle {
        self.0
    }
}

impl EncryptedU8 {
    pub fn handle(&self) -> Handle {
        self.0
    }
}

impl EncryptedU64 {
    pub fn handle(&self) -> Handle {
        self.0
    }
}

/// Homomorphic operations for one [Binding].
pub struct Fhe<'c, C: Coprocessor> {
    coprocessor: &'c mut C,
    binding: Binding,
}

impl<'c, C: Coprocessor> Fhe<'c, C> {
    pub fn new(coprocessor: &'c mut C, binding: Binding) -> Self {
        Self {
            coprocessor,
            binding,
        }
    }

    pub fn random_u8(&mut self, min: u8, max: u8) -> Result<EncryptedU8, CoprocessorError> {
        self.coprocessor
            .random(&self.binding, min, max)
            .map(EncryptedU8)
    }

    pub fn constant_u8(&mut self, value: u8) -> Result<EncryptedU8, CoprocessorError> {
        self.coprocessor
            .trivial(&self.binding, FheType::U8, value as u64)
            .map(EncryptedU8)
    }

    pub fn constant_u64(&mut self, value: u64) -> Result<EncryptedU64, CoprocessorError> {
        self.coprocessor
            .trivial(&self.binding, FheType::U64, value)
            .map(EncryptedU64)
    }

    pub fn add_u8(
        &mut self,
        lhs: &EncryptedU8,
        rhs: &EncryptedU8,
    ) -> Result<EncryptedU8, CoprocessorError> {
        self.coprocessor.add(&lhs.0, &rhs.0).map(EncryptedU8)
    }

    pub fn add_u64(
        &mut self,
        lhs: &EncryptedU64,
        rhs: &EncryptedU64,
    ) -> Result<EncryptedU64, CoprocessorError> {
        self.coprocessor.add(&lhs.0, &rhs.0).map(EncryptedU64)
    }

    pub fn equals(
        &mut self,
        lhs: &EncryptedU8,
        rhs: &EncryptedU8,
    ) -> Result<EncryptedBool, CoprocessorError> {
        self.coprocessor.equals(&lhs.0, &rhs.0).map(EncryptedBool)
    }

    /// `lhs == value` for a public `value`.
    pub fn equals_const(
        &mut self,
        lhs: &EncryptedU8,
        value: u8,
    ) -> Result<EncryptedBool, CoprocessorError> {
        let rhs = self.constant_u8(value)?;
        self.equals(lhs, &rhs)
    }

    /// `min <= value <= max` for public bounds.
    pub fn in_range(
        &mut self,
        value: &EncryptedU8,
        min: u8,
        max: u8,
    ) -> Result<EncryptedBool, CoprocessorError> {
        let lower = self.constant_u8(min)?;
        let upper = self.constant_u8(max)?;
        let above = self.coprocessor.at_least(&value.0, &lower.0).map(EncryptedBool)?;
        let below = self.coprocessor.at_most(&value.0, &upper.0).map(EncryptedBool)?;
        self.and(&above, &below)
    }

    pub fn and(
        &mut self,
        lhs: &EncryptedBool,
        rhs: &EncryptedBool,
    ) -> Result<EncryptedBool, CoprocessorError> {
        self.coprocessor.and(&lhs.0, &rhs.0).map(EncryptedBool)
    }

    pub fn not(&mut self, value: &EncryptedBool) -> Result<EncryptedBool, CoprocessorError> {
        self.coprocessor.not(&value.0).map(EncryptedBool)
    }

    pub fn select_u64(
        &mut self,
        condition: &EncryptedBool,
        if_true: &EncryptedU64,
        if_false: &EncryptedU64,
    ) -> Result<EncryptedU64, CoprocessorError> {
        self.coprocessor
            .select(&condition.0, &if_true.0, &if_false.0)
            .map(EncryptedU64)
    }
}
