//! # Identity Precompile (0x04)
//!
//! Returns the input unchanged.

use super::{PrecompileEnv, PrecompiledContract};
use crate::domain::services::words;
use crate::domain::value_objects::Bytes;
use crate::errors::PrecompileError;

/// Gas cost per word.
const IDENTITY_WORD_COST: u64 = 3;
/// Base gas cost.
const IDENTITY_BASE_COST: u64 = 15;

/// Identity precompile.
pub struct Identity;

impl PrecompiledContract for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        IDENTITY_BASE_COST + IDENTITY_WORD_COST * words(input.len())
    }

    fn run(&self, _env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::from_slice(input))
    }
}
