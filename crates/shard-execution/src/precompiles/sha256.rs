//! # SHA256 Precompile (0x02)
//!
//! Computes SHA-256 hash of input.

use super::{PrecompileEnv, PrecompiledContract};
use crate::domain::services::words;
use crate::domain::value_objects::Bytes;
use crate::errors::PrecompileError;
use sha2::{Digest, Sha256};

/// Gas cost per word.
const SHA256_WORD_COST: u64 = 12;
/// Base gas cost.
const SHA256_BASE_COST: u64 = 60;

/// SHA256 precompile.
pub struct Sha256Precompile;

impl PrecompiledContract for Sha256Precompile {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        SHA256_BASE_COST + SHA256_WORD_COST * words(input.len())
    }

    fn run(&self, _env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        Ok(Bytes::from_slice(&Sha256::digest(input)))
    }
}
