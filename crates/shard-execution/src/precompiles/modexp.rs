//! # ModExp Precompile (0x05)
//!
//! Modular exponentiation for operands up to 32 bytes.
//!
//! Input format:
//! - bytes 0-31: length of base (Bsize)
//! - bytes 32-63: length of exponent (Esize)
//! - bytes 64-95: length of modulus (Msize)
//! - then base, exponent and modulus, each big-endian
//!
//! Operands longer than 32 bytes revert.

use super::{PrecompileEnv, PrecompiledContract};
use crate::domain::value_objects::{Bytes, U256};
use crate::errors::PrecompileError;
use primitive_types::U512;

/// Minimum gas cost.
const MODEXP_MIN_GAS: u64 = 200;

/// Largest supported operand.
const MAX_OPERAND_LEN: usize = 32;

/// ModExp precompile.
pub struct ModExp;

impl PrecompiledContract for ModExp {
    fn name(&self) -> &'static str {
        "modexp"
    }

    fn required_gas(&self, input: &[u8]) -> u64 {
        let base_len = parse_len(input, 0);
        let exp_len = parse_len(input, 32);
        let mod_len = parse_len(input, 64);

        let words = base_len.max(mod_len).div_ceil(8);
        let complexity = words.saturating_mul(words);

        let exp_start = 96u64.saturating_add(base_len);
        let exp_head = parse_word(input, usize::try_from(exp_start).unwrap_or(usize::MAX), exp_len.min(32));
        let head_bits = if exp_head.is_zero() {
            0
        } else {
            exp_head.bits() as u64 - 1
        };
        let iterations = if exp_len <= 32 {
            head_bits
        } else {
            (exp_len - 32).saturating_mul(8).saturating_add(head_bits)
        };

        (complexity.saturating_mul(iterations.max(1)) / 3).max(MODEXP_MIN_GAS)
    }

    fn run(&self, _env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let base_len = parse_len(input, 0);
        let exp_len = parse_len(input, 32);
        let mod_len = parse_len(input, 64);
        if [base_len, exp_len, mod_len]
            .iter()
            .any(|len| *len > MAX_OPERAND_LEN as u64)
        {
            return Err(PrecompileError::InvalidInput(format!(
                "operands longer than {MAX_OPERAND_LEN} bytes"
            )));
        }
        // Bounded by MAX_OPERAND_LEN above.
        let (base_len, exp_len, mod_len) = (base_len as usize, exp_len as usize, mod_len as usize);

        if mod_len == 0 {
            return Ok(Bytes::new());
        }

        let base = parse_word(input, 96, base_len as u64);
        let exp = parse_word(input, 96 + base_len, exp_len as u64);
        let modulus = parse_word(input, 96 + base_len + exp_len, mod_len as u64);

        let result = if modulus.is_zero() {
            U256::zero()
        } else {
            mod_pow(base, exp, modulus)
        };

        let mut word = [0u8; 32];
        result.to_big_endian(&mut word);
        Ok(Bytes::from_slice(&word[32 - mod_len..]))
    }
}

/// Reads a 32-byte length field, saturating at `u64::MAX`.
fn parse_len(input: &[u8], offset: usize) -> u64 {
    let value = parse_word(input, offset, 32);
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}

/// Reads `len` (<= 32) big-endian bytes at `offset`, zero padding past the end.
fn parse_word(input: &[u8], offset: usize, len: u64) -> U256 {
    let len = len.min(32) as usize;
    let mut bytes = [0u8; 32];
    for (i, slot) in bytes[32 - len..].iter_mut().enumerate() {
        *slot = offset
            .checked_add(i)
            .and_then(|at| input.get(at))
            .copied()
            .unwrap_or(0);
    }
    U256::from_big_endian(&bytes)
}

fn mod_pow(base: U256, mut exp: U256, modulus: U256) -> U256 {
    let mut result = U256::one() % modulus;
    let mut base = base % modulus;
    while !exp.is_zero() {
        if exp.bit(0) {
            result = mul_mod(result, base, modulus);
        }
        exp >>= 1;
        base = mul_mod(base, base, modulus);
    }
    result
}

fn mul_mod(a: U256, b: U256, m: U256) -> U256 {
    let product = a.full_mul(b) % U512::from(m);
    let mut bytes = [0u8; 64];
    product.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}
