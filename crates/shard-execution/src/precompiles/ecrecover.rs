//! # Ecrecover Precompile (0x01)
//!
//! Recovers the signer address from a secp256k1 signature.
//!
//! Input format (128 bytes, zero padded):
//! - bytes 0-31: message hash
//! - bytes 32-63: v (27 or 28)
//! - bytes 64-95: r
//! - bytes 96-127: s
//!
//! Output is the 20-byte address left-padded to 32 bytes, or empty when the
//! signature is invalid.

use super::{PrecompileEnv, PrecompiledContract};
use crate::domain::services::keccak256;
use crate::domain::value_objects::Bytes;
use crate::errors::PrecompileError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Fixed gas cost for ecrecover.
const ECRECOVER_GAS: u64 = 3000;

/// Ecrecover precompile.
pub struct Ecrecover;

impl PrecompiledContract for Ecrecover {
    fn name(&self) -> &'static str {
        "ecrecover"
    }

    fn required_gas(&self, _input: &[u8]) -> u64 {
        ECRECOVER_GAS
    }

    fn run(&self, _env: &mut PrecompileEnv<'_>, input: &[u8]) -> Result<Bytes, PrecompileError> {
        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        Ok(recover(&padded).map(Bytes).unwrap_or_default())
    }
}

fn recover(input: &[u8; 128]) -> Option<Vec<u8>> {
    let hash = &input[0..32];
    let v = &input[32..64];
    if v[..31].iter().any(|b| *b != 0) {
        return None;
    }
    let recovery_id = match v[31] {
        27 => RecoveryId::try_from(0u8).ok()?,
        28 => RecoveryId::try_from(1u8).ok()?,
        _ => return None,
    };
    let signature = Signature::from_slice(&input[64..128]).ok()?;
    let key = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id).ok()?;

    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = vec![0u8; 32];
    out[12..].copy_from_slice(&digest.as_bytes()[12..]);
    Some(out)
}
