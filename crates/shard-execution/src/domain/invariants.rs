//! # Domain Invariants
//!
//! Structural checks every inbound message must pass before it touches
//! account state. A violation rejects the message permanently
//! (`InvalidMessage`).

use crate::domain::message::{DeployPayload, Message, MessageFlags};
use crate::domain::value_objects::{Address, ShardId};
use thiserror::Error;

/// Reason a message was rejected as malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Destination lives on another shard.
    #[error("destination {to:?} belongs to {actual}, not {expected}")]
    WrongShard {
        /// Destination address.
        to: Address,
        /// Shard executing the message.
        expected: ShardId,
        /// Shard encoded in the destination.
        actual: ShardId,
    },

    /// Flags that cannot be combined.
    #[error("conflicting message flags: {0:?}")]
    ConflictingFlags(MessageFlags),

    /// Deploy payload could not be parsed.
    #[error("deploy payload too short: {0} bytes")]
    MalformedDeployPayload(usize),

    /// Deploy destination differs from the derived address.
    #[error("deploy destination {to:?} does not match derived address {derived:?}")]
    DeployAddressMismatch {
        /// Destination given in the message.
        to: Address,
        /// Address derived from the payload.
        derived: Address,
    },
}

/// Checks shard membership and flag consistency.
///
/// # Errors
///
/// Returns the first violated rule.
pub fn check_message(msg: &Message, shard: ShardId) -> Result<(), InvariantViolation> {
    let actual = msg.to.shard_id();
    if actual != shard {
        return Err(InvariantViolation::WrongShard {
            to: msg.to,
            expected: shard,
            actual,
        });
    }

    let flags = msg.flags;
    let returns = MessageFlags::REFUND | MessageFlags::BOUNCE;
    if flags.contains(returns) {
        return Err(InvariantViolation::ConflictingFlags(flags));
    }
    if msg.is_external() && flags.intersects(returns | MessageFlags::RESPONSE) {
        return Err(InvariantViolation::ConflictingFlags(flags));
    }
    if msg.is_deploy() && flags.intersects(returns | MessageFlags::RESPONSE) {
        return Err(InvariantViolation::ConflictingFlags(flags));
    }

    if msg.is_deploy() {
        check_deploy(msg, shard)?;
    }
    Ok(())
}

/// Parses the deploy payload and checks the destination.
///
/// # Errors
///
/// Returns a violation when the payload is short or the address differs.
pub fn check_deploy(msg: &Message, shard: ShardId) -> Result<DeployPayload, InvariantViolation> {
    let payload = DeployPayload::parse(msg.data.as_slice())
        .ok_or(InvariantViolation::MalformedDeployPayload(msg.data.len()))?;
    let derived = payload.address(shard);
    if derived != msg.to {
        return Err(InvariantViolation::DeployAddressMismatch {
            to: msg.to,
            derived,
        });
    }
    Ok(payload)
}
