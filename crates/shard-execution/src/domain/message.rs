//! # Messages
//!
//! The unit of state transition. A message is either external (submitted by
//! a user and authenticated by the paying account's code) or internal
//! (emitted by contract execution, possibly on another shard).
//!
//! Refund, bounce and response messages are internal messages with an extra
//! flag set.

use crate::codec;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, CurrencyBalance, Hash, ShardId, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// FLAGS
// =============================================================================

/// Bitset of message flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MessageFlags(u8);

impl MessageFlags {
    /// No flags: an external message.
    pub const EMPTY: Self = Self(0);
    /// Emitted by contract execution rather than submitted by a user.
    pub const INTERNAL: Self = Self(1);
    /// Carries a deploy payload.
    pub const DEPLOY: Self = Self(1 << 1);
    /// Returns unused fee credit.
    pub const REFUND: Self = Self(1 << 2);
    /// Returns the value of a failed message.
    pub const BOUNCE: Self = Self(1 << 3);
    /// Result of an earlier request.
    pub const RESPONSE: Self = Self(1 << 4);
    /// Expects a response once executed.
    pub const REQUEST: Self = Self(1 << 5);

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if any flag in `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for MessageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for MessageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(MessageFlags, &str); 6] = [
            (MessageFlags::INTERNAL, "INTERNAL"),
            (MessageFlags::DEPLOY, "DEPLOY"),
            (MessageFlags::REFUND, "REFUND"),
            (MessageFlags::BOUNCE, "BOUNCE"),
            (MessageFlags::RESPONSE, "RESPONSE"),
            (MessageFlags::REQUEST, "REQUEST"),
        ];
        let mut first = true;
        write!(f, "MessageFlags(")?;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "EXTERNAL")?;
        }
        write!(f, ")")
    }
}

/// Dispatch category derived from [`MessageFlags`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Returns unused fee credit. Value transfer only.
    Refund,
    /// Returns the value of a failed message. Value transfer only.
    Bounce,
    /// Result of a request, resumes the caller.
    Response,
    /// User-submitted, authenticated by the payer's code.
    External,
    /// Ordinary contract-emitted call or deploy.
    Internal,
}

// =============================================================================
// MESSAGE
// =============================================================================

/// A message as it travels between shards and through the engine.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Message {
    /// Flag bitset.
    pub flags: MessageFlags,
    /// Sender. For externals, the paying account (empty means `to` pays).
    pub from: Address,
    /// Destination.
    pub to: Address,
    /// Receiver of unused fee credit. Empty means `from`.
    pub refund_to: Address,
    /// Receiver of bounced value. Empty means `from`.
    pub bounce_to: Address,
    /// Native value attached.
    pub value: Value,
    /// Value-denominated gas budget.
    pub fee_credit: Value,
    /// Non-native currencies attached.
    pub currencies: Vec<CurrencyBalance>,
    /// External sequence number (externals) or emission counter (internals).
    pub seqno: u64,
    /// Correlates requests with their responses. Zero when unused.
    pub request_id: u64,
    /// Call data, deploy payload, or response payload.
    pub data: Bytes,
    /// Authentication data for externals. Excluded from the hash.
    pub auth_data: Bytes,
}

impl Message {
    /// Creates an external message to `to`.
    #[must_use]
    pub fn external(to: Address) -> Self {
        Self {
            to,
            ..Self::default()
        }
    }

    /// Creates an internal message from `from` to `to`.
    #[must_use]
    pub fn internal(from: Address, to: Address) -> Self {
        Self {
            flags: MessageFlags::INTERNAL,
            from,
            to,
            ..Self::default()
        }
    }

    /// Adds flags.
    #[must_use]
    pub fn with_flags(mut self, flags: MessageFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = from;
        self
    }

    /// Sets the attached value.
    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    /// Sets the fee credit.
    #[must_use]
    pub fn with_fee_credit(mut self, fee_credit: Value) -> Self {
        self.fee_credit = fee_credit;
        self
    }

    /// Sets attached currencies.
    #[must_use]
    pub fn with_currencies(mut self, currencies: Vec<CurrencyBalance>) -> Self {
        self.currencies = currencies;
        self
    }

    /// Sets the sequence number.
    #[must_use]
    pub fn with_seqno(mut self, seqno: u64) -> Self {
        self.seqno = seqno;
        self
    }

    /// Sets the call data.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Sets the refund receiver.
    #[must_use]
    pub fn with_refund_to(mut self, refund_to: Address) -> Self {
        self.refund_to = refund_to;
        self
    }

    /// Sets the bounce receiver.
    #[must_use]
    pub fn with_bounce_to(mut self, bounce_to: Address) -> Self {
        self.bounce_to = bounce_to;
        self
    }

    /// Sets the request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = request_id;
        self
    }

    /// Sets the authentication data.
    #[must_use]
    pub fn with_auth_data(mut self, auth_data: impl Into<Bytes>) -> Self {
        self.auth_data = auth_data.into();
        self
    }

    /// Dispatch category.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        if !self.is_internal() {
            MessageKind::External
        } else if self.flags.contains(MessageFlags::REFUND) {
            MessageKind::Refund
        } else if self.flags.contains(MessageFlags::BOUNCE) {
            MessageKind::Bounce
        } else if self.flags.contains(MessageFlags::RESPONSE) {
            MessageKind::Response
        } else {
            MessageKind::Internal
        }
    }

    /// Returns true for contract-emitted messages.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.flags.contains(MessageFlags::INTERNAL)
    }

    /// Returns true for user-submitted messages.
    #[must_use]
    pub fn is_external(&self) -> bool {
        !self.is_internal()
    }

    /// Returns true if the payload is a deploy payload.
    #[must_use]
    pub fn is_deploy(&self) -> bool {
        self.flags.contains(MessageFlags::DEPLOY)
    }

    /// Returns true if a response is expected.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.flags.contains(MessageFlags::REQUEST)
    }

    /// Returns true for value-only returns (refund or bounce).
    #[must_use]
    pub fn is_value_return(&self) -> bool {
        self.flags
            .intersects(MessageFlags::REFUND | MessageFlags::BOUNCE)
    }

    /// Account that receives unused fee credit.
    #[must_use]
    pub fn refund_address(&self) -> Address {
        self.refund_to.or(self.from)
    }

    /// Account that receives bounced value.
    #[must_use]
    pub fn bounce_address(&self) -> Address {
        self.bounce_to.or(self.from)
    }

    /// Account that pays for an external message.
    #[must_use]
    pub fn payer(&self) -> Address {
        self.from.or(self.to)
    }

    /// Shard of the destination.
    #[must_use]
    pub fn destination_shard(&self) -> ShardId {
        self.to.shard_id()
    }

    /// Content hash: keccak256 of the wire encoding with auth data cleared.
    #[must_use]
    pub fn hash(&self) -> Hash {
        let unsigned = Self {
            auth_data: Bytes::new(),
            ..self.clone()
        };
        keccak256(&codec::encode(&unsigned).unwrap_or_default())
    }
}

// =============================================================================
// DEPLOY PAYLOAD
// =============================================================================

/// Length of the salt suffix of a deploy payload.
pub const SALT_LEN: usize = 32;

/// Parsed deploy payload: `code || salt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployPayload {
    /// Contract code.
    pub code: Bytes,
    /// 32-byte salt.
    pub salt: Hash,
}

impl DeployPayload {
    /// Creates a payload.
    #[must_use]
    pub fn new(code: impl Into<Bytes>, salt: Hash) -> Self {
        Self {
            code: code.into(),
            salt,
        }
    }

    /// Parses `code || salt`. Returns None when shorter than a salt.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < SALT_LEN {
            return None;
        }
        let split = data.len() - SALT_LEN;
        Some(Self {
            code: Bytes::from_slice(&data[..split]),
            salt: Hash::from_slice(&data[split..])?,
        })
    }

    /// Encodes as `code || salt`.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.code.len() + SALT_LEN);
        out.extend_from_slice(self.code.as_slice());
        out.extend_from_slice(self.salt.as_bytes());
        Bytes(out)
    }

    /// Hash of the code.
    #[must_use]
    pub fn code_hash(&self) -> Hash {
        keccak256(self.code.as_slice())
    }

    /// Address this payload deploys to on `shard`.
    #[must_use]
    pub fn address(&self, shard: ShardId) -> Address {
        crate::domain::services::create_address(shard, self.salt, self.code_hash())
    }
}

// =============================================================================
// TESTS
// =============================================================================
