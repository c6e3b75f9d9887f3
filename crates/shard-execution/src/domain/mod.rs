//! # Domain Layer
//!
//! Core business logic for shard message execution.
//! Contains value objects, entities, messages, receipts, the forwarding
//! resolver, and invariant checks.

pub mod entities;
pub mod forwarding;
pub mod invariants;
pub mod message;
pub mod receipt;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use forwarding::{ForwardRequest, ForwardingPlan};
pub use invariants::InvariantViolation;
pub use message::*;
pub use receipt::*;
pub use services::*;
pub use value_objects::*;
