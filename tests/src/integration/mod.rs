//! Cross-module scenarios for the shard execution engine.

#[cfg(test)]
pub(crate) mod fixtures;

pub mod conservation;
pub mod forwarding;
pub mod idempotence;
pub mod service_flow;
pub mod shard_boundary;
