//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the engine and the outside world.
//!
//! - **Driving Ports (Inbound)**: [`ShardExecutionApi`]
//! - **Driven Ports (Outbound)**: [`AccountStore`], [`Interpreter`],
//!   [`BlockHashOracle`], [`ConfigAccessor`], [`StateDb`]
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
