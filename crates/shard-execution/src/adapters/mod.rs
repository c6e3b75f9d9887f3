//! # Adapters Layer (Outer Hexagon)
//!
//! Reference implementations of the driven ports:
//! - [`InMemoryAccountStore`]: committed account state
//! - [`NativeInterpreter`]: contract code implemented in Rust, keyed by code hash
//! - [`InMemoryBlockHashes`]: historical block hashes

pub mod account_store;
pub mod block_hashes;
pub mod native;

pub use account_store::*;
pub use block_hashes::*;
pub use native::*;
