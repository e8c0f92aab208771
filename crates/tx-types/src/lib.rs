//! Common types for the transaction lifecycle system.
//!
//! This crate defines the data model shared by every component that takes part
//! in a submission: the caller's intent, the lifecycle events a submission emits,
//! receipts and hashes, and the error taxonomy surfaced to callers.

/// Transaction hash, receipt and fee contract types.
pub mod delivery;
/// Error types surfaced through submission completion points.
pub mod error;
/// Lifecycle events emitted while a submission progresses.
pub mod events;
/// The caller's unsent transaction and its identity.
pub mod intent;
/// Utility functions for formatting identifiers.
pub mod utils;

pub use delivery::*;
pub use error::*;
pub use events::*;
pub use intent::*;
pub use utils::{truncate_id, with_0x_prefix};
