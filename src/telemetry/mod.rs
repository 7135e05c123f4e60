//! Invocation telemetry: identity, gating, listeners and deferred emission.
//!
//! # EMISSION INVARIANT
//! Emission is a side effect that runs on a later scheduling turn than the
//! call it describes. It must **NEVER** change what the caller receives, and a
//! failure inside a listener must **NEVER** reach the caller.
//!
//! # GATING INVARIANT
//! The toggle is read once, immediately before dispatch. The state at call
//! time is irrelevant.

pub mod event;
pub mod ids;
pub mod registry;
pub mod scheduler;
pub mod toggle;
