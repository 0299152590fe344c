//! Gatewright translates declaratively attached traffic-management policies into
//! concrete proxy configuration.
//!
//! The library is a pure transformation: the surrounding controller hands in a
//! read-only [`snapshot::Snapshot`] of policies, targets, secrets and backends, and
//! receives wire configuration plus per-object error lists back. Nothing here opens
//! network connections, blocks, or keeps process-wide state; the same snapshot always
//! produces structurally equal output, so callers can memoize and diff results.

pub use gatewright_core::prelude::*;
pub use macro_rules_attribute::apply;

pub mod index;
pub mod jwks;
pub mod merge;
pub mod serdes;
pub mod snapshot;
pub mod translate;
pub mod types;

pub use serdes::*;
pub use translate::PolicyError;
