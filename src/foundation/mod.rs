//! Core value types and the crate error taxonomy.

/// Frame indices and canvas sizes.
pub mod core;
/// `TimelapseError` and `TimelapseResult`.
pub mod error;
