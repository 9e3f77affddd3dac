//! Texture assets: identifier-to-path layout and the shared decode cache.

/// Identifier-to-path mapping for texture files.
pub mod layout;
/// Decoded texture cache.
pub mod texture;
