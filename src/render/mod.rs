//! Canvas compositing and the video/still render paths.

/// Background tiling, event drawing and frame serialization.
pub mod compositor;
/// File-level entry points wiring sessions to encoders and PNG output.
pub mod pipeline;
/// Stateful renderer driving batches into a sink.
pub mod session;
