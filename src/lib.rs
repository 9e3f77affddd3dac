#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Render timestamped tile placements into timelapse videos or still images.
//!
//! Placement events (timestamp, grid cell, texture id) come from an [`EventSource`]. In video
//! mode they are grouped into fixed-size batches, each batch is drawn onto a running canvas, and
//! every resulting frame is streamed as raw RGB into a system `ffmpeg` process. The encoder is
//! picked from the host's GPU and ffmpeg build ([`select_encoder`]), falling back to `libx264`.
//! In still mode only the latest placement per cell is drawn and the canvas is saved as PNG.
//!
//! Textures are PNG files under an asset directory ([`AssetLayout`]), decoded once and shared
//! through a [`TextureStore`].

/// Texture layout and cache.
pub mod assets;
/// Render settings and defaults.
pub mod config;
/// Encoder selection, sinks and output verification.
pub mod encode;
/// Placement events and sources.
pub mod events;
/// Shared core types and errors.
pub mod foundation;
/// Compositing and render entry points.
pub mod render;

pub use assets::layout::AssetLayout;
pub use assets::texture::{Texture, TextureStore};
pub use config::RenderSettings;
pub use encode::ffmpeg::{EncoderSettings, FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use encode::probe::{CapabilityProbe, GpuVendor, SystemProbe};
pub use encode::select::{EncoderDescriptor, EncoderFamily, GpuClass, select_encoder};
pub use encode::sink::{FrameSink, InMemorySink, SinkConfig, SinkExit};
pub use encode::verify::{VideoProbeReport, verify_output};
pub use events::dedup::latest_per_cell;
pub use events::model::{Cell, PlacementEvent};
pub use events::source::{EventSource, MemorySource, collect_events};
pub use events::sql_dump::SqlDumpSource;
pub use foundation::core::{CanvasSize, FrameIndex};
pub use foundation::error::{TimelapseError, TimelapseResult};
pub use render::compositor::{Canvas, Compositor, FrameGeometry, PixelFormat};
pub use render::pipeline::{
    plan_video_output, render_planned_video, render_still_file, render_video_file,
};
pub use render::session::{RenderSession, RenderSessionOpts, RenderStats};
