//! Encoder selection and frame sinks.
//!
//! Frames are consumed by a [`sink::FrameSink`]; the production sink streams them into a system
//! `ffmpeg` process configured from the encoder picked by [`select::select_encoder`].

/// `ffmpeg`-backed sink and per-family encoder settings.
pub mod ffmpeg;
/// Host capability probing (`lspci`, `ffmpeg -encoders`).
pub mod probe;
/// GPU classification and encoder selection.
pub mod select;
/// Frame sink trait and the in-memory sink.
pub mod sink;
/// `ffprobe` inspection of encoded output.
pub mod verify;
