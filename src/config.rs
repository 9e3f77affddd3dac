use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::assets::layout::AssetLayout;
use crate::assets::texture::TextureStore;
use crate::foundation::core::CanvasSize;
use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::render::compositor::FrameGeometry;
use crate::render::session::RenderSessionOpts;

/// Default canvas width in pixels.
pub const DEFAULT_WIDTH: u32 = 1080;
/// Default canvas height in pixels.
pub const DEFAULT_HEIGHT: u32 = 1920;
/// Default number of events composited per frame.
pub const DEFAULT_BATCH_SIZE: usize = 16;
/// Default pixel edge length of one grid cell.
pub const DEFAULT_TILE_SIZE: u32 = 16;
/// Default output frame rate.
pub const DEFAULT_FPS: u32 = 24;

/// Everything one render run needs besides its events.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    /// Canvas size in pixels.
    pub canvas: CanvasSize,
    /// Events per video frame.
    pub batch_size: usize,
    /// Pixels per grid unit.
    pub tile_size: u32,
    /// Output frames per second.
    pub fps: u32,
    /// Output file (MP4 for video, PNG for stills).
    pub output: PathBuf,
    /// Where textures are looked up.
    pub assets: AssetLayout,
    /// Upper bound on cached textures; `None` keeps every texture.
    pub texture_cache_limit: Option<NonZeroUsize>,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Pass the encoder's own output through to the terminal.
    pub show_encoder_output: bool,
    /// Run `ffprobe` on the encoded video.
    pub verify_output: bool,
    /// ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// ffprobe executable.
    pub ffprobe: PathBuf,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            canvas: CanvasSize::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            batch_size: DEFAULT_BATCH_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            fps: DEFAULT_FPS,
            output: PathBuf::new(),
            assets: AssetLayout::default(),
            texture_cache_limit: None,
            overwrite: true,
            show_encoder_output: false,
            verify_output: true,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl RenderSettings {
    /// Default settings writing to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// Reject settings no render could succeed with.
    pub fn validate(&self) -> TimelapseResult<()> {
        CanvasSize::non_empty(self.canvas.width, self.canvas.height)?;
        if self.batch_size == 0 {
            return Err(TimelapseError::validation("iterations per frame must be non-zero"));
        }
        if self.tile_size == 0 {
            return Err(TimelapseError::validation("texture size must be non-zero"));
        }
        if self.fps == 0 {
            return Err(TimelapseError::validation("framerate must be non-zero"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(TimelapseError::validation("output filename must be non-empty"));
        }
        Ok(())
    }

    /// Canvas and tile geometry.
    pub fn geometry(&self) -> TimelapseResult<FrameGeometry> {
        FrameGeometry::new(self.canvas, self.tile_size)
    }

    /// Session options derived from these settings.
    pub fn session_opts(&self) -> RenderSessionOpts {
        RenderSessionOpts {
            batch_size: self.batch_size,
            fps: self.fps,
            ..RenderSessionOpts::default()
        }
    }

    /// Fresh texture cache honoring `texture_cache_limit`.
    pub fn texture_store(&self) -> Arc<TextureStore> {
        Arc::new(TextureStore::new(self.texture_cache_limit))
    }
}
