use std::sync::Arc;

use crate::assets::layout::AssetLayout;
use crate::assets::texture::TextureStore;
use crate::events::model::{Cell, PlacementEvent};
use crate::foundation::core::CanvasSize;
use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Solid color used when the background tile cannot be loaded (opaque white).
pub const FALLBACK_BACKGROUND_RGBA: [u8; 4] = [255, 255, 255, 255];

/// Canvas size plus the pixel edge length of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Canvas dimensions in pixels.
    pub size: CanvasSize,
    /// Pixels per grid unit.
    pub tile_size: u32,
}

impl FrameGeometry {
    /// Create a validated geometry.
    pub fn new(size: CanvasSize, tile_size: u32) -> TimelapseResult<Self> {
        let geom = Self { size, tile_size };
        geom.validate()?;
        Ok(geom)
    }

    /// Reject zero-sized canvases and tiles.
    pub fn validate(&self) -> TimelapseResult<()> {
        CanvasSize::non_empty(self.size.width, self.size.height)?;
        if self.tile_size == 0 {
            return Err(TimelapseError::validation("tile size must be non-zero"));
        }
        Ok(())
    }

    /// Top-left pixel of `cell` on the canvas (may lie outside it).
    pub fn cell_origin(&self, cell: Cell) -> (i64, i64) {
        let t = i64::from(self.tile_size);
        (cell.x.saturating_mul(t), cell.y.saturating_mul(t))
    }
}

/// RGBA8 surface that frames are composited onto.
#[derive(Clone, Debug, PartialEq)]
pub struct Canvas {
    image: image::RgbaImage,
}

impl Canvas {
    /// Canvas of `size` filled with one color.
    pub fn filled(size: CanvasSize, rgba: [u8; 4]) -> Self {
        Self {
            image: image::RgbaImage::from_pixel(size.width, size.height, image::Rgba(rgba)),
        }
    }

    /// Wrap an existing image.
    pub fn from_image(image: image::RgbaImage) -> Self {
        Self { image }
    }

    /// Canvas dimensions.
    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.image.width(), self.image.height())
    }

    /// RGBA value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Borrow the underlying image.
    pub fn image(&self) -> &image::RgbaImage {
        &self.image
    }

    /// Take the underlying image.
    pub fn into_image(self) -> image::RgbaImage {
        self.image
    }
}

/// Raw pixel layout handed to the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit RGB, alpha dropped.
    #[default]
    Rgb24,
    /// Packed 8-bit RGBA.
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgba => 4,
        }
    }

    /// Name of this layout for ffmpeg's `-pix_fmt`.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Rgb24 => "rgb24",
            Self::Rgba => "rgba",
        }
    }

    /// Byte length of one frame of `size`.
    pub fn frame_len(self, size: CanvasSize) -> usize {
        (size.width as usize)
            .saturating_mul(size.height as usize)
            .saturating_mul(self.bytes_per_pixel())
    }
}

/// Serialize `canvas` row-major into `buf`.
///
/// `buf` is only resized when its length differs from the frame length, so a buffer reused
/// across same-sized frames is never reallocated.
pub fn write_frame(canvas: &Canvas, format: PixelFormat, buf: &mut Vec<u8>) {
    let len = format.frame_len(canvas.size());
    if buf.len() != len {
        buf.resize(len, 0);
    }

    let src = canvas.image.as_raw();
    match format {
        PixelFormat::Rgba => buf.copy_from_slice(src),
        PixelFormat::Rgb24 => {
            for (d, s) in buf.chunks_exact_mut(3).zip(src.chunks_exact(4)) {
                d.copy_from_slice(&s[..3]);
            }
        }
    }
}

/// Counters for one compositing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Events drawn.
    pub drawn: u64,
    /// Events skipped because their texture could not be resolved or loaded.
    pub skipped: u64,
}

/// Draws background tiles and placement textures onto canvases.
#[derive(Clone, Debug)]
pub struct Compositor {
    textures: Arc<TextureStore>,
    layout: AssetLayout,
    fallback_rgba: [u8; 4],
}

impl Compositor {
    /// Create a compositor resolving textures through `layout` and caching them in `textures`.
    pub fn new(textures: Arc<TextureStore>, layout: AssetLayout) -> Self {
        Self {
            textures,
            layout,
            fallback_rgba: FALLBACK_BACKGROUND_RGBA,
        }
    }

    /// Override the solid fill used under (or instead of) the background tiles.
    pub fn with_fallback_rgba(mut self, rgba: [u8; 4]) -> Self {
        self.fallback_rgba = rgba;
        self
    }

    /// Shared texture cache.
    pub fn textures(&self) -> &Arc<TextureStore> {
        &self.textures
    }

    /// Asset layout used to resolve identifiers.
    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    /// Fresh canvas: solid fill, then the background texture tiled every `tile_size` pixels.
    pub fn background(&self, geom: FrameGeometry) -> Canvas {
        let mut canvas = Canvas::filled(geom.size, self.fallback_rgba);

        let tile = match self
            .layout
            .background_path()
            .and_then(|p| self.textures.get(&p))
        {
            Ok(tile) => tile,
            Err(e) => {
                tracing::warn!("could not load background texture, using solid fill: {e}");
                return canvas;
            }
        };

        let step = geom.tile_size as usize;
        for y in (0..geom.size.height).step_by(step) {
            for x in (0..geom.size.width).step_by(step) {
                image::imageops::overlay(
                    &mut canvas.image,
                    tile.image(),
                    i64::from(x),
                    i64::from(y),
                );
            }
        }
        canvas
    }

    /// Draw `events` in order onto `base` (or onto a fresh background when `base` is `None`).
    pub fn compose(
        &self,
        base: Option<Canvas>,
        events: &[PlacementEvent],
        geom: FrameGeometry,
    ) -> TimelapseResult<Canvas> {
        self.compose_with_stats(base, events, geom)
            .map(|(canvas, _)| canvas)
    }

    /// Like [`Compositor::compose`], also returning how many events were drawn or skipped.
    pub fn compose_with_stats(
        &self,
        base: Option<Canvas>,
        events: &[PlacementEvent],
        geom: FrameGeometry,
    ) -> TimelapseResult<(Canvas, CompositeStats)> {
        geom.validate()?;
        let mut canvas = match base {
            Some(canvas) if canvas.size() != geom.size => {
                return Err(TimelapseError::validation(format!(
                    "base canvas is {}, expected {}",
                    canvas.size(),
                    geom.size
                )));
            }
            Some(canvas) => canvas,
            None => self.background(geom),
        };
        let stats = self.draw_events(&mut canvas, events, geom);
        Ok((canvas, stats))
    }

    /// Draw `events` in order onto `canvas`. Later events at the same cell paint over earlier
    /// ones; events whose texture cannot be loaded are logged and skipped.
    pub fn draw_events(
        &self,
        canvas: &mut Canvas,
        events: &[PlacementEvent],
        geom: FrameGeometry,
    ) -> CompositeStats {
        let mut stats = CompositeStats::default();
        for ev in events {
            let texture = match self
                .layout
                .texture_path(&ev.texture)
                .and_then(|p| self.textures.get(&p))
            {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(texture = %ev.texture, x = ev.x, y = ev.y, "skipping placement: {e}");
                    stats.skipped += 1;
                    continue;
                }
            };

            let (px, py) = geom.cell_origin(ev.cell());
            image::imageops::overlay(&mut canvas.image, texture.image(), px, py);
            stats.drawn += 1;
        }
        stats
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
