use crate::encode::sink::{FrameSink, SinkConfig, SinkExit};
use crate::events::dedup::latest_per_cell;
use crate::events::model::PlacementEvent;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::render::compositor::{
    Canvas, CompositeStats, Compositor, FrameGeometry, PixelFormat, write_frame,
};

/// Options controlling how a [`RenderSession`] batches and serializes frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSessionOpts {
    /// Events composited into each video frame.
    pub batch_size: usize,
    /// Output frames per second.
    pub fps: u32,
    /// Byte layout of frames handed to the sink.
    pub pixel_format: PixelFormat,
}

impl Default for RenderSessionOpts {
    fn default() -> Self {
        Self {
            batch_size: 16,
            fps: 24,
            pixel_format: PixelFormat::Rgb24,
        }
    }
}

/// Counters for one render run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames produced.
    pub frames: u64,
    /// Events drawn.
    pub events_drawn: u64,
    /// Events skipped because their texture was unusable.
    pub events_skipped: u64,
}

impl RenderStats {
    fn add(&mut self, composite: CompositeStats) {
        self.events_drawn += composite.drawn;
        self.events_skipped += composite.skipped;
    }
}

/// Stateful renderer: owns the running canvas and the reusable frame buffer.
///
/// In video mode every batch is drawn on top of the previous frame's canvas, so the image
/// accumulates over time.
pub struct RenderSession {
    compositor: Compositor,
    geometry: FrameGeometry,
    opts: RenderSessionOpts,
    canvas: Option<Canvas>,
    frame_buffer: Vec<u8>,
}

impl RenderSession {
    /// Create a session drawing through `compositor`.
    pub fn new(
        compositor: Compositor,
        geometry: FrameGeometry,
        opts: RenderSessionOpts,
    ) -> TimelapseResult<Self> {
        geometry.validate()?;
        if opts.batch_size == 0 {
            return Err(TimelapseError::validation("batch size must be non-zero"));
        }
        if opts.fps == 0 {
            return Err(TimelapseError::validation("fps must be non-zero"));
        }
        Ok(Self {
            compositor,
            geometry,
            opts,
            canvas: None,
            frame_buffer: Vec::new(),
        })
    }

    /// Geometry frames are rendered at.
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Canvas left by the most recent render, if any.
    pub fn last_canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    /// Serialized bytes of the most recent video frame.
    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_buffer
    }

    /// Render `events` as a video: one frame per batch, streamed into `sink`.
    ///
    /// Before each batch the sink is polled; if its consumer already terminated, rendering stops
    /// with an error naming the frame that could not be delivered, and nothing more is written.
    #[tracing::instrument(skip_all, fields(events = events.len(), batch_size = self.opts.batch_size))]
    pub fn render_video(
        &mut self,
        events: &[PlacementEvent],
        sink: &mut dyn FrameSink,
    ) -> TimelapseResult<RenderStats> {
        if events.is_empty() {
            return Err(TimelapseError::validation("no placement events to render"));
        }

        let frames_total = events.len().div_ceil(self.opts.batch_size);
        tracing::info!(
            frames = frames_total,
            size = %self.geometry.size,
            fps = self.opts.fps,
            "rendering video"
        );

        sink.begin(SinkConfig {
            size: self.geometry.size,
            fps: self.opts.fps,
            pixel_format: self.opts.pixel_format,
        })?;

        self.canvas = None;
        let mut stats = RenderStats::default();
        for (i, batch) in events.chunks(self.opts.batch_size).enumerate() {
            let frame = i as u64;
            match sink.poll_exit() {
                Some(SinkExit::Failed(message)) => {
                    return Err(TimelapseError::EncoderFailed { frame, message });
                }
                Some(SinkExit::Clean) => {
                    return Err(TimelapseError::EncoderExitedEarly { frame });
                }
                None => {}
            }

            let base = self.canvas.take();
            let (canvas, composite) =
                self.compositor.compose_with_stats(base, batch, self.geometry)?;
            write_frame(&canvas, self.opts.pixel_format, &mut self.frame_buffer);
            self.canvas = Some(canvas);

            sink.push_frame(FrameIndex(frame), &self.frame_buffer)?;
            stats.frames += 1;
            stats.add(composite);

            if stats.frames % 100 == 0 {
                tracing::info!("rendered {} of {} frames", stats.frames, frames_total);
            }
        }

        sink.end()?;
        tracing::info!(
            frames = stats.frames,
            drawn = stats.events_drawn,
            skipped = stats.events_skipped,
            "video render complete"
        );
        Ok(stats)
    }

    /// Render one still image of the latest placement at every cell onto a fresh canvas.
    ///
    /// The result is available through [`RenderSession::last_canvas`].
    #[tracing::instrument(skip_all, fields(events = events.len()))]
    pub fn render_still(&mut self, events: &[PlacementEvent]) -> TimelapseResult<RenderStats> {
        let latest = latest_per_cell(events);
        tracing::info!(
            cells = latest.len(),
            dropped = events.len() - latest.len(),
            "deduplicated placements"
        );

        let (canvas, composite) = self
            .compositor
            .compose_with_stats(None, &latest, self.geometry)?;
        self.canvas = Some(canvas);

        let mut stats = RenderStats {
            frames: 1,
            ..RenderStats::default()
        };
        stats.add(composite);
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/session.rs"]
mod tests;
