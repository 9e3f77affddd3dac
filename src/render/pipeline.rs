use std::sync::Arc;

use anyhow::Context as _;

use crate::assets::texture::TextureStore;
use crate::config::RenderSettings;
use crate::encode::ffmpeg::{EncoderSettings, FfmpegSink, FfmpegSinkOpts, ensure_parent_dir};
use crate::encode::probe::CapabilityProbe;
use crate::encode::select::select_encoder;
use crate::encode::sink::SinkConfig;
use crate::encode::verify::verify_output;
use crate::events::model::PlacementEvent;
use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::render::compositor::Compositor;
use crate::render::session::{RenderSession, RenderStats};

fn session_for(
    settings: &RenderSettings,
    textures: Arc<TextureStore>,
) -> TimelapseResult<RenderSession> {
    let compositor = Compositor::new(textures, settings.assets.clone());
    RenderSession::new(compositor, settings.geometry()?, settings.session_opts())
}

/// Pick the encoder for `settings` and check that the resulting output can be encoded.
///
/// Nothing is spawned; run this before loading events so configuration errors surface first.
pub fn plan_video_output(
    settings: &RenderSettings,
    probe: &dyn CapabilityProbe,
) -> TimelapseResult<FfmpegSinkOpts> {
    settings.validate()?;

    let encoder = select_encoder(probe, settings.canvas);
    let output_size = encoder.output_size(settings.canvas);
    tracing::info!(
        encoder = encoder.name(),
        codec = encoder.codec(),
        gpu = %encoder.gpu,
        "selected encoder"
    );
    if let Some(size) = output_size {
        tracing::info!("output resolution (scaled by ffmpeg): {size}");
    }

    let opts = FfmpegSinkOpts {
        out_path: settings.output.clone(),
        overwrite: settings.overwrite,
        settings: EncoderSettings::for_descriptor(&encoder),
        output_size,
        ffmpeg: settings.ffmpeg.clone(),
        show_output: settings.show_encoder_output,
    };
    opts.validate(&SinkConfig {
        size: settings.canvas,
        fps: settings.fps,
        pixel_format: settings.session_opts().pixel_format,
    })?;
    Ok(opts)
}

/// Render `events` to an MP4 at `settings.output` with the best encoder `probe` reports.
///
/// `ffmpeg` must be runnable. Verification with `ffprobe` (when enabled) only logs.
pub fn render_video_file(
    events: &[PlacementEvent],
    settings: &RenderSettings,
    probe: &dyn CapabilityProbe,
    textures: Arc<TextureStore>,
) -> TimelapseResult<RenderStats> {
    let opts = plan_video_output(settings, probe)?;
    render_planned_video(events, settings, opts, textures)
}

/// Render `events` with encoder options from [`plan_video_output`].
#[tracing::instrument(skip_all, fields(out = %settings.output.display(), events = events.len()))]
pub fn render_planned_video(
    events: &[PlacementEvent],
    settings: &RenderSettings,
    opts: FfmpegSinkOpts,
    textures: Arc<TextureStore>,
) -> TimelapseResult<RenderStats> {
    if events.is_empty() {
        return Err(TimelapseError::validation("no placement events to render"));
    }

    let mut sink = FfmpegSink::new(opts);
    let mut session = session_for(settings, Arc::clone(&textures))?;
    let stats = session.render_video(events, &mut sink)?;
    tracing::debug!(textures = ?textures.stats(), "texture cache");

    if settings.verify_output {
        match verify_output(&settings.ffprobe, &settings.output) {
            Ok(report) => tracing::info!("output verified: {report}"),
            Err(e) => tracing::warn!("could not verify output: {e}"),
        }
    }
    Ok(stats)
}

/// Render the latest placement at every cell into a PNG at `settings.output`.
#[tracing::instrument(skip_all, fields(out = %settings.output.display(), events = events.len()))]
pub fn render_still_file(
    events: &[PlacementEvent],
    settings: &RenderSettings,
    textures: Arc<TextureStore>,
) -> TimelapseResult<RenderStats> {
    settings.validate()?;
    if !settings.overwrite && settings.output.exists() {
        return Err(TimelapseError::validation(format!(
            "output file '{}' already exists",
            settings.output.display()
        )));
    }

    let mut session = session_for(settings, textures)?;
    let stats = session.render_still(events)?;
    let canvas = session
        .last_canvas()
        .ok_or_else(|| TimelapseError::validation("still render produced no canvas"))?;

    ensure_parent_dir(&settings.output)?;
    canvas
        .image()
        .save_with_format(&settings.output, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", settings.output.display()))?;
    tracing::info!(drawn = stats.events_drawn, "wrote still image");
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
