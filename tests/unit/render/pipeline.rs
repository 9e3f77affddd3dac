use chrono::{TimeZone, Utc};

use super::*;
use crate::assets::layout::AssetLayout;
use crate::encode::probe::GpuVendor;
use crate::encode::select::EncoderFamily;
use crate::foundation::core::CanvasSize;

struct NoGpu;

impl CapabilityProbe for NoGpu {
    fn display_adapters(&self, _vendor: GpuVendor) -> Option<String> {
        None
    }

    fn has_encoder(&self, _codec: &str) -> bool {
        false
    }
}

fn ev(t: i64, x: i64, y: i64, c: &str) -> PlacementEvent {
    PlacementEvent::new(Utc.timestamp_opt(t, 0).unwrap(), x, y, c)
}

fn settings(dir: &std::path::Path, out: &str) -> RenderSettings {
    image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 128, 0, 255]))
        .save_with_format(dir.join("green.png"), image::ImageFormat::Png)
        .unwrap();
    RenderSettings {
        canvas: CanvasSize::new(6, 4),
        tile_size: 2,
        assets: AssetLayout::new(dir),
        ..RenderSettings::new(dir.join(out))
    }
}

#[test]
fn still_file_is_written_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(dir.path(), "nested/still.png");

    let stats = render_still_file(
        &[ev(1, 2, 1, "green"), ev(2, 2, 1, "GREEN"), ev(3, 9, 9, "green")],
        &s,
        s.texture_store(),
    )
    .unwrap();
    assert_eq!(stats.events_drawn, 2);

    let png = image::open(&s.output).unwrap().to_rgba8();
    assert_eq!(png.dimensions(), (6, 4));
    assert_eq!(png.get_pixel(5, 3).0, [0, 128, 0, 255]);
    assert_eq!(png.get_pixel(0, 0).0, [255, 255, 255, 255]);
}

#[test]
fn still_without_events_is_the_background() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(dir.path(), "empty.png");
    let stats = render_still_file(&[], &s, s.texture_store()).unwrap();
    assert_eq!(stats.events_drawn, 0);
    assert!(s.output.exists());
}

#[test]
fn still_respects_overwrite_flag() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = settings(dir.path(), "keep.png");
    std::fs::write(&s.output, b"keep").unwrap();
    s.overwrite = false;
    assert!(render_still_file(&[], &s, s.texture_store()).is_err());
    assert_eq!(std::fs::read(&s.output).unwrap(), b"keep");
}

#[test]
fn video_requires_events() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(dir.path(), "video.mp4");
    let err = render_video_file(&[], &s, &NoGpu, s.texture_store()).unwrap_err();
    assert!(matches!(err, TimelapseError::Validation(_)));
}

#[test]
fn video_reports_missing_encoder_binary() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = settings(dir.path(), "video.mp4");
    s.ffmpeg = "tilelapse-definitely-missing-ffmpeg".into();
    let err = render_video_file(&[ev(1, 0, 0, "green")], &s, &NoGpu, s.texture_store())
        .unwrap_err();
    assert!(matches!(err, TimelapseError::Encoder(_)), "{err}");
    assert!(!s.output.exists());
}

#[test]
fn video_plan_picks_software_encoder_without_gpu() {
    let dir = tempfile::tempdir().unwrap();
    let s = settings(dir.path(), "video.mp4");
    let opts = plan_video_output(&s, &NoGpu).unwrap();
    assert_eq!(opts.settings.family(), EncoderFamily::Software);
    assert_eq!(opts.output_size, None);
    assert_eq!(opts.out_path, s.output);
}

#[test]
fn video_plan_rejects_odd_output_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = settings(dir.path(), "video.mp4");
    s.canvas = CanvasSize::new(7, 4);
    let err = plan_video_output(&s, &NoGpu).unwrap_err();
    assert!(matches!(err, TimelapseError::Validation(_)), "{err}");
    assert!(err.to_string().contains("must be even"), "{err}");
    assert!(!s.output.exists());
}
