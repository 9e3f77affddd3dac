use super::*;
use crate::encode::select::GpuClass;
use crate::render::compositor::PixelFormat;

fn cfg(w: u32, h: u32) -> SinkConfig {
    SinkConfig {
        size: CanvasSize::new(w, h),
        fps: 24,
        pixel_format: PixelFormat::Rgb24,
    }
}

fn args_of(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<String> {
    ffmpeg_args(opts, cfg)
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[test]
fn software_args_declare_raw_input_and_yuv420p_output() {
    let opts = FfmpegSinkOpts::new("out/video.mp4");
    let args = args_of(&opts, &cfg(1080, 1920));

    assert_eq!(value_after(&args, "-f"), Some("rawvideo"));
    assert_eq!(value_after(&args, "-s"), Some("1080x1920"));
    assert_eq!(value_after(&args, "-r"), Some("24"));
    assert_eq!(value_after(&args, "-i"), Some("pipe:0"));
    assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
    assert_eq!(value_after(&args, "-preset"), Some("medium"));
    assert_eq!(value_after(&args, "-crf"), Some("23"));
    assert_eq!(value_after(&args, "-movflags"), Some("+faststart"));
    assert!(args.contains(&"-y".to_string()));
    assert!(!args.contains(&"-vf".to_string()));
    assert_eq!(args.last().map(String::as_str), Some("out/video.mp4"));

    // Input pix_fmt comes before -i, output pix_fmt after it.
    let input = args.iter().position(|a| a == "-i").unwrap();
    let fmts: Vec<usize> = args
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "-pix_fmt")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(fmts.len(), 2);
    assert!(fmts[0] < input && fmts[1] > input);
    assert_eq!(args[fmts[0] + 1], "rgb24");
    assert_eq!(args[fmts[1] + 1], "yuv420p");
}

#[test]
fn nvenc_args_carry_quality_knobs_and_scale_filter() {
    let mut opts = FfmpegSinkOpts::new("v.mp4");
    opts.settings = EncoderSettings::for_descriptor(&EncoderDescriptor {
        family: EncoderFamily::Nvenc,
        gpu: GpuClass::Nvidia,
    });
    opts.output_size = Some(CanvasSize::new(4608, 8192));
    opts.overwrite = false;

    let args = args_of(&opts, &cfg(5120, 9100));
    assert_eq!(value_after(&args, "-c:v"), Some("h264_nvenc"));
    assert_eq!(value_after(&args, "-preset"), Some("p4"));
    assert_eq!(value_after(&args, "-cq"), Some("23"));
    assert_eq!(value_after(&args, "-rc"), Some("vbr"));
    assert_eq!(value_after(&args, "-vf"), Some("scale=4608:8192:flags=lanczos"));
    assert!(args.contains(&"-n".to_string()));
}

#[test]
fn amf_and_qsv_args() {
    let mut opts = FfmpegSinkOpts::new("v.mp4");
    opts.settings = EncoderSettings::for_family(EncoderFamily::Amf);
    let args = args_of(&opts, &cfg(16, 16));
    assert_eq!(value_after(&args, "-c:v"), Some("h264_amf"));
    assert_eq!(value_after(&args, "-quality"), Some("quality"));
    assert_eq!(value_after(&args, "-profile:v"), Some("high"));

    opts.settings = EncoderSettings::for_family(EncoderFamily::Qsv);
    let args = args_of(&opts, &cfg(16, 16));
    assert_eq!(value_after(&args, "-c:v"), Some("h264_qsv"));
    assert_eq!(value_after(&args, "-preset"), Some("quality"));
}

#[test]
fn vaapi_uploads_frames_to_the_render_node() {
    let mut opts = FfmpegSinkOpts::new("v.mp4");
    opts.settings = EncoderSettings::for_family(EncoderFamily::Vaapi);
    opts.output_size = Some(CanvasSize::new(1920, 1080));

    let args = args_of(&opts, &cfg(3840, 2160));
    let device = args.iter().position(|a| a == "-vaapi_device").unwrap();
    let input = args.iter().position(|a| a == "-i").unwrap();
    assert!(device < input);
    assert_eq!(args[device + 1], DEFAULT_VAAPI_DEVICE);
    assert_eq!(
        value_after(&args, "-vf"),
        Some("scale=1920:1080:flags=lanczos,format=nv12,hwupload")
    );
    assert!(!args.contains(&"yuv420p".to_string()));
}

#[test]
fn validation_requires_even_encoded_size() {
    let mut opts = FfmpegSinkOpts::new("v.mp4");
    assert!(opts.validate(&cfg(16, 16)).is_ok());
    assert!(opts.validate(&cfg(15, 16)).is_err());
    assert!(opts.validate(&cfg(0, 16)).is_err());

    let mut zero_fps = cfg(16, 16);
    zero_fps.fps = 0;
    assert!(opts.validate(&zero_fps).is_err());

    // Odd input is fine when ffmpeg scales to an even size.
    opts.output_size = Some(CanvasSize::new(8, 8));
    assert!(opts.validate(&cfg(15, 17)).is_ok());
}

#[test]
fn begin_fails_cleanly_without_ffmpeg() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = FfmpegSinkOpts::new(dir.path().join("nested/out.mp4"));
    opts.ffmpeg = PathBuf::from("tilelapse-definitely-missing-ffmpeg");

    let mut sink = FfmpegSink::new(opts);
    let err = sink.begin(cfg(16, 16)).unwrap_err();
    assert!(matches!(err, TimelapseError::Encoder(_)), "{err}");
    assert!(sink.poll_exit().is_none());
    assert!(sink.push_frame(FrameIndex(0), &[0; 16 * 16 * 3]).is_err());
}

#[test]
fn existing_output_is_kept_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.mp4");
    std::fs::write(&out, b"keep").unwrap();

    let mut opts = FfmpegSinkOpts::new(&out);
    opts.overwrite = false;
    let err = FfmpegSink::new(opts).begin(cfg(16, 16)).unwrap_err();
    assert!(matches!(err, TimelapseError::Validation(_)), "{err}");
    assert_eq!(std::fs::read(&out).unwrap(), b"keep");
}

#[cfg(unix)]
fn fake_encoder(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt as _;

    let path = dir.join("fake-ffmpeg");
    let script = format!("#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then exit 0; fi\n{body}\n");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn wait_for_exit(sink: &mut FfmpegSink) -> SinkExit {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    loop {
        if let Some(exit) = sink.poll_exit() {
            return exit;
        }
        assert!(std::time::Instant::now() < deadline, "fake encoder never exited");
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}

#[cfg(unix)]
#[test]
fn failing_encoder_is_reported_with_its_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = FfmpegSinkOpts::new(dir.path().join("out.mp4"));
    opts.ffmpeg = fake_encoder(dir.path(), "echo 'unknown encoder' >&2\nexit 3");

    let mut sink = FfmpegSink::new(opts);
    sink.begin(cfg(4, 4)).unwrap();
    match wait_for_exit(&mut sink) {
        SinkExit::Failed(msg) => assert!(msg.contains("unknown encoder"), "{msg}"),
        SinkExit::Clean => panic!("expected failure"),
    }
    assert!(sink.poll_exit().is_none());
}

#[cfg(unix)]
#[test]
fn clean_early_exit_is_distinguished_from_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = FfmpegSinkOpts::new(dir.path().join("out.mp4"));
    opts.ffmpeg = fake_encoder(dir.path(), "exit 0");

    let mut sink = FfmpegSink::new(opts);
    sink.begin(cfg(4, 4)).unwrap();
    assert_eq!(wait_for_exit(&mut sink), SinkExit::Clean);
}

#[cfg(unix)]
#[test]
fn frames_are_streamed_to_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.mp4");
    let mut opts = FfmpegSinkOpts::new(&out);
    // The output path is the last argument.
    opts.ffmpeg = fake_encoder(dir.path(), "for last; do :; done\ncat > \"$last\"");

    let mut sink = FfmpegSink::new(opts);
    sink.begin(cfg(2, 2)).unwrap();
    sink.push_frame(FrameIndex(0), &[1; 12]).unwrap();
    sink.push_frame(FrameIndex(1), &[2; 12]).unwrap();
    assert!(sink.push_frame(FrameIndex(1), &[3; 12]).is_err());
    sink.end().unwrap();

    let written = std::fs::read(&out).unwrap();
    assert_eq!(written.len(), 24);
    assert_eq!(&written[12..], &[2; 12]);
}
