use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use crate::encode::select::{EncoderDescriptor, EncoderFamily};
use crate::encode::sink::{FrameSink, SinkConfig, SinkExit, write_frame_counted};
use crate::foundation::core::{CanvasSize, FrameIndex};
use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Render node used by VA-API encoders.
pub const DEFAULT_VAAPI_DEVICE: &str = "/dev/dri/renderD128";

/// Per-family encoder quality settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderSettings {
    /// `h264_nvenc`.
    Nvenc {
        /// NVENC preset (`p1`..`p7`).
        preset: String,
        /// Constant-quality target.
        cq: u8,
        /// Rate-control mode.
        rate_control: String,
    },
    /// `h264_amf`.
    Amf {
        /// AMF quality preset.
        quality: String,
        /// H.264 profile.
        profile: String,
    },
    /// `h264_qsv`.
    Qsv {
        /// QSV preset.
        preset: String,
        /// H.264 profile.
        profile: String,
    },
    /// `h264_vaapi`.
    Vaapi {
        /// DRM render node frames are uploaded to.
        device: PathBuf,
    },
    /// `libx264`.
    Software {
        /// x264 preset.
        preset: String,
        /// Constant rate factor.
        crf: u8,
    },
}

impl EncoderSettings {
    /// Default settings for the encoder family in `desc`.
    pub fn for_descriptor(desc: &EncoderDescriptor) -> Self {
        Self::for_family(desc.family)
    }

    /// Default settings for `family`.
    pub fn for_family(family: EncoderFamily) -> Self {
        match family {
            EncoderFamily::Nvenc => Self::Nvenc {
                preset: "p4".to_string(),
                cq: 23,
                rate_control: "vbr".to_string(),
            },
            EncoderFamily::Amf => Self::Amf {
                quality: "quality".to_string(),
                profile: "high".to_string(),
            },
            EncoderFamily::Qsv => Self::Qsv {
                preset: "quality".to_string(),
                profile: "high".to_string(),
            },
            EncoderFamily::Vaapi => Self::Vaapi {
                device: PathBuf::from(DEFAULT_VAAPI_DEVICE),
            },
            EncoderFamily::Software => Self::Software {
                preset: "medium".to_string(),
                crf: 23,
            },
        }
    }

    /// Family these settings belong to.
    pub fn family(&self) -> EncoderFamily {
        match self {
            Self::Nvenc { .. } => EncoderFamily::Nvenc,
            Self::Amf { .. } => EncoderFamily::Amf,
            Self::Qsv { .. } => EncoderFamily::Qsv,
            Self::Vaapi { .. } => EncoderFamily::Vaapi,
            Self::Software { .. } => EncoderFamily::Software,
        }
    }

    /// ffmpeg codec identifier.
    pub fn codec(&self) -> &'static str {
        self.family().codec()
    }

    fn push_codec_args(&self, args: &mut Vec<OsString>) {
        let mut push = |k: &str, v: &str| {
            args.push(k.into());
            args.push(v.into());
        };
        push("-c:v", self.codec());
        match self {
            Self::Nvenc {
                preset,
                cq,
                rate_control,
            } => {
                push("-preset", preset);
                push("-cq", &cq.to_string());
                push("-rc", rate_control);
            }
            Self::Amf { quality, profile } => {
                push("-quality", quality);
                push("-profile:v", profile);
            }
            Self::Qsv { preset, profile } => {
                push("-preset", preset);
                push("-profile:v", profile);
            }
            Self::Vaapi { .. } => {}
            Self::Software { preset, crf } => {
                push("-preset", preset);
                push("-crf", &crf.to_string());
            }
        }
    }
}

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Encoder and its quality settings.
    pub settings: EncoderSettings,
    /// Size ffmpeg scales to before encoding; `None` keeps the input size.
    pub output_size: Option<CanvasSize>,
    /// ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// Pass ffmpeg's stdout/stderr through instead of capturing them.
    pub show_output: bool,
}

impl FfmpegSinkOpts {
    /// libx264 output to `out_path` at input resolution.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            settings: EncoderSettings::for_family(EncoderFamily::Software),
            output_size: None,
            ffmpeg: PathBuf::from("ffmpeg"),
            show_output: false,
        }
    }

    /// Encoded video size.
    pub fn encoded_size(&self, input: CanvasSize) -> CanvasSize {
        self.output_size.unwrap_or(input)
    }

    /// Check `cfg` against these options before spawning anything.
    pub fn validate(&self, cfg: &SinkConfig) -> TimelapseResult<()> {
        if cfg.fps == 0 {
            return Err(TimelapseError::validation("encode fps must be non-zero"));
        }
        if cfg.size.width == 0 || cfg.size.height == 0 {
            return Err(TimelapseError::validation(
                "encode width/height must be non-zero",
            ));
        }
        let out = self.encoded_size(cfg.size);
        if !out.is_even() {
            return Err(TimelapseError::validation(format!(
                "encoded size {out} must be even (required for yuv420p mp4 output)"
            )));
        }
        if self.out_path.as_os_str().is_empty() {
            return Err(TimelapseError::validation("output path must be non-empty"));
        }
        Ok(())
    }
}

/// Full ffmpeg argument list (without the program name) for one encode.
pub fn ffmpeg_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |items: &[&str]| args.extend(items.iter().map(OsString::from));

    let loglevel = if opts.show_output { "info" } else { "error" };
    push(&["-hide_banner", "-loglevel", loglevel]);
    push(&[if opts.overwrite { "-y" } else { "-n" }]);

    if let EncoderSettings::Vaapi { device } = &opts.settings {
        args.push("-vaapi_device".into());
        args.push(device.as_os_str().to_owned());
    }

    let size = cfg.size.to_string();
    let fps = cfg.fps.to_string();
    let mut push = |items: &[&str]| args.extend(items.iter().map(OsString::from));
    push(&[
        "-f",
        "rawvideo",
        "-pix_fmt",
        cfg.pixel_format.ffmpeg_name(),
        "-s",
        size.as_str(),
        "-r",
        fps.as_str(),
        "-i",
        "pipe:0",
        "-an",
    ]);

    opts.settings.push_codec_args(&mut args);

    let mut filters = Vec::new();
    if let Some(out) = opts.output_size {
        filters.push(format!("scale={}:{}:flags=lanczos", out.width, out.height));
    }
    let vaapi = opts.settings.family() == EncoderFamily::Vaapi;
    if vaapi {
        filters.push("format=nv12,hwupload".to_string());
    }
    if !filters.is_empty() {
        args.push("-vf".into());
        args.push(filters.join(",").into());
    }
    if !vaapi {
        args.push("-pix_fmt".into());
        args.push("yuv420p".into());
    }

    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(opts.out_path.as_os_str().to_owned());
    args
}

/// Sink that spawns `ffmpeg` and streams raw frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a sink; ffmpeg is spawned in `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
        }
    }

    /// Options this sink was created with.
    pub fn opts(&self) -> &FfmpegSinkOpts {
        &self.opts
    }

    fn collect_stderr(&mut self) -> String {
        let Some(handle) = self.stderr_drain.take() else {
            return String::new();
        };
        match handle.join() {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Ok(Err(e)) => format!("<ffmpeg stderr read failed: {e}>"),
            Err(_) => "<ffmpeg stderr drain thread panicked>".to_string(),
        }
    }

    /// Close stdin, wait for ffmpeg and collect its diagnostics.
    fn reap(&mut self) -> Option<(std::io::Result<ExitStatus>, String)> {
        drop(self.stdin.take());
        let mut child = self.child.take()?;
        let status = child.wait();
        let stderr = self.collect_stderr();
        Some((status, stderr))
    }
}

fn failure_message(status: ExitStatus, stderr: &str) -> String {
    if stderr.is_empty() {
        format!("ffmpeg exited with status {status}")
    } else {
        format!("ffmpeg exited with status {status}: {stderr}")
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> TimelapseResult<()> {
        self.opts.validate(&cfg)?;
        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(TimelapseError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_available(&self.opts.ffmpeg) {
            return Err(TimelapseError::encoder(format!(
                "ffmpeg is required for MP4 encoding, but '{}' could not be run",
                self.opts.ffmpeg.display()
            )));
        }

        let args = ffmpeg_args(&self.opts, &cfg);
        tracing::debug!(?args, "spawning ffmpeg");

        let mut cmd = Command::new(&self.opts.ffmpeg);
        cmd.args(&args).stdin(Stdio::piped());
        if self.opts.show_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|e| {
            TimelapseError::encoder(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TimelapseError::encoder("failed to open ffmpeg stdin (unexpected)"))?;
        self.stderr_drain = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });

        tracing::info!(
            codec = self.opts.settings.codec(),
            input = %cfg.size,
            output = %self.opts.encoded_size(cfg.size),
            fps = cfg.fps,
            "ffmpeg started"
        );
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn poll_exit(&mut self) -> Option<SinkExit> {
        let child = self.child.as_mut()?;
        let exit = match child.try_wait() {
            Ok(None) => return None,
            Ok(Some(status)) if status.success() => SinkExit::Clean,
            Ok(Some(status)) => {
                let stderr = self.collect_stderr();
                SinkExit::Failed(failure_message(status, &stderr))
            }
            Err(e) => SinkExit::Failed(format!("failed to query ffmpeg status: {e}")),
        };
        drop(self.stdin.take());
        self.child = None;
        Some(exit)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &[u8]) -> TimelapseResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| TimelapseError::encoder("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(TimelapseError::encoder(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.len() != cfg.frame_len() {
            return Err(TimelapseError::validation(format!(
                "frame {} is {} bytes, expected {}",
                idx.0,
                frame.len(),
                cfg.frame_len()
            )));
        }
        self.last_idx = Some(idx);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TimelapseError::encoder("ffmpeg sink is already finalized"));
        };
        if let Err(e) = write_frame_counted(stdin, idx, frame) {
            if let Some((status, stderr)) = self.reap() {
                tracing::error!(frame = idx.0, ?status, stderr = %stderr, "ffmpeg stopped accepting frames");
            }
            return Err(e);
        }
        Ok(())
    }

    fn end(&mut self) -> TimelapseResult<()> {
        let (status, stderr) = self
            .reap()
            .ok_or_else(|| TimelapseError::encoder("ffmpeg sink not started"))?;
        let status = status.map_err(|e| {
            TimelapseError::encoder(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        self.cfg = None;

        if !status.success() {
            return Err(TimelapseError::encoder(failure_message(status, &stderr)));
        }
        if !stderr.is_empty() {
            tracing::debug!(stderr = %stderr, "ffmpeg diagnostics");
        }
        tracing::info!(out = %self.opts.out_path.display(), "ffmpeg finished");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some((status, stderr)) = self.reap() {
            tracing::debug!(?status, stderr = %stderr, "reaped ffmpeg on drop");
        }
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TimelapseResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_ffmpeg_available(Path::new("ffmpeg"))
}

/// Return `true` when `program -version` runs successfully.
pub fn is_ffmpeg_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
