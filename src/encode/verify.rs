use std::path::Path;
use std::process::Command;

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Summary of the first video stream of an encoded file.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct VideoProbeReport {
    /// Codec name as reported by ffprobe (`h264`, ...).
    pub codec_name: Option<String>,
    /// Encoded width.
    pub width: Option<u32>,
    /// Encoded height.
    pub height: Option<u32>,
    /// Frames counted by decoding the stream.
    pub frames: Option<u64>,
}

impl std::fmt::Display for VideoProbeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let codec = self.codec_name.as_deref().unwrap_or("?");
        match (self.width, self.height) {
            (Some(w), Some(h)) => write!(f, "{codec} {w}x{h}")?,
            _ => write!(f, "{codec} ?x?")?,
        }
        match self.frames {
            Some(n) => write!(f, ", {n} frames"),
            None => write!(f, ", ? frames"),
        }
    }
}

#[derive(serde::Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    // ffprobe prints counters as JSON strings.
    nb_read_frames: Option<String>,
}

/// Parse `ffprobe -of json` output into a report for the first stream.
pub fn parse_probe_json(json: &str) -> TimelapseResult<VideoProbeReport> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| TimelapseError::encoder(format!("invalid ffprobe output: {e}")))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| TimelapseError::encoder("ffprobe found no video stream"))?;
    Ok(VideoProbeReport {
        codec_name: stream.codec_name,
        width: stream.width,
        height: stream.height,
        frames: stream.nb_read_frames.and_then(|n| n.trim().parse().ok()),
    })
}

/// Inspect the encoded file at `path` with `ffprobe`.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn verify_output(ffprobe: &Path, path: &Path) -> TimelapseResult<VideoProbeReport> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=width,height,nb_read_frames,codec_name",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            TimelapseError::encoder(format!(
                "failed to run '{}' (is it installed?): {e}",
                ffprobe.display()
            ))
        })?;

    if !output.status.success() {
        return Err(TimelapseError::encoder(format!(
            "ffprobe exited with status {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    parse_probe_json(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/verify.rs"]
mod tests;
