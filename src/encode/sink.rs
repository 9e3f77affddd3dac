use std::io::{ErrorKind, Write};

use crate::foundation::core::{CanvasSize, FrameIndex};
use crate::foundation::error::{TimelapseError, TimelapseResult};
use crate::render::compositor::PixelFormat;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Size of every pushed frame.
    pub size: CanvasSize,
    /// Output frames per second.
    pub fps: u32,
    /// Layout of the pushed bytes.
    pub pixel_format: PixelFormat,
}

impl SinkConfig {
    /// Byte length every pushed frame must have.
    pub fn frame_len(&self) -> usize {
        self.pixel_format.frame_len(self.size)
    }
}

/// How a sink's consumer terminated before the producer was done.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkExit {
    /// The consumer exited successfully.
    Clean,
    /// The consumer failed; carries its status and diagnostics.
    Failed(String),
}

/// Consumer of raw frames in increasing [`FrameIndex`] order.
pub trait FrameSink {
    /// Called once before any frame is pushed.
    fn begin(&mut self, cfg: SinkConfig) -> TimelapseResult<()>;
    /// Non-blocking check whether the consumer has already terminated.
    fn poll_exit(&mut self) -> Option<SinkExit>;
    /// Push one serialized frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &[u8]) -> TimelapseResult<()>;
    /// Called once after the last frame; waits for the consumer to finish.
    fn end(&mut self) -> TimelapseResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Vec<u8>)>,
    ended: bool,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, Vec<u8>)] {
        &self.frames
    }

    /// Return `true` once `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> TimelapseResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn poll_exit(&mut self) -> Option<SinkExit> {
        None
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &[u8]) -> TimelapseResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| TimelapseError::encoder("in-memory sink not started"))?;
        if frame.len() != cfg.frame_len() {
            return Err(TimelapseError::validation(format!(
                "frame {} is {} bytes, expected {}",
                idx.0,
                frame.len(),
                cfg.frame_len()
            )));
        }
        self.frames.push((idx, frame.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> TimelapseResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Write all of `frame` to `out`, reporting how many bytes made it through on failure.
pub fn write_frame_counted(
    out: &mut dyn Write,
    idx: FrameIndex,
    frame: &[u8],
) -> TimelapseResult<()> {
    let mut written = 0usize;
    while written < frame.len() {
        match out.write(&frame[written..]) {
            Ok(0) => {
                return Err(TimelapseError::FrameWrite {
                    frame: idx.0,
                    written,
                    expected: frame.len(),
                    source: std::io::Error::new(ErrorKind::WriteZero, "encoder accepted no bytes"),
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(source) => {
                return Err(TimelapseError::FrameWrite {
                    frame: idx.0,
                    written,
                    expected: frame.len(),
                    source,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
