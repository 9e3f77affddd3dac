use std::io;

use super::*;

/// Accepts `limit` bytes in small chunks, then fails with a broken pipe.
struct ChokingWriter {
    accepted: Vec<u8>,
    limit: usize,
}

impl io::Write for ChokingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.accepted.len();
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        let n = buf.len().min(room).min(4);
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn cfg() -> SinkConfig {
    SinkConfig {
        size: CanvasSize::new(2, 2),
        fps: 24,
        pixel_format: PixelFormat::Rgb24,
    }
}

#[test]
fn counted_write_reports_partial_progress() {
    let mut w = ChokingWriter {
        accepted: Vec::new(),
        limit: 10,
    };
    let err = write_frame_counted(&mut w, FrameIndex(7), &[1u8; 12]).unwrap_err();
    match err {
        TimelapseError::FrameWrite {
            frame,
            written,
            expected,
            ref source,
        } => {
            assert_eq!((frame, written, expected), (7, 10, 12));
            assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(w.accepted.len(), 10);
}

#[test]
fn counted_write_completes_across_short_writes() {
    let mut w = ChokingWriter {
        accepted: Vec::new(),
        limit: 64,
    };
    write_frame_counted(&mut w, FrameIndex(0), &[9u8; 12]).unwrap();
    assert_eq!(w.accepted, vec![9u8; 12]);
}

#[test]
fn in_memory_sink_captures_frames_and_checks_length() {
    let mut sink = InMemorySink::new();
    assert!(sink.push_frame(FrameIndex(0), &[0; 12]).is_err());

    sink.begin(cfg()).unwrap();
    assert_eq!(sink.config().map(|c| c.frame_len()), Some(12));
    sink.push_frame(FrameIndex(0), &[1; 12]).unwrap();
    assert!(sink.push_frame(FrameIndex(1), &[1; 16]).is_err());
    assert_eq!(sink.poll_exit(), None);
    sink.end().unwrap();

    assert!(sink.is_ended());
    assert_eq!(sink.frames().len(), 1);
    assert_eq!(sink.frames()[0].0, FrameIndex(0));
}
