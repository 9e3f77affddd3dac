use std::ffi::OsStr;
use std::io::Read as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{OnceLock, mpsc};
use std::time::{Duration, Instant};

/// Default wall-clock limit for one probe command.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// GPU vendors the selector knows how to detect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    /// NVIDIA (treated as discrete).
    Nvidia,
    /// AMD / ATI (discrete or integrated).
    Amd,
    /// Intel (treated as integrated).
    Intel,
}

impl GpuVendor {
    fn matches_vendor(self, tokens: &[&str]) -> bool {
        match self {
            Self::Nvidia => tokens.contains(&"nvidia"),
            Self::Amd => tokens.iter().any(|t| *t == "amd" || *t == "ati"),
            Self::Intel => tokens.contains(&"intel"),
        }
    }

    fn matches_class(self, line: &str) -> bool {
        match self {
            Self::Nvidia | Self::Amd => {
                line.contains("vga") || line.contains("3d") || line.contains("display")
            }
            Self::Intel => line.contains("vga") || line.contains("display"),
        }
    }
}

/// Host capability queries used by encoder selection.
///
/// Implementations must never fail: anything that cannot be determined is reported as absent.
pub trait CapabilityProbe {
    /// Lower-cased description of every display adapter from `vendor`, or `None` when there is
    /// none (or the host cannot be inspected).
    fn display_adapters(&self, vendor: GpuVendor) -> Option<String>;
    /// Return `true` when the encoder binary lists `codec` among its encoders.
    fn has_encoder(&self, codec: &str) -> bool;
}

/// Filter an `lspci` listing down to the display adapters of `vendor`.
pub fn matching_adapters(listing: &str, vendor: GpuVendor) -> Option<String> {
    let lines: Vec<String> = listing
        .lines()
        .map(str::to_lowercase)
        .filter(|line| {
            let tokens: Vec<&str> = line
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|t| !t.is_empty())
                .collect();
            vendor.matches_vendor(&tokens) && vendor.matches_class(line)
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Return `true` when `codec` appears as an encoder name in `ffmpeg -encoders` output.
pub fn lists_encoder(encoders: &str, codec: &str) -> bool {
    encoders
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(codec))
}

/// Probe backed by `lspci` and `ffmpeg -hide_banner -encoders`.
///
/// Each command runs at most once per probe and is killed when it exceeds the timeout; a
/// failed, timed-out or unsuccessful command counts as "nothing found".
#[derive(Debug)]
pub struct SystemProbe {
    ffmpeg: PathBuf,
    timeout: Duration,
    lspci: OnceLock<Option<String>>,
    encoders: OnceLock<Option<String>>,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl SystemProbe {
    /// Probe querying encoders from the given ffmpeg binary.
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            lspci: OnceLock::new(),
            encoders: OnceLock::new(),
        }
    }

    /// Override the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn lspci_listing(&self) -> Option<&str> {
        self.lspci
            .get_or_init(|| run_bounded("lspci", std::iter::empty::<&str>(), self.timeout))
            .as_deref()
    }

    fn encoder_listing(&self) -> Option<&str> {
        self.encoders
            .get_or_init(|| run_bounded(&self.ffmpeg, ["-hide_banner", "-encoders"], self.timeout))
            .as_deref()
    }
}

impl CapabilityProbe for SystemProbe {
    fn display_adapters(&self, vendor: GpuVendor) -> Option<String> {
        matching_adapters(self.lspci_listing()?, vendor)
    }

    fn has_encoder(&self, codec: &str) -> bool {
        self.encoder_listing()
            .is_some_and(|listing| lists_encoder(listing, codec))
    }
}

/// Run `program` and return its stdout when it exits successfully within `timeout`.
pub fn run_bounded<I, S>(program: impl AsRef<OsStr>, args: I, timeout: Duration) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!(program = %program.to_string_lossy(), "probe command unavailable: {e}");
            return None;
        }
    };

    let mut stdout = child.stdout.take()?;
    // Forked descendants can keep the pipe open after the child is gone, so the reader is never
    // joined; its result is only awaited until the deadline.
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut out = Vec::new();
        let _ = tx.send(stdout.read_to_end(&mut out).map(|_| out));
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!(program = %program.to_string_lossy(), ?timeout, "probe command timed out");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                tracing::debug!("waiting for probe command failed: {e}");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
    };
    if !status.success() {
        return None;
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(Ok(out)) => Some(String::from_utf8_lossy(&out).into_owned()),
        Ok(Err(e)) => {
            tracing::debug!("reading probe output failed: {e}");
            None
        }
        Err(_) => {
            tracing::warn!(program = %program.to_string_lossy(), ?timeout, "probe output still open at deadline");
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/probe.rs"]
mod tests;
