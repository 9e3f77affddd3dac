/// Convenience result type used across tilelapse.
pub type TimelapseResult<T> = Result<T, TimelapseError>;

/// Top-level error taxonomy used by rendering and encoding APIs.
#[derive(thiserror::Error, Debug)]
pub enum TimelapseError {
    /// Invalid user-provided settings or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A texture asset is missing or could not be decoded.
    #[error("asset error: {0}")]
    Asset(String),

    /// The event source failed to produce data.
    #[error("source error: {0}")]
    Source(String),

    /// Encoder process lifecycle failure (spawn, wait, non-zero exit).
    #[error("encoder error: {0}")]
    Encoder(String),

    /// The encoder terminated with an error before all frames were written.
    #[error("encoder failed before frame {frame}: {message}")]
    EncoderFailed {
        /// Index of the frame that was about to be written.
        frame: u64,
        /// Exit status and captured diagnostics.
        message: String,
    },

    /// The encoder exited successfully, but before all frames were written.
    #[error("encoder exited before frame {frame}")]
    EncoderExitedEarly {
        /// Index of the frame that was about to be written.
        frame: u64,
    },

    /// Writing a frame into the encoder input failed or was cut short.
    #[error("writing frame {frame} to encoder failed after {written} of {expected} bytes: {source}")]
    FrameWrite {
        /// Index of the frame being written.
        frame: u64,
        /// Bytes accepted by the encoder before the failure.
        written: usize,
        /// Frame buffer length.
        expected: usize,
        /// Underlying pipe error.
        #[source]
        source: std::io::Error,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimelapseError {
    /// Build a [`TimelapseError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TimelapseError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`TimelapseError::Source`] value.
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`TimelapseError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Frame index carried by encoder lifecycle and write errors, if any.
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            Self::EncoderFailed { frame, .. }
            | Self::EncoderExitedEarly { frame }
            | Self::FrameWrite { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
