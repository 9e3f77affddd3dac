use crate::foundation::error::{TimelapseError, TimelapseResult};

/// 0-based index of an output frame (one frame per event batch).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Pixel dimensions of a canvas or encoder output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CanvasSize {
    /// Create a size with no validation.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Create a size, rejecting zero-area dimensions.
    pub fn non_empty(width: u32, height: u32) -> TimelapseResult<Self> {
        if width == 0 || height == 0 {
            return Err(TimelapseError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Total pixel count.
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Return `true` when both axes fit inside `ceiling`.
    pub fn fits_within(self, ceiling: CanvasSize) -> bool {
        self.width <= ceiling.width && self.height <= ceiling.height
    }

    /// Return `true` when both axes are even (required for yuv420p output).
    pub fn is_even(self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
