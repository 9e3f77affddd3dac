use crate::encode::probe::{CapabilityProbe, GpuVendor};
use crate::foundation::core::CanvasSize;

/// Largest canvas an integrated GPU encoder is asked to handle directly.
pub const INTEGRATED_MAX: CanvasSize = CanvasSize::new(3840, 2160);
/// Pixel-count limit for integrated GPU encoders.
pub const INTEGRATED_MAX_PIXELS: u64 = 8_000_000;

/// Host GPU class as detected from the adapter listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuClass {
    /// NVIDIA discrete GPU.
    Nvidia,
    /// AMD Radeon discrete GPU.
    AmdDiscrete,
    /// AMD integrated graphics.
    AmdIntegrated,
    /// Intel integrated graphics.
    IntelIntegrated,
    /// No recognised adapter.
    Unknown,
}

impl GpuClass {
    /// Return `true` for integrated adapters.
    pub fn is_integrated(self) -> bool {
        matches!(self, Self::AmdIntegrated | Self::IntelIntegrated)
    }

    /// Maximum H.264 encode resolution for this class.
    pub fn max_resolution(self) -> CanvasSize {
        match self {
            Self::Nvidia => CanvasSize::new(8192, 8192),
            Self::AmdDiscrete => CanvasSize::new(4096, 4096),
            Self::AmdIntegrated | Self::IntelIntegrated => INTEGRATED_MAX,
            Self::Unknown => CanvasSize::new(1920, 1080),
        }
    }

    /// Stable lower-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nvidia => "nvidia",
            Self::AmdDiscrete => "amd_discrete",
            Self::AmdIntegrated => "amd_integrated",
            Self::IntelIntegrated => "intel_integrated",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GpuClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the GPU class. Integrated adapters take priority over discrete ones.
pub fn detect_gpu(probe: &dyn CapabilityProbe) -> GpuClass {
    let mut integrated = None;
    let mut discrete = None;

    if probe.display_adapters(GpuVendor::Nvidia).is_some() {
        discrete = Some(GpuClass::Nvidia);
    }
    if let Some(adapters) = probe.display_adapters(GpuVendor::Amd) {
        if adapters.to_lowercase().contains("radeon") {
            discrete = Some(GpuClass::AmdDiscrete);
        } else {
            integrated = Some(GpuClass::AmdIntegrated);
        }
    }
    if probe.display_adapters(GpuVendor::Intel).is_some() {
        integrated = Some(GpuClass::IntelIntegrated);
    }

    integrated.or(discrete).unwrap_or(GpuClass::Unknown)
}

/// Encoder families the pipeline can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncoderFamily {
    /// NVIDIA NVENC.
    Nvenc,
    /// AMD AMF.
    Amf,
    /// Intel Quick Sync.
    Qsv,
    /// VA-API (Linux).
    Vaapi,
    /// CPU encoding with libx264.
    Software,
}

impl EncoderFamily {
    /// ffmpeg codec identifier.
    pub fn codec(self) -> &'static str {
        match self {
            Self::Nvenc => "h264_nvenc",
            Self::Amf => "h264_amf",
            Self::Qsv => "h264_qsv",
            Self::Vaapi => "h264_vaapi",
            Self::Software => "libx264",
        }
    }

    /// Short family name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nvenc => "nvenc",
            Self::Amf => "amf",
            Self::Qsv => "qsv",
            Self::Vaapi => "vaapi",
            Self::Software => "libx264",
        }
    }

    /// Return `true` for GPU-backed families.
    pub fn is_hardware(self) -> bool {
        !matches!(self, Self::Software)
    }
}

/// Encoder chosen for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderDescriptor {
    /// Encoder family, which determines the codec and its settings.
    pub family: EncoderFamily,
    /// GPU class detected on the host.
    pub gpu: GpuClass,
}

impl EncoderDescriptor {
    /// ffmpeg codec identifier.
    pub fn codec(&self) -> &'static str {
        self.family.codec()
    }

    /// Short encoder name.
    pub fn name(&self) -> &'static str {
        self.family.name()
    }

    /// Size ffmpeg should scale to before encoding, or `None` when `requested` can be encoded
    /// as is.
    pub fn output_size(&self, requested: CanvasSize) -> Option<CanvasSize> {
        if !self.family.is_hardware() {
            return None;
        }
        let ceiling = self.gpu.max_resolution();
        if requested.fits_within(ceiling) {
            return None;
        }
        let scaled = scaled_dimensions(requested, ceiling);
        (scaled != requested).then_some(scaled)
    }
}

/// Candidate hardware encoders for `gpu`, in preference order.
pub fn candidate_encoders(gpu: GpuClass) -> &'static [EncoderFamily] {
    use EncoderFamily::*;
    match gpu {
        GpuClass::Nvidia => &[Nvenc],
        GpuClass::IntelIntegrated => &[Qsv, Vaapi],
        _ => &[Nvenc, Amf, Qsv, Vaapi],
    }
}

/// Return `true` when `size` is too large for an integrated encoder.
pub fn exceeds_integrated_limits(size: CanvasSize) -> bool {
    !size.fits_within(INTEGRATED_MAX) || size.pixel_count() > INTEGRATED_MAX_PIXELS
}

/// Choose an encoder for a canvas of `size`. Falls back to libx264; never fails.
#[tracing::instrument(skip(probe))]
pub fn select_encoder(probe: &dyn CapabilityProbe, size: CanvasSize) -> EncoderDescriptor {
    let gpu = detect_gpu(probe);
    let software = EncoderDescriptor {
        family: EncoderFamily::Software,
        gpu,
    };

    if gpu.is_integrated() && exceeds_integrated_limits(size) {
        tracing::info!(%gpu, %size, "canvas exceeds integrated GPU limits, using CPU encoder");
        return software;
    }

    for &family in candidate_encoders(gpu) {
        if probe.has_encoder(family.codec()) {
            tracing::info!(%gpu, codec = family.codec(), "using GPU encoder {}", family.name());
            return EncoderDescriptor { family, gpu };
        }
    }

    tracing::info!(%gpu, "no compatible GPU encoder found, using CPU encoder");
    software
}

/// Scale `size` down uniformly to fit `ceiling`.
///
/// Sizes already inside the ceiling are returned unchanged. Otherwise each axis is floored,
/// rounded down to an even value, and clamped to at least 2.
pub fn scaled_dimensions(size: CanvasSize, ceiling: CanvasSize) -> CanvasSize {
    if size.width == 0 || size.height == 0 {
        return size;
    }
    let (w, h) = (u64::from(size.width), u64::from(size.height));
    let (max_w, max_h) = (u64::from(ceiling.width), u64::from(ceiling.height));

    // scale = min(max_w / w, max_h / h), kept as an exact fraction.
    let (num, den) = if max_w * h <= max_h * w {
        (max_w, w)
    } else {
        (max_h, h)
    };
    if num >= den {
        return size;
    }

    let axis = |v: u64, max: u64| -> u32 {
        let scaled = (v * num / den).min(max);
        (scaled - scaled % 2).max(2) as u32
    };
    CanvasSize::new(axis(w, max_w), axis(h, max_h))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/select.rs"]
mod tests;
