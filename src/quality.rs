use crate::error::Error;
use clap::ValueEnum;
use image::imageops::FilterType;

/// Downsample scale applied before sampling pixels.
///
/// Smaller targets mean fewer samples and faster clustering.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
#[repr(u8)]
pub enum ResizeQuality {
    Low = 1,
    Medium = 2,
    High = 3,
    #[default]
    Standard = 4,
}

impl ResizeQuality {
    pub const ALL: [ResizeQuality; 4] = [
        ResizeQuality::Low,
        ResizeQuality::Medium,
        ResizeQuality::High,
        ResizeQuality::Standard,
    ];

    /// Longest side of the working image, in pixels.
    #[inline]
    pub fn target_dimension(&self) -> u32 {
        match self {
            ResizeQuality::Low => 50,
            ResizeQuality::Medium => 100,
            ResizeQuality::High => 250,
            ResizeQuality::Standard => 150,
        }
    }

    #[inline]
    pub fn filter(&self) -> FilterType {
        match self {
            ResizeQuality::Low => FilterType::Nearest,
            ResizeQuality::Medium => FilterType::Triangle,
            ResizeQuality::High => FilterType::Lanczos3,
            ResizeQuality::Standard => FilterType::CatmullRom,
        }
    }

    /// Fits `(width, height)` into the target dimension keeping the aspect
    /// ratio. Never upscales; a non-zero side never shrinks to zero and a
    /// zero side stays zero.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        let target = self.target_dimension();
        let max_side = width.max(height);
        if max_side <= target {
            return (width, height);
        }
        let ratio = target as f32 / max_side as f32;
        let scale = |side: u32| match side {
            0 => 0,
            side => ((side as f32) * ratio).round().max(1.0) as u32,
        };
        (scale(width), scale(height))
    }
}

impl TryFrom<u8> for ResizeQuality {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ResizeQuality::ALL
            .into_iter()
            .find(|q| *q as u8 == code)
            .ok_or(Error::InvalidQuality(code))
    }
}
