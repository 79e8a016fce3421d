use crate::error::{Error, Result};
use image::Rgba;
use std::iter;

/// A single color point in normalized RGBA space, or the running sum of a
/// group of them.
///
/// `count` is the number of source pixels folded into the sample. Raw
/// samples start at 1, accumulators at 0.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
    pub count: usize,
}

impl ColorSample {
    #[inline]
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r,
            g,
            b,
            a,
            count: 1,
        }
    }

    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn channels(&self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn channels_mut(&mut self) -> [&mut f64; 4] {
        [&mut self.r, &mut self.g, &mut self.b, &mut self.a]
    }

    /// Euclidean distance over all four channels.
    pub fn distance_to(&self, other: &ColorSample) -> f64 {
        iter::zip(self.channels(), other.channels())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Adds `other` channel-wise to this sample and takes over its members.
    pub fn append(&mut self, other: &ColorSample) {
        self.count += other.count;
        iter::zip(self.channels_mut(), other.channels()).for_each(|(a, b)| *a += b)
    }

    /// Turns the accumulated sums into a mean over `count` appended samples.
    ///
    /// Fails with [`Error::DegenerateCentroid`] when `count` is zero, leaving
    /// the sample as it was.
    pub fn average_out_with_count(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(Error::DegenerateCentroid);
        }
        let count = count as f64;
        self.channels_mut().into_iter().for_each(|c| *c /= count);
        Ok(())
    }
}

impl From<Rgba<u8>> for ColorSample {
    fn from(rgba: Rgba<u8>) -> Self {
        let [r, g, b, a] = rgba.0.map(|c| c as f64 / 255.0);
        Self::new(r, g, b, a)
    }
}

impl From<&ColorSample> for Rgba<u8> {
    fn from(sample: &ColorSample) -> Self {
        Rgba(sample.channels().map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8))
    }
}
