use crate::clusterer::{CancelToken, PixelClusterer, DEFAULT_MAX_ITERATIONS};
use crate::error::{Error, Result};
use crate::palette::ColorPalette;
use crate::quality::ResizeQuality;
use crate::sample::ColorSample;
use image::{imageops, DynamicImage, ImageReader, RgbaImage};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Clustering parameters used by [`PaletteExtractor`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractOptions {
    pub cluster_count: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            cluster_count: 3,
            tolerance: 0.01,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// A palette computation running on a background thread.
pub struct PaletteTask<T = Result<ColorPalette>> {
    handle: JoinHandle<T>,
    cancel: CancelToken,
}

impl<T> PaletteTask<T> {
    /// Asks the worker to stop at its next iteration boundary.
    pub fn cancel(&self) {
        self.cancel.cancel()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the worker returns.
    pub fn wait(self) -> Result<T> {
        self.handle.join().map_err(|_| Error::WorkerPanicked)
    }
}

impl PaletteTask {
    pub fn join(self) -> Result<ColorPalette> {
        self.wait()?
    }
}

#[derive(Clone)]
pub struct PaletteExtractor {
    img: Arc<RgbaImage>,
    options: ExtractOptions,
}

impl PaletteExtractor {
    pub fn open<P: AsRef<Path>>(img_path: P) -> Result<Self> {
        let img = ImageReader::open(img_path)?.with_guessed_format()?.decode()?;
        Ok(Self::from_image(img))
    }

    pub fn from_image(img: DynamicImage) -> Self {
        Self {
            img: Arc::new(img.to_rgba8()),
            options: ExtractOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.img.dimensions()
    }

    /// Resizes the source image to exactly `desired` using the filter of
    /// `quality`.
    pub fn resize(&self, desired: (u32, u32), quality: ResizeQuality) -> RgbaImage {
        let (w, h) = (desired.0.max(1), desired.1.max(1));
        if (w, h) == self.img.dimensions() {
            return (*self.img).clone();
        }
        imageops::resize(&*self.img, w, h, quality.filter())
    }

    /// One sample per pixel of the image downsampled for `quality`.
    ///
    /// An image with a zero side has no pixels to sample and fails with
    /// [`Error::EmptyDataPoints`].
    pub fn samples(&self, quality: ResizeQuality) -> Result<Vec<ColorSample>> {
        let (width, height) = self.img.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyDataPoints);
        }
        let (w, h) = quality.fit(width, height);
        let start_time = Instant::now();
        let resized = self.resize((w, h), quality);
        debug!(
            "resized {width}x{height} to {w}x{h} ({quality:?}), {}ms",
            start_time.elapsed().as_millis()
        );
        Ok(resized.pixels().copied().map(ColorSample::from).collect())
    }

    /// Computes the palette on the calling thread.
    pub fn retrieve_palette(&self, quality: ResizeQuality) -> Result<ColorPalette> {
        self.retrieve_palette_cancellable(quality, &CancelToken::new())
    }

    fn retrieve_palette_cancellable(
        &self,
        quality: ResizeQuality,
        cancel: &CancelToken,
    ) -> Result<ColorPalette> {
        let samples = self.samples(quality)?;
        let sample_count = samples.len();
        let k = self.options.cluster_count.min(sample_count);
        let start_time = Instant::now();
        let clusters = PixelClusterer::new(k, self.options.tolerance, samples)?
            .with_max_iterations(self.options.max_iterations)
            .calculate_prominent_clusters_with(cancel)?;
        let palette = ColorPalette::from_clusters(&clusters);
        info!(
            "palette from {sample_count} samples, {k} clusters, {}ms: {palette}",
            start_time.elapsed().as_millis()
        );
        Ok(palette)
    }

    /// Computes the palette on a background thread.
    pub fn spawn(&self, quality: ResizeQuality) -> PaletteTask {
        let extractor = self.clone();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle =
            thread::spawn(move || extractor.retrieve_palette_cancellable(quality, &token));
        PaletteTask { handle, cancel }
    }

    /// Computes the palette on a background thread and hands the result to
    /// `completion` on that thread.
    pub fn retrieve_palette_with<F>(
        &self,
        quality: ResizeQuality,
        completion: F,
    ) -> PaletteTask<()>
    where
        F: FnOnce(Result<ColorPalette>) + Send + 'static,
    {
        let extractor = self.clone();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            completion(extractor.retrieve_palette_cancellable(quality, &token))
        });
        PaletteTask { handle, cancel }
    }
}
