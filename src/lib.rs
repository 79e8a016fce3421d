mod clusterer;
mod error;
mod extractor;
mod palette;
mod quality;
mod sample;

pub use self::clusterer::{CancelToken, PixelClusterer, DEFAULT_MAX_ITERATIONS};
pub use self::error::{Error, Result};
pub use self::extractor::{ExtractOptions, PaletteExtractor, PaletteTask};
pub use self::palette::ColorPalette;
pub use self::quality::ResizeQuality;
pub use self::sample::ColorSample;
