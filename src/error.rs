use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Cluster count is zero or larger than the number of samples
    #[error("invalid cluster count {k} for {points} data points")]
    InvalidClusterCount { k: usize, points: usize },
    #[error("no data points to cluster")]
    EmptyDataPoints,
    /// Tolerance is negative, NaN or infinite
    #[error("invalid tolerance {0}")]
    InvalidTolerance(f64),
    #[error("invalid resize quality code {0}")]
    InvalidQuality(u8),
    /// Averaging an accumulator that has no members
    #[error("centroid has no members")]
    DegenerateCentroid,
    #[error("clustering was cancelled")]
    Cancelled,
    #[error("palette worker panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
