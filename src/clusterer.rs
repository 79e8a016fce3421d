use crate::error::{Error, Result};
use crate::sample::ColorSample;
use log::{debug, trace};
use std::cmp::Reverse;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Cooperative cancellation flag shared between a caller and a running
/// clusterer.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Iterative k-means style clustering of color samples.
///
/// Seeding is deterministic: the first centroid is the first data point and
/// every next one is the point farthest from all centroids chosen so far.
/// The loop stops once no centroid moves more than `tolerance`, or after
/// `max_iterations` passes.
#[derive(Debug, Clone)]
pub struct PixelClusterer {
    k: usize,
    tolerance: f64,
    max_iterations: usize,
    data_points: Vec<ColorSample>,
}

impl PixelClusterer {
    pub fn new(k: usize, tolerance: f64, data_points: Vec<ColorSample>) -> Result<Self> {
        if data_points.is_empty() {
            return Err(Error::EmptyDataPoints);
        }
        if k == 0 || k > data_points.len() {
            return Err(Error::InvalidClusterCount {
                k,
                points: data_points.len(),
            });
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(Error::InvalidTolerance(tolerance));
        }
        Ok(Self {
            k,
            tolerance,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            data_points,
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[inline]
    pub fn data_points(&self) -> &[ColorSample] {
        &self.data_points
    }

    /// Runs the clustering and returns `k` centroids, most prominent first.
    pub fn calculate_prominent_clusters(&self) -> Vec<ColorSample> {
        match self.run(|_| Ok::<(), Infallible>(())) {
            Ok(clusters) => clusters,
            Err(never) => match never {},
        }
    }

    /// Same as [`Self::calculate_prominent_clusters`], checking `cancel`
    /// before every iteration.
    pub fn calculate_prominent_clusters_with(
        &self,
        cancel: &CancelToken,
    ) -> Result<Vec<ColorSample>> {
        self.run_cancellable(cancel, |_| {})
    }

    fn run_cancellable<F>(
        &self,
        cancel: &CancelToken,
        mut on_iteration: F,
    ) -> Result<Vec<ColorSample>>
    where
        F: FnMut(usize),
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.run(|iteration| {
            if cancel.is_cancelled() {
                debug!("clustering cancelled before iteration {iteration}");
                return Err(Error::Cancelled);
            }
            on_iteration(iteration);
            Ok(())
        })
    }

    /// Core loop. `before_iteration` runs ahead of every pass and aborts the
    /// run with its error.
    fn run<E, F>(&self, mut before_iteration: F) -> std::result::Result<Vec<ColorSample>, E>
    where
        F: FnMut(usize) -> std::result::Result<(), E>,
    {
        if self.k == self.data_points.len() {
            return Ok(self
                .data_points
                .iter()
                .map(|p| ColorSample { count: 1, ..*p })
                .collect());
        }

        let start_time = Instant::now();
        let mut centroids = self.seed();
        debug!(
            "seeded {} centroids from {} data points",
            self.k,
            self.data_points.len()
        );

        let mut iteration = 0;
        loop {
            iteration += 1;
            before_iteration(iteration)?;

            let next = self.recompute(&centroids);
            let movement = std::iter::zip(&centroids, &next)
                .map(|(old, new)| old.distance_to(new))
                .fold(0.0, f64::max);
            centroids = next;
            trace!("iteration {iteration}: max centroid movement {movement}");

            if movement <= self.tolerance {
                debug!(
                    "converged after {iteration} iterations, {}ms",
                    start_time.elapsed().as_millis()
                );
                break;
            }
            if iteration >= self.max_iterations {
                debug!(
                    "stopped at iteration ceiling {}, last movement {movement}, {}ms",
                    self.max_iterations,
                    start_time.elapsed().as_millis()
                );
                break;
            }
        }

        centroids.sort_by_key(|c| Reverse(c.count));
        Ok(centroids)
    }

    fn seed(&self) -> Vec<ColorSample> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(self.data_points[0]);
        // distance from each point to its nearest chosen centroid
        let mut nearest: Vec<f64> = self
            .data_points
            .iter()
            .map(|p| p.distance_to(&centroids[0]))
            .collect();
        while centroids.len() < self.k {
            let (far_i, _) = nearest.iter().enumerate().fold(
                (0, f64::NEG_INFINITY),
                |best, (i, &d)| if d > best.1 { (i, d) } else { best },
            );
            let centroid = self.data_points[far_i];
            centroids.push(centroid);
            for (d, p) in std::iter::zip(&mut nearest, &self.data_points) {
                *d = d.min(p.distance_to(&centroid));
            }
        }
        centroids
    }

    fn nearest(centroids: &[ColorSample], point: &ColorSample) -> usize {
        let mut best_i = 0;
        let mut best_d = f64::INFINITY;
        for (i, c) in centroids.iter().enumerate() {
            let d = point.distance_to(c);
            if d < best_d {
                best_i = i;
                best_d = d;
            }
        }
        best_i
    }

    fn recompute(&self, centroids: &[ColorSample]) -> Vec<ColorSample> {
        let mut accumulators = vec![ColorSample::empty(); centroids.len()];
        for point in &self.data_points {
            let i = Self::nearest(centroids, point);
            accumulators[i].append(&ColorSample { count: 1, ..*point });
        }
        std::iter::zip(accumulators, centroids)
            .map(|(mut acc, previous)| match acc.average_out_with_count(acc.count) {
                Ok(()) => acc,
                Err(_) => ColorSample {
                    count: 0,
                    ..*previous
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(v: f64) -> ColorSample {
        ColorSample::new(v, v, v, 1.0)
    }

    fn black_and_white() -> Vec<ColorSample> {
        let mut points = vec![gray(0.01); 100];
        points.extend(vec![gray(0.99); 20]);
        points
    }

    fn mixed() -> Vec<ColorSample> {
        (0..200)
            .map(|i| {
                let t = i as f64 / 199.0;
                ColorSample::new(t, (t * 7.0).fract(), 1.0 - t, (t * 3.0).fract())
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(matches!(
            PixelClusterer::new(1, 0.1, vec![]),
            Err(Error::EmptyDataPoints)
        ));
        assert!(matches!(
            PixelClusterer::new(0, 0.1, vec![gray(0.5)]),
            Err(Error::InvalidClusterCount { k: 0, points: 1 })
        ));
        assert!(matches!(
            PixelClusterer::new(3, 0.1, vec![gray(0.5), gray(0.2)]),
            Err(Error::InvalidClusterCount { k: 3, points: 2 })
        ));
        assert!(matches!(
            PixelClusterer::new(1, -0.1, vec![gray(0.5)]),
            Err(Error::InvalidTolerance(_))
        ));
        assert!(matches!(
            PixelClusterer::new(1, f64::NAN, vec![gray(0.5)]),
            Err(Error::InvalidTolerance(_))
        ));
    }

    #[test]
    fn returns_k_clusters_ranked_by_count() {
        let points = mixed();
        for k in 1..=8 {
            let clusters = PixelClusterer::new(k, 0.0001, points.clone())
                .unwrap()
                .calculate_prominent_clusters();
            assert_eq!(clusters.len(), k);
            assert!(clusters.windows(2).all(|w| w[0].count >= w[1].count));
            assert_eq!(clusters.iter().map(|c| c.count).sum::<usize>(), points.len());
        }
    }

    #[test]
    fn deterministic_runs() {
        let clusterer = PixelClusterer::new(5, 0.001, mixed()).unwrap();
        assert_eq!(
            clusterer.calculate_prominent_clusters(),
            clusterer.calculate_prominent_clusters()
        );
    }

    #[test]
    fn singletons_when_k_equals_len() {
        let points = vec![gray(0.1), gray(0.5), gray(0.5), gray(0.9)];
        for tolerance in [0.0, 0.5, 10.0] {
            let clusters = PixelClusterer::new(points.len(), tolerance, points.clone())
                .unwrap()
                .calculate_prominent_clusters();
            assert_eq!(clusters, points);
            assert!(clusters.iter().all(|c| c.count == 1));
        }
    }

    #[test]
    fn black_cluster_ranked_before_white() {
        let clusters = PixelClusterer::new(2, 0.001, black_and_white())
            .unwrap()
            .calculate_prominent_clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 100);
        assert_eq!(clusters[1].count, 20);
        assert!(clusters[0].distance_to(&gray(0.01)) < 1e-9);
        assert!(clusters[1].distance_to(&gray(0.99)) < 1e-9);
    }

    #[test]
    fn single_cluster_is_mean() {
        let points = mixed();
        let n = points.len() as f64;
        let clusters = PixelClusterer::new(1, 0.0, points.clone())
            .unwrap()
            .calculate_prominent_clusters();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, points.len());
        let mean_r = points.iter().map(|p| p.r).sum::<f64>() / n;
        let mean_a = points.iter().map(|p| p.a).sum::<f64>() / n;
        assert!((clusters[0].r - mean_r).abs() < 1e-9);
        assert!((clusters[0].a - mean_a).abs() < 1e-9);
    }

    #[test]
    fn keeps_empty_centroids() {
        // two distinct colors, three clusters
        let mut points = vec![gray(0.2); 10];
        points.extend(vec![gray(0.8); 5]);
        let clusters = PixelClusterer::new(3, 0.0, points)
            .unwrap()
            .calculate_prominent_clusters();
        assert_eq!(clusters.len(), 3);
        assert_eq!(
            clusters.iter().map(|c| c.count).collect::<Vec<_>>(),
            vec![10, 5, 0]
        );
    }

    #[test]
    fn stops_at_iteration_ceiling() {
        let clusters = PixelClusterer::new(4, 0.0, mixed())
            .unwrap()
            .with_max_iterations(1)
            .calculate_prominent_clusters();
        assert_eq!(clusters.len(), 4);
        assert_eq!(clusters.iter().map(|c| c.count).sum::<usize>(), 200);
    }

    #[test]
    fn cancelled_run_returns_error() {
        let token = CancelToken::new();
        token.cancel();
        let result = PixelClusterer::new(2, 0.001, black_and_white())
            .unwrap()
            .calculate_prominent_clusters_with(&token);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn cancelled_between_iterations() {
        let token = CancelToken::new();
        let mut iterations = Vec::new();
        let clusterer = PixelClusterer::new(3, 0.0, mixed()).unwrap();
        let result = clusterer.run_cancellable(&token, |iteration| {
            iterations.push(iteration);
            if iteration == 1 {
                token.cancel();
            }
        });
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(iterations, vec![1]);
    }

    #[test]
    fn uncancelled_run_matches_plain_run() {
        let clusterer = PixelClusterer::new(3, 0.0, mixed()).unwrap();
        let mut iterations = 0;
        let clusters = clusterer
            .run_cancellable(&CancelToken::new(), |_| iterations += 1)
            .unwrap();
        assert!(iterations >= 2);
        assert_eq!(clusters, clusterer.calculate_prominent_clusters());
    }

    #[test]
    fn accessors_report_configuration() {
        let clusterer = PixelClusterer::new(2, 0.05, black_and_white()).unwrap();
        assert_eq!(clusterer.k(), 2);
        assert_eq!(clusterer.tolerance(), 0.05);
        assert_eq!(clusterer.data_points().len(), 120);
    }

    #[test]
    fn input_is_not_mutated() {
        let points = black_and_white();
        let clusterer = PixelClusterer::new(2, 0.001, points.clone()).unwrap();
        clusterer.calculate_prominent_clusters();
        assert_eq!(clusterer.data_points(), points.as_slice());
    }
}
