//! # Cluster Initialization
//!
//! ## Role
//! Seeds the taxon assignment `zT` and the character assignment `zC` at the
//! start of every restart. The driver only sees the [`ClusterInitializer`]
//! trait.
//!
//! ## K-means
//! [`KMeansInitializer`] clusters the rows and, independently, the columns of
//! the reduced matrix. Entries are coordinates 0.0/1.0; MISSING coordinates
//! are skipped by the distance, and by the centroid update. Seeding is
//! k-means++ and refinement is Lloyd's algorithm:
//!
//! 1. Pick the first centroid uniformly, then each next one with probability
//!    proportional to its squared distance from the nearest chosen centroid.
//! 2. Assign every point to its nearest centroid, ties to the lowest index.
//! 3. Move each centroid to the mean of its points; an empty cluster keeps
//!    its centroid.
//! 4. Repeat 2-3 until no assignment changes or the iteration cap is hit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::matrix::{Entry, TernaryMatrix};
use crate::error::{KdpfcError, Result};

/// Added to the restart seed for the character clustering
const CHARACTER_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// Initial cluster assignments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterAssignment {
    /// Per reduced taxon, a value in `[0, s)`
    pub taxa: Vec<usize>,
    /// Per reduced character, a value in `[0, t)`
    pub characters: Vec<usize>,
}

/// Produces `(zT, zC)` for a restart
pub trait ClusterInitializer {
    /// Assign every taxon to one of `n_taxon_clusters` clusters and every
    /// character to one of `n_character_clusters`. Equal seeds give equal
    /// assignments.
    fn initialize(
        &self,
        matrix: &TernaryMatrix,
        n_taxon_clusters: usize,
        n_character_clusters: usize,
        seed: u64,
    ) -> Result<ClusterAssignment>;
}

/// Missing-aware k-means with k-means++ seeding
#[derive(Clone, Debug)]
pub struct KMeansInitializer {
    max_iterations: usize,
}

impl Default for KMeansInitializer {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

impl KMeansInitializer {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Cluster `points` (NaN = missing coordinate) into `k` groups
    fn cluster(&self, points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<usize> {
        let n_points = points.len();
        if n_points <= k {
            return (0..n_points).collect();
        }

        let mut centroids = seed_centroids(points, k, rng);
        let mut assignment = vec![usize::MAX; n_points];

        for _ in 0..self.max_iterations.max(1) {
            let mut changed = false;
            for (i, point) in points.iter().enumerate() {
                let nearest = nearest_centroid(point, &centroids);
                if assignment[i] != nearest {
                    assignment[i] = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            update_centroids(points, &assignment, &mut centroids);
        }

        assignment
    }
}

impl ClusterInitializer for KMeansInitializer {
    fn initialize(
        &self,
        matrix: &TernaryMatrix,
        n_taxon_clusters: usize,
        n_character_clusters: usize,
        seed: u64,
    ) -> Result<ClusterAssignment> {
        if n_taxon_clusters == 0 || n_character_clusters == 0 {
            return Err(KdpfcError::config(format!(
                "cluster counts must be at least 1, got {} taxon and {} character clusters",
                n_taxon_clusters, n_character_clusters
            )));
        }

        let rows: Vec<Vec<f64>> = (0..matrix.n_taxa())
            .map(|p| matrix.row(p).iter().map(|&e| coordinate(e)).collect())
            .collect();
        let columns: Vec<Vec<f64>> = (0..matrix.n_characters())
            .map(|c| matrix.column(c).map(coordinate).collect())
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let taxa = self.cluster(&rows, n_taxon_clusters, &mut rng);
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(CHARACTER_SEED_OFFSET));
        let characters = self.cluster(&columns, n_character_clusters, &mut rng);

        Ok(ClusterAssignment { taxa, characters })
    }
}

#[inline]
fn coordinate(entry: Entry) -> f64 {
    match entry {
        Entry::Zero => 0.0,
        Entry::One => 1.0,
        Entry::Missing => f64::NAN,
    }
}

/// Squared distance over coordinates known in both vectors
fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (j, centroid) in centroids.iter().enumerate() {
        let dist = distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = j;
        }
    }
    best
}

/// k-means++ seeding
fn seed_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        let chosen = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = distances.len() - 1;
            for (i, &d) in distances.iter().enumerate() {
                cumulative += d;
                if d > 0.0 && cumulative >= target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every point already coincides with a centroid
            rng.random_range(0..points.len())
        };
        centroids.push(points[chosen].clone());
    }

    centroids
}

/// Mean of each cluster per coordinate; coordinates with no known value
/// become NaN, empty clusters keep their centroid
fn update_centroids(points: &[Vec<f64>], assignment: &[usize], centroids: &mut [Vec<f64>]) {
    let dim = points.first().map_or(0, |p| p.len());
    let k = centroids.len();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![vec![0usize; dim]; k];
    let mut members = vec![0usize; k];

    for (point, &cluster) in points.iter().zip(assignment) {
        members[cluster] += 1;
        for (d, &x) in point.iter().enumerate() {
            if !x.is_nan() {
                sums[cluster][d] += x;
                counts[cluster][d] += 1;
            }
        }
    }

    for j in 0..k {
        if members[j] == 0 {
            continue;
        }
        for d in 0..dim {
            centroids[j][d] = if counts[j][d] > 0 {
                sums[j][d] / counts[j][d] as f64
            } else {
                f64::NAN
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_matrix() -> TernaryMatrix {
        TernaryMatrix::from_codes(&[
            vec![1, 1, 1, 0, 0, 0],
            vec![1, 1, 1, 0, 0, 0],
            vec![1, -1, 1, 0, 0, 0],
            vec![0, 0, 0, 1, 1, 1],
            vec![0, 0, 0, 1, 1, -1],
            vec![0, 0, 0, 1, 1, 1],
        ])
        .unwrap()
    }

    #[test]
    fn test_separates_blocks() {
        let init = KMeansInitializer::default();
        let d = block_matrix();
        for seed in 0..10 {
            let z = init.initialize(&d, 2, 2, seed).unwrap();
            assert_eq!(z.taxa[0], z.taxa[1]);
            assert_eq!(z.taxa[1], z.taxa[2]);
            assert_eq!(z.taxa[3], z.taxa[4]);
            assert_ne!(z.taxa[0], z.taxa[3]);
            assert_eq!(z.characters[0], z.characters[2]);
            assert_ne!(z.characters[0], z.characters[5]);
        }
    }

    #[test]
    fn test_values_in_range() {
        let init = KMeansInitializer::default();
        let d = block_matrix();
        for (s, t) in [(1, 1), (3, 2), (5, 4)] {
            let z = init.initialize(&d, s, t, 3).unwrap();
            assert_eq!(z.taxa.len(), 6);
            assert_eq!(z.characters.len(), 6);
            assert!(z.taxa.iter().all(|&h| h < s));
            assert!(z.characters.iter().all(|&f| f < t));
        }
    }

    #[test]
    fn test_fewer_points_than_clusters() {
        let init = KMeansInitializer::default();
        let d = TernaryMatrix::from_codes(&[vec![1, 0], vec![0, 1]]).unwrap();
        let z = init.initialize(&d, 5, 3, 0).unwrap();
        assert_eq!(z.taxa, vec![0, 1]);
        assert_eq!(z.characters, vec![0, 1]);
    }

    #[test]
    fn test_deterministic_per_seed() {
        let init = KMeansInitializer::default();
        let d = block_matrix();
        let a = init.initialize(&d, 3, 3, 42).unwrap();
        let b = init.initialize(&d, 3, 3, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_points() {
        let init = KMeansInitializer::default();
        let d = TernaryMatrix::from_codes(&[vec![1, 1], vec![1, 1], vec![1, 1]]).unwrap();
        let z = init.initialize(&d, 2, 1, 9).unwrap();
        assert!(z.taxa.iter().all(|&h| h < 2));
        assert_eq!(z.characters, vec![0, 0]);
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let init = KMeansInitializer::default();
        assert!(init.initialize(&block_matrix(), 0, 2, 0).is_err());
    }

    #[test]
    fn test_missing_coordinates_skipped() {
        assert_eq!(distance(&[1.0, f64::NAN, 0.0], &[0.0, 1.0, 0.0]), 1.0);
    }
}
