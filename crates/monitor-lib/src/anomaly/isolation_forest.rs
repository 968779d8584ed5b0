//! Isolation forest outlier model
//!
//! Scores rows by how quickly random axis-aligned splits isolate them.
//! Rows that isolate in few splits get low (negative) scores.
//!
//! Scoring follows the usual decision-function convention:
//! `score = -2^(-E[h(x)] / c(psi)) - offset`, where `offset` is the
//! `contamination` quantile of the raw scores, so roughly that fraction of
//! rows lands below zero and is labelled an outlier.

use rand::seq::index::sample as sample_indices;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Number of features per row (CPU, memory, disk)
pub const FEATURE_COUNT: usize = 3;

/// Default ensemble size
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default upper bound on rows drawn per tree
pub const DEFAULT_MAX_SAMPLES: usize = 256;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// One feature vector
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Per-row output of an outlier model, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierScores {
    /// `true` when the row is an outlier
    pub labels: Vec<bool>,
    /// Continuous score, lower is more anomalous, negative means outlier
    pub scores: Vec<f64>,
}

impl OutlierScores {
    /// Indices of rows labelled as outliers
    pub fn outlier_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, &outlier)| outlier.then_some(i))
    }
}

/// Unsupervised model fitted fresh on every call
pub trait OutlierModel: Send + Sync {
    /// Fit on `features` and score every row
    fn fit_score(&self, features: &[FeatureRow], contamination: f64, seed: u64) -> OutlierScores;
}

/// Ensemble of random isolation trees
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_estimators: usize,
    pub max_samples: usize,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl IsolationForest {
    /// Raw scores in `[-1, 0)`, before the contamination offset is applied
    pub fn score_samples(&self, features: &[FeatureRow], seed: u64) -> Vec<f64> {
        if features.is_empty() {
            return Vec::new();
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let sub_sample = self.max_samples.clamp(1, features.len());
        let height_limit = (sub_sample as f64).log2().ceil() as usize;

        let trees: Vec<IsolationTree> = (0..self.n_estimators.max(1))
            .map(|_| {
                let rows = sample_indices(&mut rng, features.len(), sub_sample).into_vec();
                IsolationTree::grow(features, rows, height_limit, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(sub_sample).max(1.0);
        features
            .iter()
            .map(|row| {
                let mean_depth =
                    trees.iter().map(|t| t.path_length(row)).sum::<f64>() / trees.len() as f64;
                -(2f64).powf(-mean_depth / normalizer)
            })
            .collect()
    }
}

impl OutlierModel for IsolationForest {
    fn fit_score(&self, features: &[FeatureRow], contamination: f64, seed: u64) -> OutlierScores {
        let raw = self.score_samples(features, seed);
        if raw.is_empty() {
            return OutlierScores::default();
        }

        let offset = percentile(&raw, contamination * 100.0);
        let scores: Vec<f64> = raw.iter().map(|s| s - offset).collect();
        let labels = scores.iter().map(|&s| s < 0.0).collect();

        OutlierScores { labels, scores }
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Single tree stored as an arena, root at index 0
#[derive(Debug)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(
        features: &[FeatureRow],
        rows: Vec<usize>,
        height_limit: usize,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(2 * rows.len()),
        };
        tree.build(features, rows, 0, height_limit, rng);
        tree
    }

    fn build(
        &mut self,
        features: &[FeatureRow],
        rows: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= height_limit || rows.len() <= 1 {
            return id;
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &r| (lo.min(features[r][feature]), hi.max(features[r][feature])),
                );
                (min < max && (max - min).is_finite()).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return id;
        }

        let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(min..max);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| features[r][feature] <= threshold);

        let left = self.build(features, left_rows, depth + 1, height_limit, rng);
        let right = self.build(features, right_rows, depth + 1, height_limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: &FeatureRow) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[feature] <= threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` items
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linearly interpolated percentile, `q` in `[0, 100]`
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
