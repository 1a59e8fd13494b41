//! Decision tree implementation
//!
//! Binary classification tree with weighted impurity. Used as the base
//! learner of [`RandomForest`](super::random_forest::RandomForest).

use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the weighted positive-class fraction
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Entropy
    Entropy,
}

impl Criterion {
    /// Impurity of a node whose positive fraction is `p`
    fn impurity(&self, p: f64) -> f64 {
        match self {
            Criterion::Gini => 2.0 * p * (1.0 - p),
            Criterion::Entropy => {
                let term = |q: f64| if q > 0.0 { -q * q.ln() } else { 0.0 };
                term(p) + term(1.0 - p)
            }
        }
    }
}

/// Weighted class totals of a node
#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    weight: f64,
    positive: f64,
    count: usize,
}

impl NodeStats {
    fn fraction(&self) -> f64 {
        if self.weight > 0.0 {
            self.positive / self.weight
        } else {
            0.0
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at random for every split (all when unset)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for the per-split feature draw
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree on labels `0.0`/`1.0`. Samples with zero weight are
    /// left out entirely.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(FusionError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let weights = match sample_weight {
            Some(w) if w.len() == n_samples => w.clone(),
            Some(w) => {
                return Err(FusionError::Shape {
                    expected: format!("{} sample weights", n_samples),
                    actual: format!("{} sample weights", w.len()),
                })
            }
            None => Array1::ones(n_samples),
        };

        let indices: Vec<usize> = (0..n_samples).filter(|&i| weights[i] > 0.0).collect();
        if indices.is_empty() {
            return Err(FusionError::InsufficientSamples(
                "decision tree needs at least one weighted sample".to_string(),
            ));
        }

        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];
        let data = TrainingData { x, y, weights: &weights };
        self.root = Some(self.build_tree(&data, &indices, 0, &mut importances, &mut rng));

        // Normalize feature importances
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        data: &TrainingData<'_>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let stats = data.stats(indices);
        let leaf = || TreeNode::Leaf {
            value: stats.fraction(),
            n_samples: stats.count,
        };

        // Check stopping conditions
        let is_pure = stats.positive <= 0.0 || stats.positive >= stats.weight;
        let should_stop = stats.count < self.min_samples_split
            || stats.count < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;
        if should_stop {
            return leaf();
        }

        let parent_impurity = self.criterion.impurity(stats.fraction());
        let Some(split) = self.find_best_split(data, indices, parent_impurity, rng) else {
            return leaf();
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| data.x[[i, split.feature]] <= split.threshold);

        importances[split.feature] += stats.weight * split.gain;

        let left = Box::new(self.build_tree(data, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(data, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: split.feature,
            threshold: split.threshold,
            left,
            right,
            n_samples: stats.count,
            impurity: parent_impurity,
        }
    }

    fn find_best_split(
        &self,
        data: &TrainingData<'_>,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = data.x.ncols();
        let candidates: Vec<usize> = match self.max_features {
            Some(k) if k < n_features => {
                let mut drawn = index::sample(rng, n_features, k).into_vec();
                drawn.sort_unstable();
                drawn
            }
            _ => (0..n_features).collect(),
        };

        let total = data.stats(indices);
        let mut best: Option<SplitCandidate> = None;

        for feature in candidates {
            let mut order: Vec<usize> = indices.to_vec();
            order.sort_by(|&a, &b| data.x[[a, feature]].total_cmp(&data.x[[b, feature]]));

            let mut left = NodeStats::default();
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                left.weight += data.weights[i];
                left.positive += data.weights[i] * data.y[i];
                left.count += 1;

                let current = data.x[[i, feature]];
                let next = data.x[[order[pos + 1], feature]];
                if current >= next {
                    continue;
                }
                let right_count = total.count - left.count;
                if left.count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }

                let right = NodeStats {
                    weight: total.weight - left.weight,
                    positive: total.positive - left.positive,
                    count: right_count,
                };
                let weighted_child = (left.weight * self.criterion.impurity(left.fraction())
                    + right.weight * self.criterion.impurity(right.fraction()))
                    / total.weight;
                let gain = parent_impurity - weighted_child;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    let mut threshold = (current + next) / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(SplitCandidate { feature, threshold, gain });
                }
            }
        }

        best
    }

    /// Positive-class fraction of the leaf each row falls into
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(FusionError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(FusionError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { value, .. } => break *value,
                        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                            node = if row[*feature_idx] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect())
    }

    /// Predict labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Normalised impurity-decrease importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    /// Depth of the fitted tree
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }
}

struct TrainingData<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    weights: &'a Array1<f64>,
}

impl TrainingData<'_> {
    fn stats(&self, indices: &[usize]) -> NodeStats {
        indices.iter().fold(NodeStats::default(), |mut acc, &i| {
            acc.weight += self.weights[i];
            acc.positive += self.weights[i] * self.y[i];
            acc.count += 1;
            acc
        })
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}
