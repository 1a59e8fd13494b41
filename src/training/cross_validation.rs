//! Stratified k-fold cross-validation

use crate::error::{FusionError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified K-Fold (maintains class distribution in every fold)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state: 42,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Generate train/test splits over `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(FusionError::invalid_param(
                "cv_folds",
                n_splits,
                "must be at least 2",
            ));
        }

        // Group samples by class
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        for (class, indices) in &class_indices {
            if indices.len() < n_splits {
                return Err(FusionError::InsufficientSamples(format!(
                    "class {} has {} samples, fewer than cv_folds = {}",
                    class,
                    indices.len(),
                    n_splits
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        if self.shuffle {
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal each class round-robin, continuing where the previous class
        // stopped so fold sizes differ by at most one
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut offset = 0;
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[(offset + i) % n_splits].push(idx);
            }
            offset += indices.len();
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let train_indices: Vec<usize> = {
                    let mut train: Vec<usize> = folds
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != fold_idx)
                        .flat_map(|(_, f)| f.iter().copied())
                        .collect();
                    train.sort_unstable();
                    train
                };
                CVSplit {
                    train_indices,
                    test_indices: folds[fold_idx].clone(),
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_neg: usize, n_pos: usize) -> Array1<f64> {
        Array1::from_iter((0..n_neg + n_pos).map(|i| if i < n_neg { 0.0 } else { 1.0 }))
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = labels(5, 5);
        let splits = StratifiedKFold::new(5).with_shuffle(false).split(&y).unwrap();
        assert_eq!(splits.len(), 5);

        // Each fold should have 1 sample from each class
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let pos = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(pos, 1);
        }
    }

    #[test]
    fn test_folds_cover_every_sample_once() {
        let y = labels(13, 9);
        let splits = StratifiedKFold::new(4).with_random_state(7).split(&y).unwrap();

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..22).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 22);
            for idx in &split.test_indices {
                assert!(!split.train_indices.contains(idx));
            }
        }

        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        let spread = sizes.iter().max().unwrap() - sizes.iter().min().unwrap();
        assert!(spread <= 1, "unbalanced folds: {:?}", sizes);
    }

    #[test]
    fn test_seeded_splits_repeat() {
        let y = labels(10, 10);
        let a = StratifiedKFold::new(3).with_random_state(11).split(&y).unwrap();
        let b = StratifiedKFold::new(3).with_random_state(11).split(&y).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_too_few_samples_per_class() {
        let y = labels(10, 2);
        let err = StratifiedKFold::new(3).split(&y).unwrap_err();
        assert!(matches!(err, FusionError::InsufficientSamples(_)));
    }
}
