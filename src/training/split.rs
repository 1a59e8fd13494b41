//! Stratified shuffle split into training and held-out partitions

use crate::error::{FusionError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices of the two partitions, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Split `y` so that every class appears in both partitions.
///
/// `n_test = ceil(test_size * n)`, shared between classes proportionally with
/// largest-remainder rounding.
pub fn stratified_split(y: &Array1<f64>, test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FusionError::invalid_param(
            "test_size",
            test_size,
            "must lie strictly between 0 and 1",
        ));
    }

    let n = y.len();
    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in y.iter().enumerate() {
        classes.entry(label.round() as i64).or_default().push(idx);
    }
    for (class, members) in &classes {
        if members.len() < 2 {
            return Err(FusionError::InsufficientSamples(format!(
                "class {} has {} sample(s); at least 2 are needed to split",
                class,
                members.len()
            )));
        }
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_classes = classes.len();
    if n_test < n_classes || n - n_test < n_classes {
        return Err(FusionError::InsufficientSamples(format!(
            "test_size {} gives {} held-out of {} samples; each of the {} classes needs a place in both partitions",
            test_size, n_test, n, n_classes
        )));
    }

    let sizes: Vec<usize> = classes.values().map(Vec::len).collect();
    let alloc = allocate(&sizes, n_test, n);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(n - n_test);
    let mut test_indices = Vec::with_capacity(n_test);
    for (members, &k) in classes.values().zip(alloc.iter()) {
        let mut members = members.clone();
        members.shuffle(&mut rng);
        test_indices.extend_from_slice(&members[..k]);
        train_indices.extend_from_slice(&members[k..]);
    }
    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok(TrainTestSplit { train_indices, test_indices })
}

/// Largest-remainder apportionment of `n_test` over class sizes, then moved
/// so that every class keeps at least one sample on each side.
fn allocate(sizes: &[usize], n_test: usize, n: usize) -> Vec<usize> {
    let quotas: Vec<f64> = sizes.iter().map(|&s| n_test as f64 * s as f64 / n as f64).collect();
    let mut alloc: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();

    let mut remaining = n_test - alloc.iter().sum::<usize>();
    let mut by_remainder: Vec<usize> = (0..sizes.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra)
    });
    for &c in by_remainder.iter().cycle() {
        if remaining == 0 {
            break;
        }
        if alloc[c] < sizes[c] - 1 {
            alloc[c] += 1;
            remaining -= 1;
        }
    }

    // every class needs one held-out and one training sample
    for c in 0..sizes.len() {
        while alloc[c] == 0 {
            let donor = (0..sizes.len())
                .filter(|&d| alloc[d] > 1)
                .max_by_key(|&d| alloc[d]);
            match donor {
                Some(d) => {
                    alloc[d] -= 1;
                    alloc[c] += 1;
                }
                None => break,
            }
        }
        while alloc[c] >= sizes[c] {
            let taker = (0..sizes.len()).find(|&d| d != c && alloc[d] + 1 < sizes[d]);
            match taker {
                Some(d) => {
                    alloc[c] -= 1;
                    alloc[d] += 1;
                }
                None => break,
            }
        }
    }
    alloc
}
