//! Utility functions for the pos_forecast crate

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of a seeded train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(test_ratio * n)` rows.
///
/// The same `n`, ratio and seed always give the same split. At least one row
/// stays in the training split whenever `n > 0`.
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..n).collect();
    if n == 0 || test_ratio <= 0.0 {
        return SplitIndices {
            train: indices,
            test: Vec::new(),
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_size = ((n as f64 * test_ratio).ceil() as usize).min(n - 1);
    let train = indices.split_off(test_size);

    SplitIndices {
        train,
        test: indices,
    }
}

/// Pick the rows at `indices`
pub fn take_rows<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&idx| values[idx].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(30, 6)]
    #[case(10, 2)]
    #[case(11, 3)]
    #[case(1, 0)]
    fn test_split_sizes(#[case] n: usize, #[case] test: usize) {
        let split = train_test_split(n, 0.2, 42);
        assert_eq!(split.test.len(), test);
        assert_eq!(split.train.len(), n - test);
    }

    #[test]
    fn test_split_is_deterministic_and_disjoint() {
        let a = train_test_split(25, 0.2, 42);
        let b = train_test_split(25, 0.2, 42);
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
    }
}
