//! Seeded train/test split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of the two halves of a split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and take the first `ceil(n * test_ratio)` rows
/// as the test split. At least one row stays in the training split.
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> SplitIndices {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_ratio.clamp(0.0, 1.0)).ceil() as usize).min(n.saturating_sub(1));
    let train = indices.split_off(n_test);

    SplitIndices {
        train,
        test: indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(101, 0.2, 123);
        assert_eq!(split.test.len(), 21);
        assert_eq!(split.train.len(), 80);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(train_test_split(50, 0.2, 123), train_test_split(50, 0.2, 123));
        assert_ne!(train_test_split(50, 0.2, 123), train_test_split(50, 0.2, 7));
    }

    #[test]
    fn test_tiny_tables() {
        let split = train_test_split(1, 0.2, 123);
        assert_eq!(split.train.len(), 1);
        assert!(split.test.is_empty());

        assert!(train_test_split(0, 0.2, 123).train.is_empty());
    }
}
