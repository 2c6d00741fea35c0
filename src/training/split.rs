//! Seeded train / evaluation partitioning.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle `0..n` with `seed` and cut off `ceil(n * test_fraction)` indices
/// for evaluation. Both partitions are non-empty whenever `n >= 2`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    if n < 2 {
        return (indices, Vec::new());
    }

    let fraction = test_fraction.clamp(0.0, 1.0);
    let n_test = ((n as f64 * fraction).ceil() as usize).clamp(1, n - 1);
    let train = indices.split_off(n_test);
    (train, indices)
}
