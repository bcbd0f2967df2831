//! Integration tests for the distance cache and the density-weighted
//! decorator.

use poolquery::config::MatrixStorage;
use poolquery::error::StrategyError;
use poolquery::pool::{Instance, Label, Pool};
use poolquery::scorer::UtilityScorer;
use poolquery::strategies::density::{DensityWeightedScorer, DistanceCache};

fn line_pool() -> Pool {
    // Three unlabeled points on a line: pairwise distances 1, 1 and 2.
    Pool::new(
        vec![
            Instance::new(vec![10.0], Label::Nominal(0)),
            Instance::unlabeled(vec![0.0]),
            Instance::unlabeled(vec![1.0]),
            Instance::unlabeled(vec![2.0]),
        ],
        2,
        0,
    )
}

/// Sub-strategy returning a fixed score per position.
struct StubScorer {
    values: Vec<f64>,
    maximal: bool,
}

impl UtilityScorer for StubScorer {
    fn setup(&mut self, _pool: &Pool) -> Result<(), StrategyError> {
        Ok(())
    }

    fn score(&mut self, _pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        Ok(self.values[pos])
    }

    fn maximal(&self) -> bool {
        self.maximal
    }
}

// ---------------------------------------------------------------------------
// DistanceCache
// ---------------------------------------------------------------------------

#[test]
fn accumulated_distances_match_hand_computation() {
    let pool = line_pool();
    let mut cache = DistanceCache::new(MatrixStorage::InMemory);
    cache.ensure(&pool).unwrap();
    assert_eq!(cache.len(), 3);
    assert!((cache.accumulated_distance(0).unwrap() - 3.0).abs() < 1e-12); // 1 + 2
    assert!((cache.accumulated_distance(1).unwrap() - 2.0).abs() < 1e-12); // 1 + 1
    assert!((cache.accumulated_distance(2).unwrap() - 3.0).abs() < 1e-12); // 2 + 1
    assert!(cache.accumulated_distance(3).is_err());
}

#[test]
fn cache_is_not_rebuilt_within_one_epoch() {
    let pool = line_pool();
    let mut cache = DistanceCache::new(MatrixStorage::InMemory);
    cache.ensure(&pool).unwrap();
    assert!(cache.is_current(&pool));
    cache.ensure(&pool).unwrap();
    assert!(cache.is_current(&pool));
}

#[test]
fn cache_invalidates_when_epoch_moves() {
    let mut pool = line_pool();
    let mut cache = DistanceCache::new(MatrixStorage::InMemory);
    cache.ensure(&pool).unwrap();
    pool.move_to_labeled(0, Label::Nominal(1)).unwrap();
    assert!(!cache.is_current(&pool));
    cache.ensure(&pool).unwrap();
    assert_eq!(cache.len(), 2);
}

#[test]
fn file_backed_rows_roundtrip_and_destroy_removes_file() {
    let path = std::env::temp_dir().join("poolquery_density_matrix_test.bin");
    let pool = line_pool();
    let mut cache = DistanceCache::new(MatrixStorage::FileBacked(path.clone()));
    cache.ensure(&pool).unwrap();
    assert!(path.exists());

    let row = cache.row(0).unwrap();
    assert_eq!(row.len(), 3);
    assert!((row[0] - 0.0).abs() < 1e-12);
    assert!((row[1] - 1.0).abs() < 1e-12);
    assert!((row[2] - 2.0).abs() < 1e-12);

    cache.destroy().unwrap();
    assert!(!path.exists());
}

// ---------------------------------------------------------------------------
// DensityWeighted decorator
// ---------------------------------------------------------------------------

#[test]
fn zero_base_score_short_circuits() {
    let pool = line_pool();
    let base = StubScorer {
        values: vec![0.0, 0.5, 0.5],
        maximal: true,
    };
    let mut wrapper =
        DensityWeightedScorer::new(Box::new(base), 1.0, MatrixStorage::InMemory);
    wrapper.setup(&pool).unwrap();
    assert_eq!(wrapper.score(&pool, 0).unwrap(), 0.0);
}

#[test]
fn maximal_base_is_inverted_and_blended() {
    let pool = line_pool();
    let base = StubScorer {
        values: vec![2.0, 4.0, 0.5],
        maximal: true,
    };
    let mut wrapper =
        DensityWeightedScorer::new(Box::new(base), 1.0, MatrixStorage::InMemory);
    wrapper.setup(&pool).unwrap();
    assert!(!wrapper.maximal());
    // score = (1/base) * (accumulated / n)^beta
    let expected = (1.0 / 2.0) * (3.0 / 3.0);
    assert!((wrapper.score(&pool, 0).unwrap() - expected).abs() < 1e-12);
    let expected = (1.0 / 4.0) * (2.0 / 3.0);
    assert!((wrapper.score(&pool, 1).unwrap() - expected).abs() < 1e-12);
}

#[test]
fn non_maximal_base_is_not_inverted() {
    let pool = line_pool();
    let base = StubScorer {
        values: vec![0.5, 0.5, 0.5],
        maximal: false,
    };
    let mut wrapper =
        DensityWeightedScorer::new(Box::new(base), 2.0, MatrixStorage::InMemory);
    wrapper.setup(&pool).unwrap();
    let expected = 0.5 * (3.0f64 / 3.0).powf(2.0);
    assert!((wrapper.score(&pool, 0).unwrap() - expected).abs() < 1e-12);
}

#[test]
fn stale_cache_is_an_error_not_a_wrong_score() {
    let mut pool = line_pool();
    let base = StubScorer {
        values: vec![1.0, 1.0, 1.0],
        maximal: false,
    };
    let mut wrapper =
        DensityWeightedScorer::new(Box::new(base), 1.0, MatrixStorage::InMemory);
    wrapper.setup(&pool).unwrap();
    // Pool mutated after setup: the old accumulated sums no longer describe
    // the unlabeled set, so scoring must refuse rather than blend them.
    pool.move_to_labeled(2, Label::Nominal(0)).unwrap();
    assert!(wrapper.score(&pool, 0).is_err());
    // A fresh setup rebuilds the cache and scoring resumes.
    wrapper.setup(&pool).unwrap();
    assert!(wrapper.score(&pool, 0).is_ok());
}

#[test]
fn scoring_before_setup_is_an_error_not_a_panic() {
    let pool = line_pool();
    let base = StubScorer {
        values: vec![1.0, 1.0, 1.0],
        maximal: false,
    };
    let mut wrapper =
        DensityWeightedScorer::new(Box::new(base), 1.0, MatrixStorage::InMemory);
    assert!(wrapper.score(&pool, 0).is_err());
}

#[test]
fn scoring_twice_in_one_iteration_is_identical() {
    let pool = line_pool();
    let base = StubScorer {
        values: vec![0.3, 0.7, 0.9],
        maximal: true,
    };
    let mut wrapper =
        DensityWeightedScorer::new(Box::new(base), 1.0, MatrixStorage::InMemory);
    wrapper.setup(&pool).unwrap();
    let first: Vec<f64> = (0..3).map(|p| wrapper.score(&pool, p).unwrap()).collect();
    // Same iteration, no pool mutation: the cache must not drift.
    wrapper.setup(&pool).unwrap();
    let second: Vec<f64> = (0..3).map(|p| wrapper.score(&pool, p).unwrap()).collect();
    assert_eq!(first, second);
}
