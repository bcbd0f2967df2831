//! Integration tests for the multi-label binary-relevance scorers, using a
//! toy ensemble with known per-label margins.

use ndarray::Array2;
use poolquery::classifier::MarginClassifier;
use poolquery::config::{ClassDimension, EvidenceDimension, WeightDimension};
use poolquery::error::StrategyError;
use poolquery::models::BinaryLogisticModel;
use poolquery::pool::{Instance, Label, Pool};
use poolquery::scorer::UtilityScorer;
use poolquery::strategies::binary_relevance::BinaryRelevanceEnsemble;
use poolquery::strategies::multilabel::{
    BinMinScorer, MaxLossScorer, MeanMaxLossScorer, MmcScorer, MmuScorer,
    ThreeDimensionalScorer,
};

/// Per-label classifier with a fixed margin, ignoring training.
struct FixedMargin(f64);

impl MarginClassifier for FixedMargin {
    fn train_binary(&mut self, _x: &Array2<f64>, _y: &[bool]) -> Result<(), StrategyError> {
        Ok(())
    }

    fn margin(&self, _features: &[f64]) -> Result<f64, StrategyError> {
        Ok(self.0)
    }

    fn boxed_clone(&self) -> Box<dyn MarginClassifier> {
        Box::new(FixedMargin(self.0))
    }
}

fn toy_ensemble(margins: &[f64]) -> BinaryRelevanceEnsemble {
    let members: Vec<Box<dyn MarginClassifier>> = margins
        .iter()
        .map(|&m| Box::new(FixedMargin(m)) as Box<dyn MarginClassifier>)
        .collect();
    BinaryRelevanceEnsemble::from_trained(members).unwrap()
}

fn multilabel_pool(num_labels: usize) -> Pool {
    Pool::new(
        vec![
            Instance::new(vec![1.0, 0.0], Label::Relevance(vec![true; num_labels])),
            Instance::new(
                vec![0.0, 1.0],
                Label::Relevance(vec![false; num_labels]),
            ),
            Instance::unlabeled(vec![0.5, 0.5]),
        ],
        0,
        num_labels,
    )
}

// ---------------------------------------------------------------------------
// BinMin and MMU on known margins [0.2, -0.5]
// ---------------------------------------------------------------------------

#[test]
fn binmin_takes_the_smallest_margin_magnitude() {
    let pool = multilabel_pool(2);
    let mut scorer = BinMinScorer::new(toy_ensemble(&[0.2, -0.5]));
    scorer.setup(&pool).unwrap();
    assert!(!scorer.maximal());
    assert!((scorer.score(&pool, 0).unwrap() - 0.2).abs() < 1e-9);
}

#[test]
fn mmu_inverts_the_separation_margin() {
    let pool = multilabel_pool(2);
    let mut scorer = MmuScorer::new(toy_ensemble(&[0.2, -0.5]));
    scorer.setup(&pool).unwrap();
    assert!(scorer.maximal());
    // minPositive = 0.2, minNegative = 0.5 -> 1 / 0.7
    assert!((scorer.score(&pool, 0).unwrap() - 1.0 / 0.7).abs() < 1e-9);
}

#[test]
fn mmu_with_no_separation_is_infinite_not_nan() {
    let pool = multilabel_pool(1);
    // A single exactly-zero margin: both sides default to 0.
    let mut scorer = MmuScorer::new(toy_ensemble(&[0.0]));
    scorer.setup(&pool).unwrap();
    let score = scorer.score(&pool, 0).unwrap();
    assert!(score.is_infinite() && score > 0.0);
}

// ---------------------------------------------------------------------------
// MaxLoss family
// ---------------------------------------------------------------------------

#[test]
fn maxloss_anchors_the_most_confident_label() {
    let pool = multilabel_pool(2);
    let mut scorer = MaxLossScorer::new(toy_ensemble(&[0.2, -0.5]));
    scorer.setup(&pool).unwrap();
    assert!(scorer.maximal());
    // Anchor is label 0 (largest signed margin):
    // max(1 - 0.2, 0) + max(1 + 0.5, 0) = 0.8 + 1.5
    assert!((scorer.score(&pool, 0).unwrap() - 2.3).abs() < 1e-9);
}

#[test]
fn mean_maxloss_averages_qualifying_labels() {
    let pool = multilabel_pool(2);
    let mut scorer = MeanMaxLossScorer::new(toy_ensemble(&[0.2, -0.5]));
    scorer.setup(&pool).unwrap();
    // Fixed margins make every anchored loss equal to its threshold, so
    // both labels qualify and the average equals the anchored losses' mean:
    // (2.3 + 1.7) / 2.
    assert!((scorer.score(&pool, 0).unwrap() - 2.0).abs() < 1e-9);
}

#[test]
fn mean_maxloss_with_no_qualifying_label_is_zero() {
    // No label has a positive training instance, so no threshold is ever
    // attainable and no label qualifies.
    let pool = Pool::new(
        vec![
            Instance::new(vec![1.0, 0.0], Label::Relevance(vec![false, false])),
            Instance::new(vec![0.0, 1.0], Label::Relevance(vec![false, false])),
            Instance::unlabeled(vec![0.5, 0.5]),
        ],
        0,
        2,
    );
    let mut scorer = MeanMaxLossScorer::new(toy_ensemble(&[0.2, -0.5]));
    scorer.setup(&pool).unwrap();
    assert_eq!(scorer.score(&pool, 0).unwrap(), 0.0);
}

#[test]
fn mmc_produces_a_finite_hinge_loss() {
    let pool = multilabel_pool(2);
    let mut scorer = MmcScorer::new(toy_ensemble(&[0.2, -0.5]));
    scorer.setup(&pool).unwrap();
    assert!(scorer.maximal());
    let score = scorer.score(&pool, 0).unwrap();
    assert!(score.is_finite());
    assert!(score >= 0.0);
}

// ---------------------------------------------------------------------------
// 3-Dimensional strategy
// ---------------------------------------------------------------------------

#[test]
fn three_dimensional_confidence_min_is_non_maximal() {
    let pool = multilabel_pool(2);
    let mut scorer = ThreeDimensionalScorer::new(
        toy_ensemble(&[0.0, 4.0]),
        EvidenceDimension::Confidence,
        ClassDimension::MinMax,
        WeightDimension::None,
    )
    .unwrap();
    scorer.setup(&pool).unwrap();
    assert!(!scorer.maximal());
    // Evidence per label is certainty; the zero-margin label contributes
    // exactly 0.5 and Min picks it.
    assert!((scorer.score(&pool, 0).unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn three_dimensional_average_uses_all_labels() {
    let pool = multilabel_pool(2);
    let mut scorer = ThreeDimensionalScorer::new(
        toy_ensemble(&[0.0, 0.0]),
        EvidenceDimension::Confidence,
        ClassDimension::Average,
        WeightDimension::None,
    )
    .unwrap();
    scorer.setup(&pool).unwrap();
    assert!((scorer.score(&pool, 0).unwrap() - 0.5).abs() < 1e-9);
}

#[test]
fn three_dimensional_score_mode_is_maximal() {
    let scorer = ThreeDimensionalScorer::new(
        toy_ensemble(&[0.0]),
        EvidenceDimension::Score,
        ClassDimension::MinMax,
        WeightDimension::None,
    )
    .unwrap();
    assert!(scorer.maximal());
}

// ---------------------------------------------------------------------------
// Trained ensemble end-to-end
// ---------------------------------------------------------------------------

#[test]
fn trained_ensemble_margins_track_labels() {
    let pool = Pool::new(
        vec![
            Instance::new(vec![2.0], Label::Relevance(vec![true, false])),
            Instance::new(vec![1.5], Label::Relevance(vec![true, false])),
            Instance::new(vec![-2.0], Label::Relevance(vec![false, true])),
            Instance::new(vec![-1.5], Label::Relevance(vec![false, true])),
            Instance::unlabeled(vec![1.8]),
        ],
        0,
        2,
    );
    let mut ensemble =
        BinaryRelevanceEnsemble::new(Box::new(BinaryLogisticModel::default()), 2).unwrap();
    ensemble.train(&pool).unwrap();
    let margins = ensemble.margins(&[1.8]).unwrap();
    assert!(margins[0] > 0.0, "label 0 should be predicted relevant");
    assert!(margins[1] < 0.0, "label 1 should be predicted irrelevant");

    let (bipartition, confidences) = ensemble.predict(&[1.8]).unwrap();
    assert_eq!(bipartition, vec![true, false]);
    assert!(confidences.iter().all(|&c| c >= 0.0));
}
