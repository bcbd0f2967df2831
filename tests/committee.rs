//! Integration tests for the committee aggregator and its disagreement
//! scorers.

use poolquery::models::LogisticModel;
use poolquery::pool::{Instance, Label, Pool};
use poolquery::scorer::UtilityScorer;
use poolquery::strategies::committee::{
    CommitteeAggregator, KlDivergenceScorer, VoteEntropyScorer,
};

fn clustered_pool() -> Pool {
    Pool::new(
        vec![
            Instance::new(vec![2.0, 0.1], Label::Nominal(0)),
            Instance::new(vec![2.3, -0.1], Label::Nominal(0)),
            Instance::new(vec![1.8, 0.2], Label::Nominal(0)),
            Instance::new(vec![-2.0, 0.0], Label::Nominal(1)),
            Instance::new(vec![-2.2, 0.1], Label::Nominal(1)),
            Instance::new(vec![-1.9, -0.2], Label::Nominal(1)),
            Instance::unlabeled(vec![0.0, 0.0]),  // boundary
            Instance::unlabeled(vec![2.4, 0.0]),  // deep in class 0
        ],
        2,
        0,
    )
}

fn committee(seed: u64) -> CommitteeAggregator {
    CommitteeAggregator::new(Box::new(LogisticModel::default()), 5, seed).unwrap()
}

// ---------------------------------------------------------------------------
// Aggregation primitives
// ---------------------------------------------------------------------------

#[test]
fn unanimous_votes_give_zero_vote_entropy() {
    let pool = clustered_pool();
    let mut scorer = VoteEntropyScorer::new(committee(7));
    scorer.setup(&pool).unwrap();
    // Stratified bootstraps keep every member two-class, so deep inside
    // class 0 all members vote the same way.
    let core = scorer.score(&pool, 1).unwrap();
    assert!(core.abs() < 1e-9, "unanimous committee entropy was {}", core);
}

#[test]
fn vote_entropy_is_maximal_and_nonnegative() {
    let pool = clustered_pool();
    let mut scorer = VoteEntropyScorer::new(committee(7));
    assert!(scorer.maximal());
    scorer.setup(&pool).unwrap();
    for pos in 0..pool.num_unlabeled() {
        assert!(scorer.score(&pool, pos).unwrap() >= 0.0);
    }
}

#[test]
fn kl_divergence_is_nonnegative_and_zero_for_agreement() {
    let pool = clustered_pool();
    let mut scorer = KlDivergenceScorer::new(committee(7));
    scorer.setup(&pool).unwrap();
    let boundary = scorer.score(&pool, 0).unwrap();
    let core = scorer.score(&pool, 1).unwrap();
    assert!(boundary >= 0.0);
    assert!(core >= 0.0);
    assert!(
        boundary + 1e-9 >= core,
        "disagreement at the boundary ({}) should be at least the core's ({})",
        boundary,
        core
    );
}

// ---------------------------------------------------------------------------
// Reproducibility: the committee bootstrap is seeded
// ---------------------------------------------------------------------------

#[test]
fn out_of_range_class_is_an_error_not_a_panic() {
    let pool = Pool::new(
        vec![
            Instance::new(vec![1.0, 0.0], Label::Nominal(0)),
            Instance::new(vec![0.0, 1.0], Label::Nominal(5)),
            Instance::unlabeled(vec![0.5, 0.5]),
        ],
        2,
        0,
    );
    let mut c = committee(7);
    assert!(c.train(&pool).is_err());
}

#[test]
fn same_seed_reproduces_scores() {
    let pool = clustered_pool();
    let mut a = KlDivergenceScorer::new(committee(13));
    let mut b = KlDivergenceScorer::new(committee(13));
    a.setup(&pool).unwrap();
    b.setup(&pool).unwrap();
    for pos in 0..pool.num_unlabeled() {
        assert_eq!(a.score(&pool, pos).unwrap(), b.score(&pool, pos).unwrap());
    }
}
