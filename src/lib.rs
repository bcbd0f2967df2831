//! poolquery: query-strategy scoring and selection for pool-based active learning.
//!
//! This crate provides the utility-scoring layer of an active-learning loop:
//! uncertainty scorers (entropy, least-confident, relevance), committee
//! disagreement scorers (vote entropy, KL-divergence), a density-weighted
//! decorator with a precomputed pairwise-distance cache, the multi-label
//! binary-relevance family (BinMin, MMU, MaxLoss, MeanMaxLoss, MMC,
//! 3-Dimensional), a Fisher-information variance-reduction engine, and
//! expected-error-reduction simulators. A driver ranks the unlabeled pool
//! with any scorer and selects the query batch.
//!
//! The design favors small, testable modules: classifiers are trait objects
//! behind the `classifier` contracts, strategies are trait objects behind
//! `scorer::UtilityScorer` built from string keys by `strategies::factory`,
//! and all per-iteration caches are keyed on the pool's epoch counter.
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod scorer;
pub mod strategies;
