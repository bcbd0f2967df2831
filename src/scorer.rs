//! The common scoring contract and the ranking driver all strategies plug
//! into.
use std::cmp::Ordering;

use anyhow::Context;

use crate::error::StrategyError;
use crate::pool::{Instance, Label, Pool};

/// Scores a single unlabeled instance with a scalar utility value.
///
/// `maximal` declares the direction fixed at configuration time: true means
/// higher score = more informative. Scoring must not mutate the instance or
/// the labeled/unlabeled partition.
pub trait UtilityScorer {
    /// Called once per iteration before any scoring; trains or rebuilds
    /// whatever per-iteration state the scorer keeps (committee, ensemble,
    /// thresholds, Fisher state). Failures here are fatal for the iteration.
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError>;

    /// Utility of the instance at unlabeled position `pos`.
    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError>;

    /// True when higher scores are more informative.
    fn maximal(&self) -> bool;

    /// Optional human readable name for the strategy.
    fn name(&self) -> &str {
        "scorer"
    }
}

impl std::fmt::Debug for dyn UtilityScorer + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtilityScorer")
            .field("name", &self.name())
            .field("maximal", &self.maximal())
            .finish()
    }
}

/// One ranked batch: unlabeled positions (valid for the current epoch)
/// paired with the scores that selected them.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub positions: Vec<usize>,
    pub scores: Vec<f64>,
}

/// Orchestrates one active-learning iteration: scores every unlabeled
/// instance, ranks in the scorer's declared direction, and returns the
/// top-k positions. Ties break by original pool order (stable sort).
pub struct QueryStrategyDriver {
    batch_size: usize,
}

impl QueryStrategyDriver {
    pub fn new(batch_size: usize) -> Self {
        QueryStrategyDriver { batch_size }
    }

    /// Score and rank the unlabeled pool.
    ///
    /// A scoring failure for one instance does not abort the batch: the
    /// failure is logged and the instance receives the worst value in the
    /// scorer's direction, so it can never win the batch.
    pub fn select_batch(
        &self,
        scorer: &mut dyn UtilityScorer,
        pool: &Pool,
    ) -> Result<Selection, StrategyError> {
        scorer.setup(pool)?;

        let n = pool.num_unlabeled();
        let sentinel = if scorer.maximal() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };

        let mut scored: Vec<(usize, f64)> = Vec::with_capacity(n);
        for pos in 0..n {
            let score = match scorer.score(pool, pos) {
                Ok(s) => s,
                Err(err) => {
                    log::warn!(
                        "{}: scoring failed for unlabeled position {}: {}",
                        scorer.name(),
                        pos,
                        err
                    );
                    sentinel
                }
            };
            scored.push((pos, score));
        }

        let maximal = scorer.maximal();
        scored.sort_by(|a, b| {
            let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
            if maximal {
                ord.reverse()
            } else {
                ord
            }
        });

        let take = self.batch_size.min(scored.len());
        let positions: Vec<usize> = scored.iter().take(take).map(|&(pos, _)| pos).collect();
        let scores: Vec<f64> = scored.iter().take(take).map(|&(_, s)| s).collect();

        log::debug!(
            "{}: selected {} of {} unlabeled (epoch {}), best score {:?}",
            scorer.name(),
            positions.len(),
            n,
            pool.epoch(),
            scores.first()
        );

        Ok(Selection { positions, scores })
    }
}

/// One full active-learning iteration: rank the unlabeled pool, ask the
/// oracle for a label for each selected instance, and move the batch into
/// the labeled set.
///
/// Positions shift as instances leave the unlabeled set, so the batch is
/// committed in descending position order. The returned selection carries
/// the positions as ranked, valid for the epoch the batch was scored in.
pub fn run_iteration<F>(
    driver: &QueryStrategyDriver,
    scorer: &mut dyn UtilityScorer,
    pool: &mut Pool,
    mut oracle: F,
) -> anyhow::Result<Selection>
where
    F: FnMut(&Instance) -> Label,
{
    let selection = driver
        .select_batch(scorer, pool)
        .with_context(|| format!("ranking the unlabeled pool with {}", scorer.name()))?;

    let mut ordered = selection.positions.clone();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    for pos in ordered {
        let label = oracle(pool.unlabeled_instance(pos));
        pool.move_to_labeled(pos, label)
            .with_context(|| format!("labeling unlabeled position {pos}"))?;
    }

    Ok(selection)
}
