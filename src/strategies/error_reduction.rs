//! Expected-error-reduction: for each candidate, simulate adding it to the
//! labeled set under every hypothetical label, retrain a throwaway model,
//! and measure the expected loss over the remaining pool. The most
//! expensive strategy in the family; intended for small pools.
use crate::classifier::{batch_distributions, Classifier};
use crate::config::LossMode;
use crate::error::StrategyError;
use crate::pool::{Label, Pool};
use crate::scorer::UtilityScorer;

pub struct ErrorReductionScorer {
    model: Box<dyn Classifier>,
    loss_mode: LossMode,
    trained_epoch: Option<u64>,
}

impl ErrorReductionScorer {
    pub fn new(model: Box<dyn Classifier>, loss_mode: LossMode) -> Self {
        ErrorReductionScorer {
            model,
            loss_mode,
            trained_epoch: None,
        }
    }

    /// Loss over the remaining unlabeled clone after hypothetically
    /// labeling the candidate with class `class` and retraining a
    /// throwaway copy. The original pool is never touched.
    fn simulated_loss(
        &self,
        pool: &Pool,
        pos: usize,
        class: usize,
    ) -> Result<f64, StrategyError> {
        let mut sim = pool.clone();
        sim.move_to_labeled(pos, Label::Nominal(class))?;

        let mut throwaway = self.model.boxed_clone();
        let x = sim.labeled_features();
        let y = sim.labeled_targets()?;
        throwaway.train(&x, &y, sim.num_classes())?;

        let remaining = sim.unlabeled_features();
        let distributions = batch_distributions(throwaway.as_ref(), &remaining)?;

        let loss = distributions
            .iter()
            .map(|p| match self.loss_mode {
                LossMode::ZeroOne => {
                    1.0 - p.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                }
                LossMode::Log => p
                    .iter()
                    .filter(|&&v| v > 0.0)
                    .map(|&v| v * v.log2())
                    .sum(),
            })
            .sum();
        Ok(loss)
    }
}

impl UtilityScorer for ErrorReductionScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        if self.trained_epoch == Some(pool.epoch()) {
            return Ok(());
        }
        let x = pool.labeled_features();
        let y = pool.labeled_targets()?;
        self.model.train(&x, &y, pool.num_classes())?;
        self.trained_epoch = Some(pool.epoch());
        Ok(())
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let belief = self
            .model
            .predict_proba(pool.unlabeled_instance(pos).features())?;
        let mut expected = 0.0;
        for (class, &p) in belief.iter().enumerate() {
            if p == 0.0 {
                continue;
            }
            expected += p * self.simulated_loss(pool, pos, class)?;
        }
        Ok(expected)
    }

    fn maximal(&self) -> bool {
        // Loss conditioned on adding the candidate: the lowest expected
        // loss after the hypothetical addition wins the batch.
        false
    }

    fn name(&self) -> &str {
        match self.loss_mode {
            LossMode::ZeroOne => "expected-01-loss",
            LossMode::Log => "expected-log-loss",
        }
    }
}
