//! Uncertainty-sampling scorers over the current model's class
//! distribution: entropy, least-confident, and relevance (margin-style).
use crate::classifier::Classifier;
use crate::error::StrategyError;
use crate::pool::Pool;
use crate::scorer::UtilityScorer;

/// Shannon entropy in bits over the nonzero entries of a distribution.
/// A one-hot distribution scores exactly 0; zero-probability terms are
/// excluded by construction, so no special-casing is needed.
pub fn entropy_bits(p: &[f64]) -> f64 {
    p.iter()
        .filter(|&&v| v > 0.0)
        .map(|&v| -v * v.log2())
        .sum()
}

fn max_probability(p: &[f64]) -> Result<f64, StrategyError> {
    p.iter()
        .cloned()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .ok_or_else(|| StrategyError::Numeric("empty class distribution".to_string()))
}

/// The three uncertainty measures, sharing one model lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    Entropy,
    LeastConfident,
    Relevance,
}

/// Scores unlabeled instances by the current model's predictive
/// uncertainty. The model is retrained on the labeled set once per
/// iteration (epoch-keyed), then consulted per instance.
pub struct UncertaintyScorer {
    model: Box<dyn Classifier>,
    measure: Measure,
    trained_epoch: Option<u64>,
}

impl UncertaintyScorer {
    /// Entropy of the class distribution; higher = more informative.
    pub fn entropy(model: Box<dyn Classifier>) -> Self {
        Self::new(model, Measure::Entropy)
    }

    /// `1 - max(p)`; higher = more informative.
    pub fn least_confident(model: Box<dyn Classifier>) -> Self {
        Self::new(model, Measure::LeastConfident)
    }

    /// `max(p)`, the relevance measure paired with sub-strategy wrappers
    /// (the density decorator inverts the direction internally).
    pub fn relevance(model: Box<dyn Classifier>) -> Self {
        Self::new(model, Measure::Relevance)
    }

    fn new(model: Box<dyn Classifier>, measure: Measure) -> Self {
        UncertaintyScorer {
            model,
            measure,
            trained_epoch: None,
        }
    }
}

impl UtilityScorer for UncertaintyScorer {
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
        let p = self
            .model
            .predict_proba(pool.unlabeled_instance(pos).features())?;
        match self.measure {
            Measure::Entropy => Ok(entropy_bits(&p)),
            Measure::LeastConfident => Ok(1.0 - max_probability(&p)?),
            Measure::Relevance => max_probability(&p),
        }
    }

    fn maximal(&self) -> bool {
        // All three declare maximal; relevance relies on its wrapper to
        // invert (see the density decorator).
        true
    }

    fn name(&self) -> &str {
        match self.measure {
            Measure::Entropy => "entropy",
            Measure::LeastConfident => "least-confident",
            Measure::Relevance => "relevance",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_one_hot_is_zero() {
        assert_eq!(entropy_bits(&[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn entropy_uniform_is_log2_k() {
        let third = 1.0 / 3.0;
        let e = entropy_bits(&[third, third, third]);
        assert!((e - 3f64.log2()).abs() < 1e-9, "got {}", e);
    }
}
