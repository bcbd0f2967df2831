//! String-key registry for query strategies.
//!
//! Each strategy has a stable key mapped to a constructor, so an invalid
//! key or option is a construction-time error, never a scoring-time
//! surprise. The
//! density-weighted decorator nests its sub-strategy key:
//! `density-weighted(entropy)`.
use crate::classifier::{Classifier, MarginClassifier};
use crate::config::{LossMode, StrategyConfig};
use crate::error::StrategyError;
use crate::models::{BinaryLogisticModel, LogisticModel};
use crate::scorer::UtilityScorer;
use crate::strategies::binary_relevance::BinaryRelevanceEnsemble;
use crate::strategies::committee::{CommitteeAggregator, KlDivergenceScorer, VoteEntropyScorer};
use crate::strategies::density::DensityWeightedScorer;
use crate::strategies::error_reduction::ErrorReductionScorer;
use crate::strategies::multilabel::{
    BinMinScorer, MaxLossScorer, MeanMaxLossScorer, MmcScorer, MmuScorer,
    ThreeDimensionalScorer,
};
use crate::strategies::uncertainty::UncertaintyScorer;
use crate::strategies::variance_reduction::VarianceReductionScorer;

const KNOWN_KEYS: &[&str] = &[
    "entropy",
    "least-confident",
    "relevance",
    "vote-entropy",
    "kl-divergence",
    "density-weighted(<key>)",
    "bin-min",
    "mmu",
    "max-loss",
    "mean-max-loss",
    "mmc",
    "three-dimensional",
    "variance-reduction",
    "expected-01-loss",
    "expected-log-loss",
];

fn base_model() -> Box<dyn Classifier> {
    Box::new(LogisticModel::default())
}

fn margin_template() -> Box<dyn MarginClassifier> {
    Box::new(BinaryLogisticModel::default())
}

fn ensemble(num_labels: usize) -> Result<BinaryRelevanceEnsemble, StrategyError> {
    if num_labels == 0 {
        return Err(StrategyError::Configuration(
            "multi-label strategies require num_labels > 0".to_string(),
        ));
    }
    BinaryRelevanceEnsemble::new(margin_template(), num_labels)
}

/// Build a boxed scorer from a strategy key.
///
/// `num_labels` comes from the dataset and is only consulted by the
/// multi-label strategies.
pub fn build_scorer(
    key: &str,
    config: &StrategyConfig,
    num_labels: usize,
) -> Result<Box<dyn UtilityScorer>, StrategyError> {
    let key = key.trim();

    if let Some(inner) = key
        .strip_prefix("density-weighted(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let base = build_scorer(inner, config, num_labels)?;
        return Ok(Box::new(DensityWeightedScorer::new(
            base,
            config.importance_density,
            config.matrix_storage.clone(),
        )));
    }

    match key {
        "entropy" => Ok(Box::new(UncertaintyScorer::entropy(base_model()))),
        "least-confident" => Ok(Box::new(UncertaintyScorer::least_confident(base_model()))),
        "relevance" => Ok(Box::new(UncertaintyScorer::relevance(base_model()))),
        "vote-entropy" => {
            let committee =
                CommitteeAggregator::new(base_model(), config.number_classifiers, config.seed)?;
            Ok(Box::new(VoteEntropyScorer::new(committee)))
        }
        "kl-divergence" => {
            let committee =
                CommitteeAggregator::new(base_model(), config.number_classifiers, config.seed)?;
            Ok(Box::new(KlDivergenceScorer::new(committee)))
        }
        "bin-min" => Ok(Box::new(BinMinScorer::new(ensemble(num_labels)?))),
        "mmu" => Ok(Box::new(MmuScorer::new(ensemble(num_labels)?))),
        "max-loss" => Ok(Box::new(MaxLossScorer::new(ensemble(num_labels)?))),
        "mean-max-loss" => Ok(Box::new(MeanMaxLossScorer::new(ensemble(num_labels)?))),
        "mmc" => Ok(Box::new(MmcScorer::new(ensemble(num_labels)?))),
        "three-dimensional" => Ok(Box::new(ThreeDimensionalScorer::new(
            ensemble(num_labels)?,
            config.evidence_dimension,
            config.class_dimension,
            config.weight_dimension,
        )?)),
        "variance-reduction" => Ok(Box::new(VarianceReductionScorer::new(
            base_model(),
            config.factor_regularization,
            config.epsilon,
            config.max_epsilon_iteration,
        )?)),
        "expected-01-loss" => Ok(Box::new(ErrorReductionScorer::new(
            base_model(),
            LossMode::ZeroOne,
        ))),
        "expected-log-loss" => Ok(Box::new(ErrorReductionScorer::new(
            base_model(),
            LossMode::Log,
        ))),
        _ => Err(StrategyError::Configuration(format!(
            "unknown strategy key: {}. Known keys: {}",
            key,
            KNOWN_KEYS.join(", ")
        ))),
    }
}
