//! Multi-label query strategies over a binary-relevance ensemble: BinMin,
//! MMU, MaxLoss, MeanMaxLoss, MMC and the 3-Dimensional strategy.
use ndarray::Array2;

use crate::classifier::Classifier;
use crate::config::{ClassDimension, EvidenceDimension, WeightDimension};
use crate::error::StrategyError;
use crate::models::LogisticModel;
use crate::pool::Pool;
use crate::scorer::UtilityScorer;
use crate::strategies::binary_relevance::BinaryRelevanceEnsemble;

/// Hinge-loss sum against a single anchor label treated as ground truth:
/// `Σ_l max(1 - m_al·|margin_l|, 0)` with `m_al = +1` iff `l == anchor`.
fn hinge_sum_anchored(margins: &[f64], anchor: usize) -> f64 {
    margins
        .iter()
        .enumerate()
        .map(|(l, &m)| {
            let sign = if l == anchor { 1.0 } else { -1.0 };
            (1.0 - sign * m.abs()).max(0.0)
        })
        .sum()
}

/// BinMin: the least-confident label dominates.
/// `score = min_l |margin_l|`, non-maximal.
pub struct BinMinScorer {
    ensemble: BinaryRelevanceEnsemble,
}

impl BinMinScorer {
    pub fn new(ensemble: BinaryRelevanceEnsemble) -> Self {
        BinMinScorer { ensemble }
    }
}

impl UtilityScorer for BinMinScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.ensemble.train(pool)
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let margins = self
            .ensemble
            .margins(pool.unlabeled_instance(pos).features())?;
        margins
            .iter()
            .map(|m| m.abs())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))))
            .ok_or_else(|| StrategyError::Numeric("no label margins".to_string()))
    }

    fn maximal(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "bin-min"
    }
}

/// MMU (separation margin): the smallest-magnitude margin on each side of
/// the decision boundary, summed and inverted. A side never predicted
/// defaults to 0; when both default the score is `+∞` (documented, not a
/// crash). Maximal.
pub struct MmuScorer {
    ensemble: BinaryRelevanceEnsemble,
}

impl MmuScorer {
    pub fn new(ensemble: BinaryRelevanceEnsemble) -> Self {
        MmuScorer { ensemble }
    }
}

impl UtilityScorer for MmuScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.ensemble.train(pool)
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let margins = self
            .ensemble
            .margins(pool.unlabeled_instance(pos).features())?;
        let mut min_positive: Option<f64> = None;
        let mut min_negative: Option<f64> = None;
        for &m in &margins {
            if m >= 0.0 {
                min_positive = Some(min_positive.map_or(m, |v| v.min(m)));
            } else {
                let mag = -m;
                min_negative = Some(min_negative.map_or(mag, |v| v.min(mag)));
            }
        }
        let separation = min_positive.unwrap_or(0.0) + min_negative.unwrap_or(0.0);
        if separation == 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(1.0 / separation)
    }

    fn maximal(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mmu"
    }
}

/// MaxLoss: hinge loss against the single most-confident positive label
/// treated as ground truth. Maximal (more loss = more informative).
pub struct MaxLossScorer {
    ensemble: BinaryRelevanceEnsemble,
}

impl MaxLossScorer {
    pub fn new(ensemble: BinaryRelevanceEnsemble) -> Self {
        MaxLossScorer { ensemble }
    }

    fn max_confidence_label(margins: &[f64]) -> Result<usize, StrategyError> {
        margins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(l, _)| l)
            .ok_or_else(|| StrategyError::Numeric("no label margins".to_string()))
    }
}

impl UtilityScorer for MaxLossScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.ensemble.train(pool)
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let margins = self
            .ensemble
            .margins(pool.unlabeled_instance(pos).features())?;
        let anchor = Self::max_confidence_label(&margins)?;
        Ok(hinge_sum_anchored(&margins, anchor))
    }

    fn maximal(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "max-loss"
    }
}

/// MeanMaxLoss: MaxLoss averaged across the labels that look plausible for
/// the instance, judged against per-label thresholds learned once per
/// training phase from the positively-labeled training instances.
/// When no label qualifies the score is a documented `0.0`, never a
/// division by zero. Maximal.
pub struct MeanMaxLossScorer {
    ensemble: BinaryRelevanceEnsemble,
    thresholds: Vec<f64>,
    thresholds_epoch: Option<u64>,
}

impl MeanMaxLossScorer {
    pub fn new(ensemble: BinaryRelevanceEnsemble) -> Self {
        MeanMaxLossScorer {
            ensemble,
            thresholds: Vec::new(),
            thresholds_epoch: None,
        }
    }

    /// For each label, the minimum anchored hinge sum over the training
    /// instances truly positive for that label. Labels with no positive
    /// training instance get `-∞` so they never qualify.
    fn rebuild_thresholds(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        let num_labels = self.ensemble.num_labels();
        let mut thresholds = vec![f64::NEG_INFINITY; num_labels];
        for inst in pool.labeled_instances() {
            let bits = inst.relevance().ok_or_else(|| {
                StrategyError::Model("labeled instance carries no relevance vector".to_string())
            })?;
            let margins = self.ensemble.margins(inst.features())?;
            for (label, &positive) in bits.iter().enumerate() {
                if !positive {
                    continue;
                }
                let loss = hinge_sum_anchored(&margins, label);
                if thresholds[label] == f64::NEG_INFINITY || loss < thresholds[label] {
                    thresholds[label] = loss;
                }
            }
        }
        self.thresholds = thresholds;
        self.thresholds_epoch = Some(pool.epoch());
        Ok(())
    }
}

impl UtilityScorer for MeanMaxLossScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.ensemble.train(pool)?;
        if self.thresholds_epoch != Some(pool.epoch()) {
            self.rebuild_thresholds(pool)?;
        }
        Ok(())
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let margins = self
            .ensemble
            .margins(pool.unlabeled_instance(pos).features())?;
        let mut total = 0.0;
        let mut qualifying = 0usize;
        for (label, &threshold) in self.thresholds.iter().enumerate() {
            let loss = hinge_sum_anchored(&margins, label);
            if loss <= threshold {
                total += loss;
                qualifying += 1;
            }
        }
        if qualifying == 0 {
            return Ok(0.0);
        }
        Ok(total / qualifying as f64)
    }

    fn maximal(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mean-max-loss"
    }
}

/// MMC: a logistic meta-classifier predicts the instance's label
/// cardinality from its sorted margins; hinge loss is then summed against
/// the predicted cardinality cut. Maximal.
pub struct MmcScorer {
    ensemble: BinaryRelevanceEnsemble,
    meta: LogisticModel,
    meta_epoch: Option<u64>,
}

impl MmcScorer {
    pub fn new(ensemble: BinaryRelevanceEnsemble) -> Self {
        MmcScorer {
            ensemble,
            meta: LogisticModel::default(),
            meta_epoch: None,
        }
    }

    fn sorted_margins_desc(mut margins: Vec<f64>) -> Vec<f64> {
        margins.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        margins
    }

    /// Derived meta-dataset: each labeled instance becomes its per-label
    /// margins sorted descending, targeting the count of true positive
    /// labels (a label-cardinality proxy).
    fn train_meta(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        let num_labels = self.ensemble.num_labels();
        let n = pool.num_labeled();
        let mut data = Vec::with_capacity(n * num_labels);
        let mut targets = Vec::with_capacity(n);
        for inst in pool.labeled_instances() {
            let bits = inst.relevance().ok_or_else(|| {
                StrategyError::Model("labeled instance carries no relevance vector".to_string())
            })?;
            let sorted = Self::sorted_margins_desc(self.ensemble.margins(inst.features())?);
            data.extend_from_slice(&sorted);
            targets.push(bits.iter().filter(|&&b| b).count());
        }
        let x = Array2::from_shape_vec((n, num_labels), data)
            .map_err(|e| StrategyError::Numeric(e.to_string()))?;
        self.meta.train(&x, &targets, num_labels + 1)?;
        self.meta_epoch = Some(pool.epoch());
        Ok(())
    }

    fn predicted_cardinality(&self, sorted_margins: &[f64]) -> Result<usize, StrategyError> {
        let probs = self.meta.predict_proba(sorted_margins)?;
        probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, _)| c)
            .ok_or_else(|| StrategyError::Numeric("empty cardinality distribution".to_string()))
    }
}

impl UtilityScorer for MmcScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.ensemble.train(pool)?;
        if self.meta_epoch != Some(pool.epoch()) {
            self.train_meta(pool)?;
        }
        Ok(())
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let sorted = Self::sorted_margins_desc(
            self.ensemble
                .margins(pool.unlabeled_instance(pos).features())?,
        );
        let cardinality = self.predicted_cardinality(&sorted)?;
        let mut loss = 0.0;
        for (l, &margin) in sorted.iter().enumerate() {
            let yl = if l < cardinality { 1.0 } else { -1.0 };
            loss += (1.0 - yl * margin) / 2.0;
        }
        Ok(loss)
    }

    fn maximal(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mmc"
    }
}

/// The 3-Dimensional strategy: three orthogonal axes (evidence,
/// class-aggregation, weighting) validated exhaustively at construction.
/// Unimplemented combinations (Round-Robin, Weighted) are rejected with a
/// catchable error, never at scoring time and never a process exit.
pub struct ThreeDimensionalScorer {
    ensemble: BinaryRelevanceEnsemble,
    evidence: EvidenceDimension,
    class_dimension: ClassDimension,
}

impl ThreeDimensionalScorer {
    pub fn new(
        ensemble: BinaryRelevanceEnsemble,
        evidence: EvidenceDimension,
        class_dimension: ClassDimension,
        weight_dimension: WeightDimension,
    ) -> Result<Self, StrategyError> {
        if class_dimension == ClassDimension::RoundRobin {
            return Err(StrategyError::Unsupported(
                "class-dimension 'R' (round-robin) is declared but not implemented".to_string(),
            ));
        }
        if weight_dimension == WeightDimension::Weighted {
            return Err(StrategyError::Unsupported(
                "weight-dimension 'W' (weighted) is declared but not implemented".to_string(),
            ));
        }
        Ok(ThreeDimensionalScorer {
            ensemble,
            evidence,
            class_dimension,
        })
    }

    /// Per-label certainty evidence `1 - |predicted_bit - confidence|`;
    /// both evidence modes collapse to this formula.
    fn evidence_per_label(margins: &[f64]) -> Vec<f64> {
        margins
            .iter()
            .map(|&m| {
                let confidence = 1.0 / (1.0 + (-m).exp());
                let bit = if confidence >= 0.5 { 1.0 } else { 0.0 };
                1.0 - (bit - confidence).abs()
            })
            .collect()
    }
}

impl UtilityScorer for ThreeDimensionalScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.ensemble.train(pool)
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let margins = self
            .ensemble
            .margins(pool.unlabeled_instance(pos).features())?;
        let evidence = Self::evidence_per_label(&margins);
        if evidence.is_empty() {
            return Err(StrategyError::Numeric("no label evidence".to_string()));
        }
        let score = match self.class_dimension {
            ClassDimension::MinMax => match self.evidence {
                EvidenceDimension::Confidence => {
                    evidence.iter().cloned().fold(f64::INFINITY, f64::min)
                }
                EvidenceDimension::Score => {
                    evidence.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
                }
            },
            ClassDimension::Average => {
                evidence.iter().sum::<f64>() / evidence.len() as f64
            }
            ClassDimension::RoundRobin => unreachable!("rejected at construction"),
        };
        Ok(score)
    }

    fn maximal(&self) -> bool {
        // Direction derives from the evidence axis at configuration time:
        // confidence evidence is certainty, so lower is more informative.
        matches!(self.evidence, EvidenceDimension::Score)
    }

    fn name(&self) -> &str {
        "three-dimensional"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hinge_sum_matches_hand_computation() {
        // anchor 0: max(1 - 0.2, 0) + max(1 + 0.5, 0) = 0.8 + 1.5
        let margins = vec![0.2, -0.5];
        assert!((hinge_sum_anchored(&margins, 0) - 2.3).abs() < 1e-12);
        // anchor 1: max(1 + 0.2, 0) + max(1 - 0.5, 0) = 1.2 + 0.5
        assert!((hinge_sum_anchored(&margins, 1) - 1.7).abs() < 1e-12);
    }

    #[test]
    fn evidence_is_per_label_certainty() {
        let evidence = ThreeDimensionalScorer::evidence_per_label(&[0.0]);
        assert!((evidence[0] - 0.5).abs() < 1e-12);
        let confident = ThreeDimensionalScorer::evidence_per_label(&[4.0]);
        assert!(confident[0] > 0.95);
    }
}
