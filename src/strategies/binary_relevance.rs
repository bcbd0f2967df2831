//! Binary-relevance ensemble: one binary margin classifier per label,
//! trained on a shared per-label transformation of the labeled set. Feeds
//! every multi-label scorer in `multilabel`.
use rayon::prelude::*;

use crate::classifier::MarginClassifier;
use crate::error::StrategyError;
use crate::pool::{Instance, Pool};

/// The shared label transformation: maps a multi-label instance plus a
/// label index to a binary-labeled transformed instance. The ensemble and
/// the transformation are co-owned and agree on `num_labels` and
/// label-index ordering.
#[derive(Debug, Clone, Copy)]
pub struct LabelTransformation {
    num_labels: usize,
}

impl LabelTransformation {
    pub fn new(num_labels: usize) -> Self {
        LabelTransformation { num_labels }
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Transformed binary instance for one label: the feature vector
    /// unchanged, the target the instance's relevance bit for that label.
    pub fn transform<'a>(
        &self,
        instance: &'a Instance,
        label: usize,
    ) -> Result<(&'a [f64], bool), StrategyError> {
        if label >= self.num_labels {
            return Err(StrategyError::Configuration(format!(
                "label index {} out of range for {} labels",
                label, self.num_labels
            )));
        }
        let bits = instance.relevance().ok_or_else(|| {
            StrategyError::Model("instance carries no relevance vector".to_string())
        })?;
        if bits.len() != self.num_labels {
            return Err(StrategyError::Model(format!(
                "relevance vector length {} does not match {} labels",
                bits.len(),
                self.num_labels
            )));
        }
        Ok((instance.features(), bits[label]))
    }
}

/// An ordered sequence of exactly `num_labels` binary classifiers, each
/// trained on its label's transformation of the labeled set. Per-label
/// training runs in parallel and joins fully before scoring begins.
pub struct BinaryRelevanceEnsemble {
    /// Template cloned per label. `None` when the members were injected
    /// already trained by an external adapter, which then owns retraining.
    template: Option<Box<dyn MarginClassifier>>,
    members: Vec<Box<dyn MarginClassifier>>,
    transformation: LabelTransformation,
    trained_epoch: Option<u64>,
}

impl BinaryRelevanceEnsemble {
    pub fn new(
        template: Box<dyn MarginClassifier>,
        num_labels: usize,
    ) -> Result<Self, StrategyError> {
        if num_labels == 0 {
            return Err(StrategyError::Configuration(
                "a binary-relevance ensemble needs at least one label".to_string(),
            ));
        }
        Ok(BinaryRelevanceEnsemble {
            template: Some(template),
            members: Vec::new(),
            transformation: LabelTransformation::new(num_labels),
            trained_epoch: None,
        })
    }

    /// Assemble from already-trained per-label classifiers, one per label
    /// in label-index order. Training stays with the caller.
    pub fn from_trained(
        members: Vec<Box<dyn MarginClassifier>>,
    ) -> Result<Self, StrategyError> {
        if members.is_empty() {
            return Err(StrategyError::Configuration(
                "a binary-relevance ensemble needs at least one label".to_string(),
            ));
        }
        let num_labels = members.len();
        Ok(BinaryRelevanceEnsemble {
            template: None,
            members,
            transformation: LabelTransformation::new(num_labels),
            trained_epoch: None,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.transformation.num_labels()
    }

    pub fn transformation(&self) -> &LabelTransformation {
        &self.transformation
    }

    /// Retrain every per-label classifier on the current labeled set if the
    /// pool epoch moved.
    pub fn train(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        let template = match &self.template {
            Some(t) => t,
            // Externally trained members: the adapter owns their lifecycle.
            None => return Ok(()),
        };
        if self.trained_epoch == Some(pool.epoch()) {
            return Ok(());
        }
        if pool.num_labeled() == 0 {
            return Err(StrategyError::Model(
                "cannot train a binary-relevance ensemble on an empty labeled set".to_string(),
            ));
        }

        let x = pool.labeled_features();
        let transformation = self.transformation;

        // Collect per-label targets up front so a malformed instance fails
        // the whole training phase, not one worker.
        let mut per_label: Vec<Vec<bool>> = vec![Vec::with_capacity(pool.num_labeled()); transformation.num_labels()];
        for inst in pool.labeled_instances() {
            for (label, targets) in per_label.iter_mut().enumerate() {
                let (_, bit) = transformation.transform(inst, label)?;
                targets.push(bit);
            }
        }

        let members: Result<Vec<Box<dyn MarginClassifier>>, StrategyError> = per_label
            .into_par_iter()
            .map(|targets| {
                let mut model = template.boxed_clone();
                model.train_binary(&x, &targets)?;
                Ok(model)
            })
            .collect();

        self.members = members?;
        self.trained_epoch = Some(pool.epoch());
        log::debug!(
            "binary-relevance ensemble of {} labels retrained on {} instances (epoch {})",
            self.num_labels(),
            pool.num_labeled(),
            pool.epoch()
        );
        Ok(())
    }

    /// The per-label classifier for one label index.
    pub fn member(&self, label: usize) -> Result<&dyn MarginClassifier, StrategyError> {
        self.members
            .get(label)
            .map(|m| m.as_ref())
            .ok_or_else(|| {
                StrategyError::Model(format!(
                    "no trained classifier for label {} ({} trained)",
                    label,
                    self.members.len()
                ))
            })
    }

    /// Signed per-label margins for one feature vector, in label order.
    pub fn margins(&self, features: &[f64]) -> Result<Vec<f64>, StrategyError> {
        if self.members.is_empty() {
            return Err(StrategyError::Model(
                "binary-relevance ensemble has not been trained".to_string(),
            ));
        }
        self.members.iter().map(|m| m.margin(features)).collect()
    }

    /// Bipartition + margin magnitudes for one feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<(Vec<bool>, Vec<f64>), StrategyError> {
        let margins = self.margins(features)?;
        let bipartition = margins.iter().map(|&m| m >= 0.0).collect();
        let confidences = margins.iter().map(|&m| m.abs()).collect();
        Ok((bipartition, confidences))
    }
}
