//! Data model for the active-learning pool.
//!
//! A `Pool` owns every instance and partitions them into disjoint labeled
//! and unlabeled index sets. Moving an instance from unlabeled to labeled
//! is the only membership mutation the loop performs; every mutation bumps
//! an epoch counter that iteration-scoped caches key their rebuilds on.
use ndarray::Array2;

use crate::error::StrategyError;

/// Label slot of an instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// No label yet: the instance sits in the unlabeled set.
    Unlabeled,
    /// Single-label class index in `0..num_classes`.
    Nominal(usize),
    /// Multi-label relevance vector of length `num_labels`.
    Relevance(Vec<bool>),
}

/// A feature vector plus its label slot. Feature content is immutable
/// during a scoring pass; labels are rewritten only inside simulation
/// clones, never on the original pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    features: Vec<f64>,
    label: Label,
}

impl Instance {
    pub fn new(features: Vec<f64>, label: Label) -> Self {
        Instance { features, label }
    }

    pub fn unlabeled(features: Vec<f64>) -> Self {
        Instance {
            features,
            label: Label::Unlabeled,
        }
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Class index for single-label instances.
    pub fn nominal_class(&self) -> Option<usize> {
        match self.label {
            Label::Nominal(c) => Some(c),
            _ => None,
        }
    }

    /// Relevance vector for multi-label instances.
    pub fn relevance(&self) -> Option<&[bool]> {
        match &self.label {
            Label::Relevance(bits) => Some(bits.as_slice()),
            _ => None,
        }
    }
}

/// An ordered, index-addressable collection of instances partitioned into
/// labeled and unlabeled sets. Relative index order within each set is
/// stable for the duration of one scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    instances: Vec<Instance>,
    labeled: Vec<usize>,
    unlabeled: Vec<usize>,
    num_classes: usize,
    num_labels: usize,
    epoch: u64,
}

impl Pool {
    /// Build a pool from instances: those carrying a label start in the
    /// labeled set, the rest in the unlabeled set.
    pub fn new(instances: Vec<Instance>, num_classes: usize, num_labels: usize) -> Self {
        let mut labeled = Vec::new();
        let mut unlabeled = Vec::new();
        for (i, inst) in instances.iter().enumerate() {
            match inst.label {
                Label::Unlabeled => unlabeled.push(i),
                _ => labeled.push(i),
            }
        }
        Pool {
            instances,
            labeled,
            unlabeled,
            num_classes,
            num_labels,
            epoch: 0,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn num_labeled(&self) -> usize {
        self.labeled.len()
    }

    pub fn num_unlabeled(&self) -> usize {
        self.unlabeled.len()
    }

    /// Epoch counter, incremented on every membership mutation. Caches
    /// store the epoch they were built for and rebuild lazily.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn instance(&self, global_idx: usize) -> &Instance {
        &self.instances[global_idx]
    }

    /// Instance at a position of the unlabeled set (positions are valid
    /// for the current epoch only).
    pub fn unlabeled_instance(&self, pos: usize) -> &Instance {
        &self.instances[self.unlabeled[pos]]
    }

    pub fn labeled_instance(&self, pos: usize) -> &Instance {
        &self.instances[self.labeled[pos]]
    }

    pub fn unlabeled_indices(&self) -> &[usize] {
        &self.unlabeled
    }

    pub fn labeled_indices(&self) -> &[usize] {
        &self.labeled
    }

    pub fn labeled_instances(&self) -> impl Iterator<Item = &Instance> {
        self.labeled.iter().map(move |&i| &self.instances[i])
    }

    pub fn unlabeled_instances(&self) -> impl Iterator<Item = &Instance> {
        self.unlabeled.iter().map(move |&i| &self.instances[i])
    }

    /// Feature matrix of the labeled set, shape (n_labeled, n_features).
    pub fn labeled_features(&self) -> Array2<f64> {
        self.feature_matrix(&self.labeled)
    }

    /// Feature matrix of the unlabeled set, shape (n_unlabeled, n_features).
    pub fn unlabeled_features(&self) -> Array2<f64> {
        self.feature_matrix(&self.unlabeled)
    }

    fn feature_matrix(&self, indices: &[usize]) -> Array2<f64> {
        let ncols = self
            .instances
            .first()
            .map(|inst| inst.num_features())
            .unwrap_or(0);
        let mut data = Vec::with_capacity(indices.len() * ncols);
        for &i in indices {
            data.extend_from_slice(self.instances[i].features());
        }
        Array2::from_shape_vec((indices.len(), ncols), data)
            .expect("row-aligned instances share a feature count")
    }

    /// Class targets of the labeled set, aligned with `labeled_features`.
    pub fn labeled_targets(&self) -> Result<Vec<usize>, StrategyError> {
        self.labeled
            .iter()
            .map(|&i| {
                self.instances[i].nominal_class().ok_or_else(|| {
                    StrategyError::Model(format!(
                        "labeled instance {} carries no nominal class",
                        i
                    ))
                })
            })
            .collect()
    }

    /// Move the instance at unlabeled position `pos` into the labeled set
    /// with the oracle's label. This is the only membership mutation and is
    /// performed by the driver strictly after all scoring completes.
    pub fn move_to_labeled(&mut self, pos: usize, label: Label) -> Result<usize, StrategyError> {
        if pos >= self.unlabeled.len() {
            return Err(StrategyError::Configuration(format!(
                "unlabeled position {} out of bounds ({} unlabeled)",
                pos,
                self.unlabeled.len()
            )));
        }
        if matches!(label, Label::Unlabeled) {
            return Err(StrategyError::Configuration(
                "cannot move an instance to the labeled set without a label".to_string(),
            ));
        }
        let global = self.unlabeled.remove(pos);
        self.instances[global].label = label;
        self.labeled.push(global);
        self.epoch += 1;
        log::trace!(
            "pool epoch {}: instance {} moved to labeled ({} labeled / {} unlabeled)",
            self.epoch,
            global,
            self.labeled.len(),
            self.unlabeled.len()
        );
        Ok(global)
    }
}
