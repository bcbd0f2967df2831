//! Collaborator contracts between the query strategies and the learning
//! models they consult. The strategies only ever see these traits; concrete
//! models live in `models`.
use ndarray::Array2;
use rayon::prelude::*;

use crate::error::StrategyError;

/// A single-label probabilistic classifier.
///
/// `boxed_clone` must produce an independent copy (trained state included)
/// so the error-reduction simulator can retrain throwaway models without
/// touching the original.
pub trait Classifier: Send + Sync {
    /// Fit on a labeled feature matrix. `y[i]` is the class index of row `i`.
    fn train(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        num_classes: usize,
    ) -> Result<(), StrategyError>;

    /// Class-probability distribution for one instance. Sums to 1.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, StrategyError>;

    /// Independent deep copy (trained state included).
    fn boxed_clone(&self) -> Box<dyn Classifier>;

    /// Optional human readable name for the model.
    fn name(&self) -> &str {
        "classifier"
    }
}

/// A binary classifier exposing an SVM-style signed margin: sign is the
/// predicted side, magnitude is confidence. Used per label by the
/// binary-relevance ensemble.
pub trait MarginClassifier: Send + Sync {
    /// Fit on a binary-labeled matrix. `y[i]` is the relevance bit of row `i`.
    fn train_binary(&mut self, x: &Array2<f64>, y: &[bool]) -> Result<(), StrategyError>;

    /// Signed margin for one instance; positive means "relevant".
    fn margin(&self, features: &[f64]) -> Result<f64, StrategyError>;

    fn boxed_clone(&self) -> Box<dyn MarginClassifier>;
}

/// Evaluate class distributions for every row of `x` in parallel.
///
/// The model snapshot is read-only, so rows are embarrassingly parallel;
/// rayon joins all tasks before returning, partial results never escape.
pub fn batch_distributions(
    model: &dyn Classifier,
    x: &Array2<f64>,
) -> Result<Vec<Vec<f64>>, StrategyError> {
    (0..x.nrows())
        .into_par_iter()
        .map(|row| {
            let features: Vec<f64> = x.row(row).to_vec();
            model.predict_proba(&features)
        })
        .collect()
}
