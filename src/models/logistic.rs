//! Built-in logistic-regression models.
//!
//! `LogisticModel` is a multinomial softmax classifier trained by batch
//! gradient descent; it serves as committee member, throwaway model for
//! error-reduction simulation, and the MMC cardinality meta-classifier.
//! `BinaryLogisticModel` is the per-label margin model of the
//! binary-relevance ensemble (margin = raw logit).
use ndarray::{Array1, Array2, Axis};

use crate::classifier::{Classifier, MarginClassifier};
use crate::error::StrategyError;

/// Hyper-parameters shared by both logistic variants.
#[derive(Debug, Clone, Copy)]
pub struct LogisticParams {
    pub learning_rate: f64,
    pub epochs: usize,
}

impl Default for LogisticParams {
    fn default() -> Self {
        LogisticParams {
            learning_rate: 0.5,
            epochs: 200,
        }
    }
}

/// Multinomial softmax regression.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    params: LogisticParams,
    /// (n_features, n_classes) weight matrix, present once trained.
    weights: Option<Array2<f64>>,
    bias: Option<Array1<f64>>,
}

impl LogisticModel {
    pub fn new(params: LogisticParams) -> Self {
        LogisticModel {
            params,
            weights: None,
            bias: None,
        }
    }

    fn softmax_row(logits: &mut [f64]) {
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for v in logits.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in logits.iter_mut() {
            *v /= sum;
        }
    }
}

impl Default for LogisticModel {
    fn default() -> Self {
        LogisticModel::new(LogisticParams::default())
    }
}

impl Classifier for LogisticModel {
    fn train(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        num_classes: usize,
    ) -> Result<(), StrategyError> {
        let n = x.nrows();
        let d = x.ncols();
        if n == 0 {
            return Err(StrategyError::Model(
                "cannot train on an empty labeled set".to_string(),
            ));
        }
        if y.len() != n {
            return Err(StrategyError::Model(format!(
                "targets length {} does not match {} rows",
                y.len(),
                n
            )));
        }
        if let Some(&c) = y.iter().find(|&&c| c >= num_classes) {
            return Err(StrategyError::Model(format!(
                "class index {} out of range for {} classes",
                c, num_classes
            )));
        }

        let mut w = Array2::<f64>::zeros((d, num_classes));
        let mut b = Array1::<f64>::zeros(num_classes);
        let inv_n = 1.0 / n as f64;

        for _ in 0..self.params.epochs {
            // P = softmax(XW + b), row by row
            let mut probs = x.dot(&w);
            for mut row in probs.axis_iter_mut(Axis(0)) {
                for (v, bv) in row.iter_mut().zip(b.iter()) {
                    *v += bv;
                }
                Self::softmax_row(row.as_slice_mut().expect("contiguous row"));
            }
            // residual = P - Y
            for (i, &cls) in y.iter().enumerate() {
                probs[(i, cls)] -= 1.0;
            }
            let grad_w = x.t().dot(&probs) * inv_n;
            let grad_b = probs.sum_axis(Axis(0)) * inv_n;
            w = w - grad_w * self.params.learning_rate;
            b = b - grad_b * self.params.learning_rate;
        }

        self.weights = Some(w);
        self.bias = Some(b);
        Ok(())
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, StrategyError> {
        let w = self
            .weights
            .as_ref()
            .ok_or_else(|| StrategyError::Model("model has not been trained".to_string()))?;
        let b = self.bias.as_ref().expect("bias set alongside weights");
        if features.len() != w.nrows() {
            return Err(StrategyError::Model(format!(
                "feature count {} does not match trained dimension {}",
                features.len(),
                w.nrows()
            )));
        }
        let x = Array1::from_vec(features.to_vec());
        let mut logits: Vec<f64> = x.dot(w).iter().zip(b.iter()).map(|(l, bv)| l + bv).collect();
        Self::softmax_row(&mut logits);
        Ok(logits)
    }

    fn boxed_clone(&self) -> Box<dyn Classifier> {
        Box::new(self.clone())
    }

    fn name(&self) -> &str {
        "logistic"
    }
}

/// Binary logistic regression exposing its raw logit as the margin.
#[derive(Debug, Clone)]
pub struct BinaryLogisticModel {
    params: LogisticParams,
    weights: Option<Array1<f64>>,
    bias: f64,
}

impl BinaryLogisticModel {
    pub fn new(params: LogisticParams) -> Self {
        BinaryLogisticModel {
            params,
            weights: None,
            bias: 0.0,
        }
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }
}

impl Default for BinaryLogisticModel {
    fn default() -> Self {
        BinaryLogisticModel::new(LogisticParams::default())
    }
}

impl MarginClassifier for BinaryLogisticModel {
    fn train_binary(&mut self, x: &Array2<f64>, y: &[bool]) -> Result<(), StrategyError> {
        let n = x.nrows();
        let d = x.ncols();
        if n == 0 {
            return Err(StrategyError::Model(
                "cannot train on an empty labeled set".to_string(),
            ));
        }
        if y.len() != n {
            return Err(StrategyError::Model(format!(
                "targets length {} does not match {} rows",
                y.len(),
                n
            )));
        }

        let mut w = Array1::<f64>::zeros(d);
        let mut b = 0.0f64;
        let inv_n = 1.0 / n as f64;

        for _ in 0..self.params.epochs {
            let z = x.dot(&w) + b;
            let residual: Array1<f64> = z
                .iter()
                .zip(y.iter())
                .map(|(&zi, &yi)| Self::sigmoid(zi) - if yi { 1.0 } else { 0.0 })
                .collect();
            let grad_w = x.t().dot(&residual) * inv_n;
            let grad_b = residual.sum() * inv_n;
            w = w - grad_w * self.params.learning_rate;
            b -= grad_b * self.params.learning_rate;
        }

        self.weights = Some(w);
        self.bias = b;
        Ok(())
    }

    fn margin(&self, features: &[f64]) -> Result<f64, StrategyError> {
        let w = self
            .weights
            .as_ref()
            .ok_or_else(|| StrategyError::Model("model has not been trained".to_string()))?;
        if features.len() != w.len() {
            return Err(StrategyError::Model(format!(
                "feature count {} does not match trained dimension {}",
                features.len(),
                w.len()
            )));
        }
        let x = Array1::from_vec(features.to_vec());
        Ok(x.dot(w) + self.bias)
    }

    fn boxed_clone(&self) -> Box<dyn MarginClassifier> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_model_separates_toy_classes() {
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![
                1.0, 0.0, //
                0.0, 1.0, //
                1.1, 0.1, //
                0.1, 0.9, //
                0.9, 0.0, //
                0.0, 1.2,
            ],
        )
        .unwrap();
        let y = vec![0usize, 1, 0, 1, 0, 1];

        let mut model = LogisticModel::default();
        model.train(&x, &y, 2).unwrap();

        let p0 = model.predict_proba(&[1.0, 0.0]).unwrap();
        let p1 = model.predict_proba(&[0.0, 1.0]).unwrap();
        assert!(p0[0] > 0.5, "class 0 side should favor class 0: {:?}", p0);
        assert!(p1[1] > 0.5, "class 1 side should favor class 1: {:?}", p1);
        assert!((p0.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn predict_before_train_is_an_error() {
        let model = LogisticModel::default();
        assert!(model.predict_proba(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn binary_margin_sign_tracks_relevance() {
        let x = Array2::from_shape_vec(
            (4, 1),
            vec![2.0, 1.5, -2.0, -1.5],
        )
        .unwrap();
        let y = vec![true, true, false, false];

        let mut model = BinaryLogisticModel::default();
        model.train_binary(&x, &y).unwrap();

        assert!(model.margin(&[2.0]).unwrap() > 0.0);
        assert!(model.margin(&[-2.0]).unwrap() < 0.0);
    }
}
