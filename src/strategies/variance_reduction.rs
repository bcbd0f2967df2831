//! Variance reduction: Fisher-information optimal experimental design.
//!
//! Once per iteration the engine builds the regularized Fisher information
//! matrix of the unlabeled pool, eigen-decomposes it, and refines a
//! probability weight vector `q` by fixed-point iteration; `q_i` is the
//! utility of instance `i`. The fixed point has no general convergence
//! guarantee, so the iteration cap is the real safety net.
use nalgebra::{DMatrix, DVector};

use crate::classifier::Classifier;
use crate::error::StrategyError;
use crate::pool::Pool;
use crate::scorer::UtilityScorer;

/// Transient per-iteration state: rebuilt whenever the pool epoch moves,
/// never persisted across runs.
struct FisherState {
    epoch: u64,
    q: Vec<f64>,
    iterations: usize,
}

pub struct VarianceReductionScorer {
    model: Box<dyn Classifier>,
    /// λ ridge added to the Fisher matrix; larger favors numerical
    /// stability over sensitivity.
    factor_regularization: f64,
    /// Fixed-point tolerance; when unset, `1 / ((|U| + |L|) * 100)`.
    epsilon: Option<f64>,
    max_epsilon_iteration: usize,
    state: Option<FisherState>,
}

impl VarianceReductionScorer {
    pub fn new(
        model: Box<dyn Classifier>,
        factor_regularization: f64,
        epsilon: Option<f64>,
        max_epsilon_iteration: usize,
    ) -> Result<Self, StrategyError> {
        if factor_regularization <= 0.0 {
            return Err(StrategyError::Configuration(format!(
                "factor-regularization must be positive, got {}",
                factor_regularization
            )));
        }
        if max_epsilon_iteration == 0 {
            return Err(StrategyError::Configuration(
                "max-epsilon-iteration must be at least 1".to_string(),
            ));
        }
        if let Some(eps) = epsilon {
            if eps <= 0.0 {
                return Err(StrategyError::Configuration(format!(
                    "epsilon must be positive, got {}",
                    eps
                )));
            }
        }
        Ok(VarianceReductionScorer {
            model,
            factor_regularization,
            epsilon,
            max_epsilon_iteration,
            state: None,
        })
    }

    /// Number of fixed-point iterations the last rebuild took.
    pub fn last_iterations(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.iterations)
    }

    fn rebuild(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        let n = pool.num_unlabeled();
        if n == 0 {
            return Err(StrategyError::Numeric(
                "variance reduction needs a non-empty unlabeled pool".to_string(),
            ));
        }
        let d = pool.unlabeled_instance(0).num_features();

        // Bernoulli-variance proxy per instance from the current model's
        // max-class probability.
        let mut variance = Vec::with_capacity(n);
        for pos in 0..n {
            let p = self
                .model
                .predict_proba(pool.unlabeled_instance(pos).features())?;
            let pi = p
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            variance.push(pi * (1.0 - pi));
        }

        // F = Σ_i π_i(1-π_i)·x_i·x_iᵗ + λI
        let mut fisher = DMatrix::<f64>::zeros(d, d);
        for pos in 0..n {
            let x = pool.unlabeled_instance(pos).features();
            let s = variance[pos];
            for a in 0..d {
                for b in a..d {
                    let v = s * x[a] * x[b];
                    fisher[(a, b)] += v;
                    if a != b {
                        fisher[(b, a)] += v;
                    }
                }
            }
        }
        for a in 0..d {
            fisher[(a, a)] += self.factor_regularization;
        }

        let eigen = fisher.symmetric_eigen();
        let eigenvalues: &DVector<f64> = &eigen.eigenvalues;

        // Project every instance onto the eigenbasis once.
        let mut projections = vec![0.0f64; n * d];
        for pos in 0..n {
            let x = pool.unlabeled_instance(pos).features();
            for j in 0..d {
                let col = eigen.eigenvectors.column(j);
                let mut dot = 0.0;
                for a in 0..d {
                    dot += x[a] * col[a];
                }
                projections[pos * d + j] = dot;
            }
        }

        let epsilon = self.epsilon.unwrap_or_else(|| {
            1.0 / ((pool.num_unlabeled() + pool.num_labeled()) as f64 * 100.0)
        });

        // Fixed-point refinement of the design weights.
        let mut q = vec![1.0 / n as f64; n];
        let mut iterations = 0;
        for iter in 0..self.max_epsilon_iteration {
            iterations = iter + 1;

            // f_j = Σ_i q_i·s_i·(x_iᵗv_j)²
            let mut f = vec![0.0f64; d];
            for pos in 0..n {
                let qs = q[pos] * variance[pos];
                for j in 0..d {
                    let proj = projections[pos * d + j];
                    f[j] += qs * proj * proj;
                }
            }

            // q_i ∝ q_i²·s_i·Σ_j (λ_j·(x_iᵗv_j))²/f_j², zero f_j skipped.
            let mut next = vec![0.0f64; n];
            for pos in 0..n {
                let mut sum = 0.0;
                for j in 0..d {
                    if f[j] == 0.0 {
                        continue;
                    }
                    let term = eigenvalues[j] * projections[pos * d + j];
                    sum += (term * term) / (f[j] * f[j]);
                }
                next[pos] = q[pos] * q[pos] * variance[pos] * sum;
            }

            let total: f64 = next.iter().sum();
            if total == 0.0 {
                log::warn!(
                    "variance reduction: degenerate weight update at iteration {}, keeping previous weights",
                    iterations
                );
                break;
            }
            for v in next.iter_mut() {
                *v /= total;
            }

            let delta = q
                .iter()
                .zip(next.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            q = next;
            if delta <= epsilon {
                break;
            }
        }

        log::debug!(
            "variance reduction converged in {} iteration(s) over {} unlabeled (epoch {})",
            iterations,
            n,
            pool.epoch()
        );
        self.state = Some(FisherState {
            epoch: pool.epoch(),
            q,
            iterations,
        });
        Ok(())
    }
}

impl UtilityScorer for VarianceReductionScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        let x = pool.labeled_features();
        let y = pool.labeled_targets()?;
        self.model.train(&x, &y, pool.num_classes())?;
        let stale = self
            .state
            .as_ref()
            .map_or(true, |s| s.epoch != pool.epoch());
        if stale {
            self.rebuild(pool)?;
        }
        Ok(())
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let state = self.state.as_ref().ok_or_else(|| {
            StrategyError::Model("variance reduction state has not been built".to_string())
        })?;
        if state.epoch != pool.epoch() {
            return Err(StrategyError::Numeric(
                "fisher state is stale for the current pool epoch".to_string(),
            ));
        }
        state.q.get(pos).copied().ok_or_else(|| {
            StrategyError::Scoring {
                index: pos,
                reason: "position outside the weight vector".to_string(),
            }
        })
    }

    fn maximal(&self) -> bool {
        // Larger design weight = more informative.
        true
    }

    fn name(&self) -> &str {
        "variance-reduction"
    }
}
