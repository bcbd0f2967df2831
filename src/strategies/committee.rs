//! Query-by-committee: an ensemble of independently trained classifiers
//! whose disagreement over an instance is the informativeness signal.
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::classifier::Classifier;
use crate::error::StrategyError;
use crate::pool::Pool;
use crate::scorer::UtilityScorer;

/// Floor applied to consensus probabilities before division in the
/// KL-divergence measure; keeps a near-zero consensus from producing NaN.
const MIN_PROB: f64 = 1e-10;

/// Wraps an ensemble of `number_classifiers` classifiers trained once per
/// iteration on bootstrap resamples of the labeled set. Read-only during
/// scoring; consumers see per-member and consensus distributions plus hard
/// vote counts.
pub struct CommitteeAggregator {
    template: Box<dyn Classifier>,
    members: Vec<Box<dyn Classifier>>,
    number_classifiers: usize,
    seed: u64,
    trained_epoch: Option<u64>,
}

impl CommitteeAggregator {
    pub fn new(
        template: Box<dyn Classifier>,
        number_classifiers: usize,
        seed: u64,
    ) -> Result<Self, StrategyError> {
        if number_classifiers < 2 {
            return Err(StrategyError::Configuration(format!(
                "a committee needs at least 2 classifiers, got {}",
                number_classifiers
            )));
        }
        Ok(CommitteeAggregator {
            template,
            members: Vec::new(),
            number_classifiers,
            seed,
            trained_epoch: None,
        })
    }

    pub fn size(&self) -> usize {
        self.number_classifiers
    }

    /// Train all members on the current labeled set. Members train in
    /// parallel; the join completes before this returns. Each member draws
    /// its own seeded stratified bootstrap (resampling within each class,
    /// so no member ever sees a single-class sample) and the whole
    /// committee is reproducible for a fixed seed.
    pub fn train(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        if self.trained_epoch == Some(pool.epoch()) {
            return Ok(());
        }
        let x = pool.labeled_features();
        let y = pool.labeled_targets()?;
        let n = x.nrows();
        if n == 0 {
            return Err(StrategyError::Model(
                "cannot train a committee on an empty labeled set".to_string(),
            ));
        }
        let num_classes = pool.num_classes();
        let seed = self.seed;
        let template = &self.template;

        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); num_classes];
        for (i, &cls) in y.iter().enumerate() {
            if cls >= num_classes {
                return Err(StrategyError::Model(format!(
                    "class index {} out of range for {} classes",
                    cls, num_classes
                )));
            }
            by_class[cls].push(i);
        }

        let members: Result<Vec<Box<dyn Classifier>>, StrategyError> = (0..self
            .number_classifiers)
            .into_par_iter()
            .map(|m| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(m as u64));
                let mut picks = Vec::with_capacity(n);
                for class_rows in &by_class {
                    for _ in 0..class_rows.len() {
                        picks.push(class_rows[rng.gen_range(0..class_rows.len())]);
                    }
                }
                let mut data = Vec::with_capacity(picks.len() * x.ncols());
                let mut targets = Vec::with_capacity(picks.len());
                for &i in &picks {
                    data.extend_from_slice(x.row(i).to_slice().expect("contiguous row"));
                    targets.push(y[i]);
                }
                let bx = Array2::from_shape_vec((picks.len(), x.ncols()), data)
                    .expect("bootstrap rows share the feature count");
                let mut model = template.boxed_clone();
                model.train(&bx, &targets, num_classes)?;
                Ok(model)
            })
            .collect();

        self.members = members?;
        self.trained_epoch = Some(pool.epoch());
        log::debug!(
            "committee of {} retrained on {} labeled instances (epoch {})",
            self.number_classifiers,
            n,
            pool.epoch()
        );
        Ok(())
    }

    /// Per-member class distributions for one instance.
    pub fn member_distributions(&self, features: &[f64]) -> Result<Vec<Vec<f64>>, StrategyError> {
        if self.members.is_empty() {
            return Err(StrategyError::Model(
                "committee has not been trained".to_string(),
            ));
        }
        self.members
            .iter()
            .map(|m| m.predict_proba(features))
            .collect()
    }

    /// Consensus distribution: mean of the member distributions.
    pub fn consensus(distributions: &[Vec<f64>]) -> Vec<f64> {
        let num_classes = distributions.first().map_or(0, |d| d.len());
        let mut mean = vec![0.0; num_classes];
        for dist in distributions {
            for (m, &p) in mean.iter_mut().zip(dist.iter()) {
                *m += p;
            }
        }
        let n = distributions.len() as f64;
        for m in mean.iter_mut() {
            *m /= n;
        }
        mean
    }

    /// Hard vote counts per class: each member votes its arg-max class.
    pub fn votes(distributions: &[Vec<f64>]) -> Vec<usize> {
        let num_classes = distributions.first().map_or(0, |d| d.len());
        let mut votes = vec![0usize; num_classes];
        for dist in distributions {
            let best = dist
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i);
            if let Some(c) = best {
                votes[c] += 1;
            }
        }
        votes
    }
}

/// Vote entropy: entropy (natural log) of the hard-vote fractions.
pub struct VoteEntropyScorer {
    committee: CommitteeAggregator,
}

impl VoteEntropyScorer {
    pub fn new(committee: CommitteeAggregator) -> Self {
        VoteEntropyScorer { committee }
    }
}

impl UtilityScorer for VoteEntropyScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.committee.train(pool)
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let dists = self
            .committee
            .member_distributions(pool.unlabeled_instance(pos).features())?;
        let votes = CommitteeAggregator::votes(&dists);
        let n = self.committee.size() as f64;
        let score = votes
            .iter()
            .filter(|&&v| v > 0)
            .map(|&v| {
                let f = v as f64 / n;
                -f * f.ln()
            })
            .sum();
        Ok(score)
    }

    fn maximal(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "vote-entropy"
    }
}

/// Soft query-by-committee: mean KL divergence (bits) of each member's
/// distribution from the consensus.
pub struct KlDivergenceScorer {
    committee: CommitteeAggregator,
}

impl KlDivergenceScorer {
    pub fn new(committee: CommitteeAggregator) -> Self {
        KlDivergenceScorer { committee }
    }
}

impl UtilityScorer for KlDivergenceScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.committee.train(pool)
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        let dists = self
            .committee
            .member_distributions(pool.unlabeled_instance(pos).features())?;
        let consensus = CommitteeAggregator::consensus(&dists);
        let mut total = 0.0;
        for dist in &dists {
            for (&p, &q) in dist.iter().zip(consensus.iter()) {
                if p > 0.0 {
                    total += p * (p / q.max(MIN_PROB)).log2();
                }
            }
        }
        Ok(total / dists.len() as f64)
    }

    fn maximal(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "kl-divergence"
    }
}
