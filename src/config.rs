use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// Central configuration for query strategies.
///
/// Every strategy reads the subset of keys it documents and ignores the
/// rest. Invalid enum values fail fast at parse time with a descriptive
/// error, never at scoring time.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StrategyConfig {
    /// Number of instances selected per active-learning iteration.
    pub batch_size: usize,
    /// Seed for committee bootstraps and any randomized state.
    pub seed: u64,
    /// `importance-density`: the β exponent of the density-weighted blend.
    pub importance_density: f64,
    /// `number-classifiers`: committee size for disagreement scorers.
    pub number_classifiers: usize,
    /// `epsilon`: fixed-point tolerance for variance reduction. When unset
    /// the engine derives `1 / ((|U| + |L|) * 100)` from the pool.
    pub epsilon: Option<f64>,
    /// `factor-regularization`: the λ ridge added to the Fisher matrix.
    pub factor_regularization: f64,
    /// `max-epsilon-iteration`: cap on fixed-point iterations.
    pub max_epsilon_iteration: usize,
    /// `matrix-file`: where to keep the pairwise distance matrix.
    pub matrix_storage: MatrixStorage,
    /// `evidence-dimension`: C (confidence) or S (score).
    pub evidence_dimension: EvidenceDimension,
    /// `class-dimension`: M (min/max), A (average) or R (round-robin).
    pub class_dimension: ClassDimension,
    /// `weight-dimension`: N (none) or W (weighted).
    pub weight_dimension: WeightDimension,
    /// Loss accumulated by the error-reduction simulator.
    pub loss_mode: LossMode,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            batch_size: 1,
            seed: 42,
            importance_density: 1.0,
            number_classifiers: 5,
            epsilon: None,
            factor_regularization: 1000.0,
            max_epsilon_iteration: 10,
            matrix_storage: MatrixStorage::InMemory,
            evidence_dimension: EvidenceDimension::Confidence,
            class_dimension: ClassDimension::MinMax,
            weight_dimension: WeightDimension::None,
            loss_mode: LossMode::ZeroOne,
        }
    }
}

/// Storage backing for the pairwise distance matrix.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatrixStorage {
    InMemory,
    FileBacked(PathBuf),
}

/// Evidence axis of the 3-Dimensional multi-label strategy.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceDimension {
    /// 'C': per-label confidence evidence; smaller aggregate is better.
    Confidence,
    /// 'S': per-label score evidence; larger aggregate is better.
    Score,
}

impl FromStr for EvidenceDimension {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" | "c" => Ok(EvidenceDimension::Confidence),
            "S" | "s" => Ok(EvidenceDimension::Score),
            _ => Err(StrategyError::Configuration(format!(
                "unknown evidence-dimension '{}', expected 'C' or 'S'",
                s
            ))),
        }
    }
}

/// Class-aggregation axis of the 3-Dimensional multi-label strategy.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDimension {
    /// 'M': min of per-label evidence in confidence mode, max in score mode.
    MinMax,
    /// 'A': average of per-label evidence.
    Average,
    /// 'R': declared but not implemented; rejected at construction.
    RoundRobin,
}

impl FromStr for ClassDimension {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" | "m" => Ok(ClassDimension::MinMax),
            "A" | "a" => Ok(ClassDimension::Average),
            "R" | "r" => Ok(ClassDimension::RoundRobin),
            _ => Err(StrategyError::Configuration(format!(
                "unknown class-dimension '{}', expected 'M', 'A' or 'R'",
                s
            ))),
        }
    }
}

/// Weighting axis of the 3-Dimensional multi-label strategy.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightDimension {
    /// 'N': no weighting (default).
    None,
    /// 'W': declared but not implemented; rejected at construction.
    Weighted,
}

impl FromStr for WeightDimension {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" | "n" => Ok(WeightDimension::None),
            "W" | "w" => Ok(WeightDimension::Weighted),
            _ => Err(StrategyError::Configuration(format!(
                "unknown weight-dimension '{}', expected 'N' or 'W'",
                s
            ))),
        }
    }
}

/// Loss accumulated by the expected-error-reduction simulator.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LossMode {
    /// Expected misclassification risk, `1 - max(p)` per remaining instance.
    ZeroOne,
    /// Expected posterior entropy, `Σ p·log2(p)` per remaining instance.
    Log,
}

impl FromStr for LossMode {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zero_one" | "zero-one" | "01" => Ok(LossMode::ZeroOne),
            "log" => Ok(LossMode::Log),
            _ => Err(StrategyError::Configuration(format!(
                "unknown loss mode: {}. Expected 'zero_one' or 'log'",
                s
            ))),
        }
    }
}

impl StrategyConfig {
    pub fn new(batch_size: usize) -> Self {
        StrategyConfig {
            batch_size,
            ..StrategyConfig::default()
        }
    }
}
