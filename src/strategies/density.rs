//! Density-weighted sampling: a decorator blending any base scorer's
//! uncertainty with how representative an instance is of the unlabeled
//! pool, via a precomputed pairwise-distance cache.
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

use crate::config::MatrixStorage;
use crate::error::StrategyError;
use crate::pool::Pool;
use crate::scorer::UtilityScorer;

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Pairwise distances over the current unlabeled set, computed once per
/// iteration. Logically an n×n symmetric matrix (held in memory or written
/// to a backing file), but the consumed view is the accumulated row sum per
/// instance. Rebuilt lazily whenever the pool epoch changes; `destroy`
/// releases memory and removes the backing file at the end of a run.
pub struct DistanceCache {
    storage: MatrixStorage,
    accumulated: Vec<f64>,
    matrix: Vec<f64>,
    built_epoch: Option<u64>,
}

impl DistanceCache {
    pub fn new(storage: MatrixStorage) -> Self {
        DistanceCache {
            storage,
            accumulated: Vec::new(),
            matrix: Vec::new(),
            built_epoch: None,
        }
    }

    /// True when the cache matches the pool's current epoch.
    pub fn is_current(&self, pool: &Pool) -> bool {
        self.built_epoch == Some(pool.epoch())
    }

    /// Rebuild if the pool epoch moved since the last build; otherwise a
    /// no-op, so scoring twice in one iteration reuses the same matrix.
    pub fn ensure(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        if self.is_current(pool) {
            return Ok(());
        }
        self.build(pool)
    }

    fn build(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        let n = pool.num_unlabeled();
        let mut matrix = vec![0.0f64; n * n];
        let mut accumulated = vec![0.0f64; n];

        for i in 0..n {
            let fi = pool.unlabeled_instance(i).features();
            for j in (i + 1)..n {
                let d = euclidean(fi, pool.unlabeled_instance(j).features());
                matrix[i * n + j] = d;
                matrix[j * n + i] = d;
                accumulated[i] += d;
                accumulated[j] += d;
            }
        }

        match &self.storage {
            MatrixStorage::InMemory => {
                self.matrix = matrix;
            }
            MatrixStorage::FileBacked(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                for v in &matrix {
                    writer.write_all(&v.to_le_bytes())?;
                }
                writer.flush()?;
                self.matrix = Vec::new();
            }
        }

        self.accumulated = accumulated;
        self.built_epoch = Some(pool.epoch());
        log::debug!(
            "distance cache rebuilt for {} unlabeled instances (epoch {})",
            n,
            pool.epoch()
        );
        Ok(())
    }

    /// Sum of distances from the instance at unlabeled position `pos` to
    /// every other unlabeled instance.
    pub fn accumulated_distance(&self, pos: usize) -> Result<f64, StrategyError> {
        self.accumulated.get(pos).copied().ok_or_else(|| {
            StrategyError::Scoring {
                index: pos,
                reason: format!(
                    "position outside the distance cache ({} cached)",
                    self.accumulated.len()
                ),
            }
        })
    }

    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    /// One matrix row, read back from memory or the backing file.
    pub fn row(&self, pos: usize) -> Result<Vec<f64>, StrategyError> {
        let n = self.accumulated.len();
        if pos >= n {
            return Err(StrategyError::Numeric(format!(
                "row {} out of bounds for {} cached instances",
                pos, n
            )));
        }
        match &self.storage {
            MatrixStorage::InMemory => Ok(self.matrix[pos * n..(pos + 1) * n].to_vec()),
            MatrixStorage::FileBacked(path) => {
                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start((pos * n * 8) as u64))?;
                let mut buf = vec![0u8; n * 8];
                file.read_exact(&mut buf)?;
                Ok(buf
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes(c.try_into().expect("8-byte chunk")))
                    .collect())
            }
        }
    }

    /// Explicit teardown: drop the in-memory matrix and remove the backing
    /// file. Called when the active-learning run ends.
    pub fn destroy(&mut self) -> Result<(), StrategyError> {
        self.matrix = Vec::new();
        self.accumulated = Vec::new();
        self.built_epoch = None;
        if let MatrixStorage::FileBacked(path) = &self.storage {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Decorator over any base scorer implementing the canonical
/// uncertainty × representativeness trade-off.
///
/// Scoring: take the base score (zero short-circuits — density cannot
/// rescue zero relevance), invert it when the base is maximal so that
/// smaller-is-better dominates uniformly, then multiply by
/// `(accumulated_distance / |U|)^β`. The wrapper itself is non-maximal.
pub struct DensityWeightedScorer {
    base: Box<dyn UtilityScorer>,
    beta: f64,
    cache: DistanceCache,
}

impl DensityWeightedScorer {
    pub fn new(base: Box<dyn UtilityScorer>, beta: f64, storage: MatrixStorage) -> Self {
        DensityWeightedScorer {
            base,
            beta,
            cache: DistanceCache::new(storage),
        }
    }

    /// The β blend exponent (`importance-density`).
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Release the distance cache at the end of the run.
    pub fn destroy(&mut self) -> Result<(), StrategyError> {
        self.cache.destroy()
    }
}

impl UtilityScorer for DensityWeightedScorer {
    fn setup(&mut self, pool: &Pool) -> Result<(), StrategyError> {
        self.base.setup(pool)?;
        self.cache.ensure(pool)
    }

    fn score(&mut self, pool: &Pool, pos: usize) -> Result<f64, StrategyError> {
        if !self.cache.is_current(pool) {
            return Err(StrategyError::Numeric(
                "distance cache is stale for the current pool epoch".to_string(),
            ));
        }
        let mut base = self.base.score(pool, pos)?;
        if base == 0.0 {
            return Ok(0.0);
        }
        if self.base.maximal() {
            base = 1.0 / base;
        }
        let n = pool.num_unlabeled() as f64;
        let density = (self.cache.accumulated_distance(pos)? / n).powf(self.beta);
        Ok(base * density)
    }

    fn maximal(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "density-weighted"
    }
}
