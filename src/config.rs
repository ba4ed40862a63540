use serde::{Deserialize, Serialize};

use crate::embedding::lsh::SuperBitLsh;
use crate::error::{RerankError, Result};
use crate::scorer::{CalculationMode, ScoringModel, ScoringParams};

/// Shape of the SuperBit hasher. The dimension comes from the embedding
/// space at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LshConfig {
    pub stages: usize,
    pub buckets: usize,
    pub seed: u64,
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            stages: 2,
            buckets: 8,
            seed: 0,
        }
    }
}

/// Reranking run settings.
///
/// Every field is optional in JSON; missing ones take the defaults below.
/// ```
/// use translation_reranker::RerankConfig;
/// let config = RerankConfig::from_json_str(r#"{ "mu": 1000, "mode": "hash_all" }"#).unwrap();
/// assert_eq!(config.mu, 1000.0);
/// assert_eq!(config.alpha, 0.7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Dirichlet prior weight
    pub mu: f64,
    /// query generation mixing constant, must be positive
    pub alpha: f64,
    /// smoothing floor
    pub beta: f64,
    /// cosine cutoff for on-the-fly similarities, must be >= 0
    pub tolerance: f64,
    pub model: ScoringModel,
    pub mode: CalculationMode,
    /// document field to score
    pub field: String,
    pub lsh: LshConfig,
}

impl Default for RerankConfig {
    fn default() -> Self {
        let params = ScoringParams::default();
        Self {
            mu: params.mu,
            alpha: params.alpha,
            beta: params.beta,
            tolerance: params.tolerance,
            model: ScoringModel::TranslationDirichlet,
            mode: CalculationMode::Cosine,
            field: "raw".to_string(),
            lsh: LshConfig::default(),
        }
    }
}

impl RerankConfig {
    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RerankError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RerankError::InvalidConfig(msg));
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return invalid(format!("alpha must be positive, got {}", self.alpha));
        }
        if !(self.mu.is_finite() && self.mu >= 0.0) {
            return invalid(format!("mu must be >= 0, got {}", self.mu));
        }
        if !(self.beta.is_finite() && self.beta >= 0.0) {
            return invalid(format!("beta must be >= 0, got {}", self.beta));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return invalid(format!("tolerance must be >= 0, got {}", self.tolerance));
        }
        if self.lsh.stages == 0 || self.lsh.buckets == 0 {
            return invalid(format!(
                "lsh stages and buckets must be >= 1, got {} and {}",
                self.lsh.stages, self.lsh.buckets
            ));
        }
        if self.field.is_empty() {
            return invalid("field must not be empty".to_string());
        }
        Ok(())
    }

    pub fn scoring_params(&self) -> ScoringParams {
        ScoringParams {
            mu: self.mu,
            alpha: self.alpha,
            beta: self.beta,
            tolerance: self.tolerance,
        }
    }

    /// Hasher for vectors of `dimensions` components.
    pub fn build_lsh(&self, dimensions: usize) -> Result<SuperBitLsh> {
        SuperBitLsh::new(self.lsh.stages, self.lsh.buckets, dimensions, self.lsh.seed)
    }
}
