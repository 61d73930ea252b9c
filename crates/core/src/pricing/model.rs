use super::features::{FeatureVector, FEATURE_DIM, FEATURE_NAMES};
use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fallback formula coefficients: demand pressure pushes the price up,
/// a full shelf pushes it down.
pub const FALLBACK_DEMAND_WEIGHT: f64 = 0.3;
pub const FALLBACK_INVENTORY_WEIGHT: f64 = 0.2;

/// Per-feature standardization statistics fitted at training time and
/// re-applied verbatim at inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerStats {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl ScalerStats {
    pub fn fit(rows: &[[f64; FEATURE_DIM]]) -> anyhow::Result<Self> {
        ensure!(!rows.is_empty(), "cannot fit scaler on an empty feature matrix");
        let n = rows.len() as f64;

        let mut mean = vec![0.0; FEATURE_DIM];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        // Population standard deviation; a constant feature gets scale 1.0 so
        // the transform stays total.
        let mut scale = vec![0.0; FEATURE_DIM];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                let d = v - mean[j];
                scale[j] += d * d;
            }
        }
        for s in &mut scale {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self {
            mean,
            scale,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn transform(&self, features: &[f64; FEATURE_DIM]) -> [f64; FEATURE_DIM] {
        let mut out = [0.0; FEATURE_DIM];
        for (j, v) in features.iter().enumerate() {
            out[j] = (v - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.mean.len() == FEATURE_DIM,
            "scaler mean has {} entries, expected {FEATURE_DIM}",
            self.mean.len()
        );
        ensure!(
            self.scale.len() == FEATURE_DIM,
            "scaler scale has {} entries, expected {FEATURE_DIM}",
            self.scale.len()
        );
        ensure!(
            self.mean.iter().all(|v| v.is_finite()),
            "scaler mean entries must be finite"
        );
        ensure!(
            self.scale.iter().all(|v| v.is_finite() && *v != 0.0),
            "scaler scale entries must be finite and non-zero"
        );
        Ok(())
    }
}

/// Linear price regressor trained offline by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModel {
    /// Bias first, then one weight per scaled feature.
    pub weights: Vec<f64>,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub train_r2: f64,
    pub holdout_r2: f64,
    pub feature_names: Vec<String>,
}

impl PriceModel {
    pub const WEIGHT_DIM: usize = FEATURE_DIM + 1;

    pub fn predict_scaled(&self, scaled: &[f64; FEATURE_DIM]) -> f64 {
        let mut price = self.weights[0];
        for (w, v) in self.weights[1..].iter().zip(scaled) {
            price += w * v;
        }
        price
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.weights.len() == Self::WEIGHT_DIM,
            "model has {} weights, expected {}",
            self.weights.len(),
            Self::WEIGHT_DIM
        );
        ensure!(
            self.weights.iter().all(|w| w.is_finite()),
            "model weights must be finite"
        );
        Ok(())
    }
}

/// The scale-then-regress artifact pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub scaler: ScalerStats,
    pub model: PriceModel,
}

impl LoadedModel {
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(&features.to_array());
        self.model.predict_scaled(&scaled)
    }
}

/// Price prediction strategy, fixed once at startup for the life of the
/// process. Artifacts are never retried or hot-reloaded.
#[derive(Debug, Clone)]
pub enum Predictor {
    Model(LoadedModel),
    Fallback,
}

impl Predictor {
    /// Artifact load failure is non-fatal: the process keeps serving with the
    /// closed-form fallback.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Self {
        match Self::try_load(model_path, scaler_path) {
            Ok(loaded) => {
                tracing::info!(
                    model_path = %model_path.display(),
                    trained_at = %loaded.model.trained_at,
                    training_rows = loaded.model.training_rows,
                    "pricing model loaded"
                );
                Predictor::Model(loaded)
            }
            Err(err) => {
                tracing::warn!(
                    model_path = %model_path.display(),
                    scaler_path = %scaler_path.display(),
                    error = %format!("{err:#}"),
                    "pricing model unavailable; using fallback formula"
                );
                Predictor::Fallback
            }
        }
    }

    fn try_load(model_path: &Path, scaler_path: &Path) -> anyhow::Result<LoadedModel> {
        let model_json = std::fs::read_to_string(model_path)
            .with_context(|| format!("failed to read model artifact {}", model_path.display()))?;
        let model: PriceModel =
            serde_json::from_str(&model_json).context("failed to parse model artifact")?;
        model.validate()?;

        let scaler_json = std::fs::read_to_string(scaler_path)
            .with_context(|| format!("failed to read scaler artifact {}", scaler_path.display()))?;
        let scaler: ScalerStats =
            serde_json::from_str(&scaler_json).context("failed to parse scaler artifact")?;
        scaler.validate()?;

        Ok(LoadedModel { scaler, model })
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Predictor::Model(_) => "model",
            Predictor::Fallback => "fallback",
        }
    }

    /// Unclipped price estimate for a product's derived features.
    pub fn raw_price(&self, features: &FeatureVector, base_price: f64) -> f64 {
        match self {
            Predictor::Model(loaded) => loaded.predict(features),
            Predictor::Fallback => {
                base_price
                    * (1.0 + FALLBACK_DEMAND_WEIGHT * features.demand_ratio
                        - FALLBACK_INVENTORY_WEIGHT * features.inventory_level)
            }
        }
    }

    /// Model-only prediction for caller-supplied features. `None` in fallback
    /// mode; the API surfaces that as service-unavailable.
    pub fn model_price(&self, features: &FeatureVector) -> Option<f64> {
        match self {
            Predictor::Model(loaded) => Some(loaded.predict(features)),
            Predictor::Fallback => None,
        }
    }
}
