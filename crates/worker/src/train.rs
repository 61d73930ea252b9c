use anyhow::{ensure, Context};
use chrono::Utc;
use std::path::Path;

use shelfprice_core::dataset::Dataset;
use shelfprice_core::pricing::features::{self, FEATURE_DIM, FEATURE_NAMES};
use shelfprice_core::pricing::model::{PriceModel, ScalerStats};

pub const DEFAULT_EPOCHS: usize = 2000;

const LEARNING_RATE: f64 = 0.05;
const REGULARIZATION: f64 = 0.001;

// Every fifth row is held out, so repeated runs on the same dataset produce
// identical artifacts.
const HOLDOUT_STRIDE: usize = 5;

const WEIGHT_DIM: usize = PriceModel::WEIGHT_DIM;

#[derive(Debug)]
pub struct TrainedArtifacts {
    pub scaler: ScalerStats,
    pub model: PriceModel,
}

pub fn train(dataset: &Dataset, epochs: usize) -> anyhow::Result<TrainedArtifacts> {
    ensure!(epochs > 0, "epochs must be positive");

    let max_stock = dataset.max_stock();
    let mut rows: Vec<[f64; FEATURE_DIM]> = Vec::with_capacity(dataset.len());
    let mut targets: Vec<f64> = Vec::with_capacity(dataset.len());
    for product in dataset.all() {
        rows.push(features::derive(product, max_stock)?.to_array());
        targets.push(product.base_price);
    }

    let mut train_rows = Vec::new();
    let mut train_y = Vec::new();
    let mut holdout_rows = Vec::new();
    let mut holdout_y = Vec::new();
    for (idx, (row, y)) in rows.iter().zip(&targets).enumerate() {
        if idx % HOLDOUT_STRIDE == 0 {
            holdout_rows.push(*row);
            holdout_y.push(*y);
        } else {
            train_rows.push(*row);
            train_y.push(*y);
        }
    }
    ensure!(
        !train_rows.is_empty(),
        "dataset too small to train (no rows left after holdout)"
    );

    // Scaler statistics come from the training partition only; the holdout is
    // scaled with the same statistics, as inference will be.
    let scaler = ScalerStats::fit(&train_rows)?;
    let scaled_train: Vec<[f64; FEATURE_DIM]> =
        train_rows.iter().map(|r| scaler.transform(r)).collect();
    let scaled_holdout: Vec<[f64; FEATURE_DIM]> =
        holdout_rows.iter().map(|r| scaler.transform(r)).collect();

    let weights = fit_linear(&scaled_train, &train_y, epochs);

    let model = PriceModel {
        weights: weights.to_vec(),
        trained_at: Utc::now(),
        training_rows: scaled_train.len(),
        train_r2: r_squared(&weights, &scaled_train, &train_y),
        holdout_r2: r_squared(&weights, &scaled_holdout, &holdout_y),
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
    };
    model.validate()?;

    Ok(TrainedArtifacts { scaler, model })
}

pub fn write_artifacts(
    trained: &TrainedArtifacts,
    model_path: &Path,
    scaler_path: &Path,
) -> anyhow::Result<()> {
    for path in [model_path, scaler_path] {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
    }

    let model_json =
        serde_json::to_string_pretty(&trained.model).context("serialize model artifact failed")?;
    std::fs::write(model_path, model_json)
        .with_context(|| format!("failed to write model artifact {}", model_path.display()))?;

    let scaler_json = serde_json::to_string_pretty(&trained.scaler)
        .context("serialize scaler artifact failed")?;
    std::fs::write(scaler_path, scaler_json)
        .with_context(|| format!("failed to write scaler artifact {}", scaler_path.display()))?;

    Ok(())
}

fn predict_row(weights: &[f64; WEIGHT_DIM], row: &[f64; FEATURE_DIM]) -> f64 {
    let mut out = weights[0];
    for (w, v) in weights[1..].iter().zip(row) {
        out += w * v;
    }
    out
}

/// Batch gradient descent with L2 regularization. The bias stays
/// unregularized; zero initialization keeps runs deterministic.
fn fit_linear(rows: &[[f64; FEATURE_DIM]], targets: &[f64], epochs: usize) -> [f64; WEIGHT_DIM] {
    let n = rows.len() as f64;
    let mut weights = [0.0; WEIGHT_DIM];

    for _ in 0..epochs {
        let mut gradients = [0.0; WEIGHT_DIM];
        for (row, y) in rows.iter().zip(targets) {
            let error = predict_row(&weights, row) - y;
            gradients[0] += error;
            for (g, v) in gradients[1..].iter_mut().zip(row) {
                *g += error * v;
            }
        }
        for g in &mut gradients {
            *g /= n;
        }
        for (g, w) in gradients[1..].iter_mut().zip(&weights[1..]) {
            *g += REGULARIZATION * w;
        }
        for (w, g) in weights.iter_mut().zip(&gradients) {
            *w -= LEARNING_RATE * g;
        }
    }

    weights
}

fn r_squared(weights: &[f64; WEIGHT_DIM], rows: &[[f64; FEATURE_DIM]], targets: &[f64]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }

    let n = targets.len() as f64;
    let mean = targets.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (row, y) in rows.iter().zip(targets) {
        let err = predict_row(weights, row) - y;
        ss_res += err * err;
        let dev = y - mean;
        ss_tot += dev * dev;
    }

    // A constant target has no variance to explain.
    if ss_tot == 0.0 {
        return if ss_res < 1e-12 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}
