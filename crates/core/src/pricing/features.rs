use crate::domain::product::Product;
use anyhow::ensure;
use serde::{Deserialize, Serialize};

pub const FEATURE_DIM: usize = 6;

/// Feature order shared by the trainer and the loaded model artifacts.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "demand_ratio",
    "inventory_level",
    "sales_trend",
    "popularity",
    "scarcity",
    "day",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub demand_ratio: f64,
    pub inventory_level: f64,
    pub sales_trend: f64,
    pub popularity: f64,
    pub scarcity: f64,
    pub day: f64,
}

impl FeatureVector {
    pub fn to_array(self) -> [f64; FEATURE_DIM] {
        [
            self.demand_ratio,
            self.inventory_level,
            self.sales_trend,
            self.popularity,
            self.scarcity,
            self.day,
        ]
    }
}

/// Derive the per-product feature vector. Pure; the `+1` denominators keep
/// every formula total for stock >= 0 and sales >= 0.
///
/// `max_stock == 0` would make `inventory_level` 0/0, so an all-zero-stock
/// dataset is rejected here instead of letting NaN flow into the predictor.
pub fn derive(product: &Product, max_stock: u32) -> anyhow::Result<FeatureVector> {
    ensure!(
        max_stock > 0,
        "max stock is zero; inventory_level is undefined for an all-zero-stock dataset"
    );

    let stock = product.stock as f64;
    let sales_7 = product.sales_7 as f64;
    let sales_30 = product.sales_30 as f64;

    Ok(FeatureVector {
        demand_ratio: sales_7 / (stock + 1.0),
        inventory_level: stock / max_stock as f64,
        sales_trend: sales_30 / (sales_7 + 1.0),
        popularity: sales_30 / (product.base_price * stock + 1.0),
        scarcity: 1.0 / (stock + 1.0),
        day: product.day as f64,
    })
}
