use serde::{Deserialize, Serialize};

/// One row of the product table. Loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: u32,
    pub name: String,
    pub category: String,
    pub base_price: f64,
    pub stock: u32,
    pub sales_7: u32,
    pub sales_30: u32,
    pub day: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandLevel {
    High,
    Medium,
    Low,
}

/// Per-request pricing output. `dynamic_price`, `discount_percent` and
/// `demand_ratio` are rounded to 2 decimals; classification happens on the
/// unrounded ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub base_price: f64,
    pub dynamic_price: f64,
    pub discount_percent: f64,
    pub demand_level: DemandLevel,
    pub demand_ratio: f64,
    pub stock: u32,
}
