use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInsights {
    pub total_products: usize,
    pub total_stock: u64,
    pub total_sales_7days: u64,
    pub total_sales_30days: u64,
    pub average_price: f64,
    pub top_demand_products: Vec<TopDemandProduct>,
    pub low_stock_alerts: Vec<LowStockAlert>,
    pub category_statistics: BTreeMap<String, CategoryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDemandProduct {
    pub product_id: u32,
    pub name: String,
    pub demand_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub product_id: u32,
    pub name: String,
    pub stock: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub product_count: usize,
    /// Mean base price across the category.
    pub base_price: f64,
    pub stock: u64,
    pub sales_7: u64,
}
