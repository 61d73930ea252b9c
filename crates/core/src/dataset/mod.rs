mod loader;

use crate::domain::product::Product;
use anyhow::{ensure, Context};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// The product table, in source order. Immutable after load; every accessor
/// is a plain scan, which is fine at the dataset sizes this serves.
#[derive(Debug, Clone)]
pub struct Dataset {
    products: Vec<Product>,
}

impl Dataset {
    pub fn new(products: Vec<Product>) -> anyhow::Result<Self> {
        ensure!(!products.is_empty(), "dataset must contain at least one product");

        let mut seen = BTreeSet::new();
        for product in &products {
            ensure!(
                seen.insert(product.product_id),
                "duplicate product_id {} in dataset",
                product.product_id
            );
        }

        Ok(Self { products })
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        Self::new(loader::read_products(reader)?)
    }

    pub fn from_csv_path(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open dataset {}", path.display()))?;
        Self::from_csv_reader(file)
            .with_context(|| format!("failed to load dataset {}", path.display()))
    }

    pub fn find_by_id(&self, product_id: u32) -> Option<&Product> {
        self.products.iter().find(|p| p.product_id == product_id)
    }

    /// Case-insensitive exact match on category. An empty result is how
    /// "category does not exist" surfaces to callers.
    pub fn find_by_category(&self, category: &str) -> Vec<&Product> {
        let needle = category.to_lowercase();
        self.products
            .iter()
            .filter(|p| p.category.to_lowercase() == needle)
            .collect()
    }

    /// Distinct category strings, sorted.
    pub fn categories(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.products.iter().map(|p| p.category.as_str()).collect();
        set.into_iter().map(|s| s.to_string()).collect()
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Maximum stock across the dataset. Recomputed per call; the dataset is
    /// immutable post-load so the result never changes.
    pub fn max_stock(&self) -> u32 {
        self.products.iter().map(|p| p.stock).max().unwrap_or(0)
    }
}
