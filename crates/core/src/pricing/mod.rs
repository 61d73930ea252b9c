pub mod features;
pub mod model;

use crate::dataset::Dataset;
use crate::domain::product::{DemandLevel, PricingResult, Product};
use anyhow::ensure;
use model::Predictor;

/// Clip bounds relative to the listed base price.
pub const PRICE_FLOOR_RATIO: f64 = 0.5;
pub const PRICE_CEIL_RATIO: f64 = 1.5;

const HIGH_DEMAND_THRESHOLD: f64 = 2.0;
const MEDIUM_DEMAND_THRESHOLD: f64 = 1.0;

/// Boundary values classify into the lower tier: exactly 2 is Medium,
/// exactly 1 is Low.
pub fn classify_demand(demand_ratio: f64) -> DemandLevel {
    if demand_ratio > HIGH_DEMAND_THRESHOLD {
        DemandLevel::High
    } else if demand_ratio > MEDIUM_DEMAND_THRESHOLD {
        DemandLevel::Medium
    } else {
        DemandLevel::Low
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clip the raw prediction to [0.5x, 1.5x] of base price, compute the
/// discount percent from the clipped price, classify demand.
pub fn bound_and_classify(
    raw_price: f64,
    base_price: f64,
    demand_ratio: f64,
    stock: u32,
) -> anyhow::Result<PricingResult> {
    ensure!(
        base_price.is_finite() && base_price > 0.0,
        "base_price must be positive (got {base_price})"
    );
    ensure!(
        raw_price.is_finite(),
        "predicted price must be finite (got {raw_price})"
    );

    let dynamic_price = raw_price.clamp(PRICE_FLOOR_RATIO * base_price, PRICE_CEIL_RATIO * base_price);
    let discount_percent = (dynamic_price - base_price) / base_price * 100.0;

    Ok(PricingResult {
        base_price,
        dynamic_price: round2(dynamic_price),
        discount_percent: round2(discount_percent),
        demand_level: classify_demand(demand_ratio),
        demand_ratio: round2(demand_ratio),
        stock,
    })
}

/// The full per-product pipeline: derive features, predict, bound and
/// classify.
pub fn price_product(
    dataset: &Dataset,
    predictor: &Predictor,
    product: &Product,
) -> anyhow::Result<PricingResult> {
    let features = features::derive(product, dataset.max_stock())?;
    let raw_price = predictor.raw_price(&features, product.base_price);
    bound_and_classify(raw_price, product.base_price, features.demand_ratio, product.stock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(base_price: f64, stock: u32, sales_7: u32, sales_30: u32, day: u32) -> Product {
        Product {
            product_id: 1,
            name: "Test".to_string(),
            category: "Dairy".to_string(),
            base_price,
            stock,
            sales_7,
            sales_30,
            day,
        }
    }

    #[test]
    fn clips_to_half_and_one_and_a_half_base_price() {
        let low = bound_and_classify(1.0, 10.0, 0.0, 5).unwrap();
        assert_eq!(low.dynamic_price, 5.0);
        assert_eq!(low.discount_percent, -50.0);

        let high = bound_and_classify(100.0, 10.0, 0.0, 5).unwrap();
        assert_eq!(high.dynamic_price, 15.0);
        assert_eq!(high.discount_percent, 50.0);

        let inside = bound_and_classify(12.0, 10.0, 0.0, 5).unwrap();
        assert_eq!(inside.dynamic_price, 12.0);
        assert_eq!(inside.discount_percent, 20.0);
    }

    #[test]
    fn classification_thresholds_put_boundaries_in_the_lower_tier() {
        assert_eq!(classify_demand(2.01), DemandLevel::High);
        assert_eq!(classify_demand(2.0), DemandLevel::Medium);
        assert_eq!(classify_demand(1.5), DemandLevel::Medium);
        assert_eq!(classify_demand(1.0), DemandLevel::Low);
        assert_eq!(classify_demand(0.0), DemandLevel::Low);
    }

    #[test]
    fn rejects_non_positive_base_price() {
        assert!(bound_and_classify(10.0, 0.0, 1.0, 5).is_err());
        assert!(bound_and_classify(10.0, -1.0, 1.0, 5).is_err());
    }

    #[test]
    fn rejects_non_finite_raw_price() {
        assert!(bound_and_classify(f64::NAN, 10.0, 1.0, 5).is_err());
        assert!(bound_and_classify(f64::INFINITY, 10.0, 1.0, 5).is_err());
    }

    #[test]
    fn rounds_outputs_to_two_decimals() {
        let result = bound_and_classify(10.333, 10.0, 1.23456, 5).unwrap();
        assert_eq!(result.dynamic_price, 10.33);
        assert_eq!(result.discount_percent, 3.33);
        assert_eq!(result.demand_ratio, 1.23);
    }

    #[test]
    fn boundary_demand_ratio_of_two_is_medium_not_high() {
        // base_price=10, stock=9, sales_7=20: demand_ratio = 20/10 = 2.0
        let p = product(10.0, 9, 20, 20, 3);
        let dataset = Dataset::new(vec![p.clone()]).unwrap();
        let result = price_product(&dataset, &Predictor::Fallback, &p).unwrap();

        assert_eq!(result.demand_ratio, 2.0);
        assert_eq!(result.demand_level, DemandLevel::Medium);
    }

    #[test]
    fn fallback_pipeline_matches_hand_computation() {
        // demand_ratio = 20/10 = 2, inventory_level = 9/9 = 1:
        // raw = 10 * (1 + 0.6 - 0.2) = 14, inside the [5, 15] clip window.
        let p = product(10.0, 9, 20, 20, 3);
        let dataset = Dataset::new(vec![p.clone()]).unwrap();
        let result = price_product(&dataset, &Predictor::Fallback, &p).unwrap();

        assert_eq!(result.base_price, 10.0);
        assert_eq!(result.dynamic_price, 14.0);
        assert_eq!(result.discount_percent, 40.0);
        assert_eq!(result.stock, 9);
    }

    #[test]
    fn clip_invariant_holds_across_a_spread_of_products() {
        let products = vec![
            product(2.49, 120, 85, 340, 1),
            product(1.59, 200, 180, 700, 3),
            product(4.19, 5, 75, 290, 1),
            product(9.99, 55, 18, 80, 6),
            product(10.0, 0, 0, 0, 2),
        ];
        let products: Vec<Product> = products
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.product_id = i as u32 + 1;
                p
            })
            .collect();
        let dataset = Dataset::new(products).unwrap();

        for p in dataset.all() {
            let result = price_product(&dataset, &Predictor::Fallback, p).unwrap();
            // The 2-decimal output rounding can move a clipped price by up to
            // half a cent past the exact bound.
            assert!(
                result.dynamic_price >= PRICE_FLOOR_RATIO * p.base_price - 0.005
                    && result.dynamic_price <= PRICE_CEIL_RATIO * p.base_price + 0.005,
                "product_id={} priced outside bounds: {}",
                p.product_id,
                result.dynamic_price
            );
            assert!(matches!(
                result.demand_level,
                DemandLevel::High | DemandLevel::Medium | DemandLevel::Low
            ));
        }
    }
}
