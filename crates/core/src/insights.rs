use crate::dataset::Dataset;
use crate::domain::insights::{CategoryStats, LowStockAlert, MarketInsights, TopDemandProduct};
use crate::pricing::round2;
use std::collections::BTreeMap;

pub const TOP_DEMAND_LIMIT: usize = 10;
pub const LOW_STOCK_THRESHOLD: u32 = 10;

fn demand_ratio(sales_7: u32, stock: u32) -> f64 {
    sales_7 as f64 / (stock as f64 + 1.0)
}

/// Whole-dataset rollups, recomputed fresh on every call.
pub fn market_insights(dataset: &Dataset) -> MarketInsights {
    let products = dataset.all();

    let total_products = products.len();
    let total_stock: u64 = products.iter().map(|p| p.stock as u64).sum();
    let total_sales_7days: u64 = products.iter().map(|p| p.sales_7 as u64).sum();
    let total_sales_30days: u64 = products.iter().map(|p| p.sales_30 as u64).sum();
    let average_price =
        round2(products.iter().map(|p| p.base_price).sum::<f64>() / total_products as f64);

    // Stable sort keeps source order for equal ratios.
    let mut ranked: Vec<(f64, &crate::domain::product::Product)> = products
        .iter()
        .map(|p| (demand_ratio(p.sales_7, p.stock), p))
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let top_demand_products = ranked
        .iter()
        .take(TOP_DEMAND_LIMIT)
        .map(|(ratio, p)| TopDemandProduct {
            product_id: p.product_id,
            name: p.name.clone(),
            demand_ratio: *ratio,
        })
        .collect();

    let low_stock_alerts = products
        .iter()
        .filter(|p| p.stock < LOW_STOCK_THRESHOLD)
        .map(|p| LowStockAlert {
            product_id: p.product_id,
            name: p.name.clone(),
            stock: p.stock,
        })
        .collect();

    struct Acc {
        count: usize,
        price_sum: f64,
        stock: u64,
        sales_7: u64,
    }

    let mut by_category: BTreeMap<String, Acc> = BTreeMap::new();
    for p in products {
        let acc = by_category.entry(p.category.clone()).or_insert(Acc {
            count: 0,
            price_sum: 0.0,
            stock: 0,
            sales_7: 0,
        });
        acc.count += 1;
        acc.price_sum += p.base_price;
        acc.stock += p.stock as u64;
        acc.sales_7 += p.sales_7 as u64;
    }

    let category_statistics = by_category
        .into_iter()
        .map(|(category, acc)| {
            (
                category,
                CategoryStats {
                    product_count: acc.count,
                    base_price: acc.price_sum / acc.count as f64,
                    stock: acc.stock,
                    sales_7: acc.sales_7,
                },
            )
        })
        .collect();

    MarketInsights {
        total_products,
        total_stock,
        total_sales_7days,
        total_sales_30days,
        average_price,
        top_demand_products,
        low_stock_alerts,
        category_statistics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::Product;

    fn product(id: u32, category: &str, base_price: f64, stock: u32, sales_7: u32) -> Product {
        Product {
            product_id: id,
            name: format!("Product {id}"),
            category: category.to_string(),
            base_price,
            stock,
            sales_7,
            sales_30: sales_7 * 4,
            day: 1,
        }
    }

    #[test]
    fn totals_and_average_price() {
        let dataset = Dataset::new(vec![
            product(1, "Dairy", 2.0, 10, 5),
            product(2, "Dairy", 4.0, 20, 15),
            product(3, "Bakery", 3.0, 30, 25),
        ])
        .unwrap();

        let insights = market_insights(&dataset);
        assert_eq!(insights.total_products, 3);
        assert_eq!(insights.total_stock, 60);
        assert_eq!(insights.total_sales_7days, 45);
        assert_eq!(insights.total_sales_30days, 180);
        assert_eq!(insights.average_price, 3.0);
    }

    #[test]
    fn top_demand_is_sorted_descending_with_stable_ties() {
        // ids 2 and 3 tie exactly (10/(4+1) == 20/(9+1) == 2.0); source order
        // must decide between them.
        let dataset = Dataset::new(vec![
            product(1, "Dairy", 2.0, 9, 5),
            product(2, "Dairy", 2.0, 4, 10),
            product(3, "Bakery", 2.0, 9, 20),
            product(4, "Bakery", 2.0, 0, 9),
        ])
        .unwrap();

        let insights = market_insights(&dataset);
        let ids: Vec<u32> = insights
            .top_demand_products
            .iter()
            .map(|t| t.product_id)
            .collect();
        // 4: 9/1 = 9.0; 2: 2.0; 3: 2.0; 1: 0.5
        assert_eq!(ids, vec![4, 2, 3, 1]);

        let ratios: Vec<f64> = insights
            .top_demand_products
            .iter()
            .map(|t| t.demand_ratio)
            .collect();
        assert!(ratios.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn top_demand_is_capped_at_ten() {
        let products: Vec<Product> = (1..=15)
            .map(|id| product(id, "Pantry", 1.0, 1, id))
            .collect();
        let dataset = Dataset::new(products).unwrap();

        let insights = market_insights(&dataset);
        assert_eq!(insights.top_demand_products.len(), TOP_DEMAND_LIMIT);
        // Highest sales_7 first.
        assert_eq!(insights.top_demand_products[0].product_id, 15);
    }

    #[test]
    fn low_stock_alerts_keep_source_order() {
        let dataset = Dataset::new(vec![
            product(1, "Dairy", 2.0, 3, 5),
            product(2, "Dairy", 2.0, 50, 5),
            product(3, "Bakery", 2.0, 9, 5),
            product(4, "Bakery", 2.0, 10, 5),
        ])
        .unwrap();

        let insights = market_insights(&dataset);
        let ids: Vec<u32> = insights.low_stock_alerts.iter().map(|a| a.product_id).collect();
        // stock 10 is not an alert; the threshold is strict.
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn category_statistics_aggregate_per_category() {
        let dataset = Dataset::new(vec![
            product(1, "Dairy", 2.0, 10, 5),
            product(2, "Dairy", 4.0, 20, 15),
            product(3, "Bakery", 3.0, 30, 25),
        ])
        .unwrap();

        let insights = market_insights(&dataset);
        assert_eq!(insights.category_statistics.len(), 2);

        let dairy = &insights.category_statistics["Dairy"];
        assert_eq!(dairy.product_count, 2);
        assert!((dairy.base_price - 3.0).abs() < 1e-12);
        assert_eq!(dairy.stock, 30);
        assert_eq!(dairy.sales_7, 20);

        // BTreeMap keys come out sorted.
        let keys: Vec<&String> = insights.category_statistics.keys().collect();
        assert_eq!(keys, vec!["Bakery", "Dairy"]);
    }
}
