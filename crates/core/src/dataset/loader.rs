use crate::domain::product::Product;
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::io::Read;

/// Raw CSV row. Columns:
///   product_id, name, category, base_price, stock, sales_7, sales_30, day
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProductRecord {
    pub product_id: u32,
    pub name: String,
    pub category: String,
    pub base_price: f64,
    pub stock: u32,
    pub sales_7: u32,
    pub sales_30: u32,
    pub day: u32,
}

impl ProductRecord {
    pub(crate) fn validate_into_product(self) -> anyhow::Result<Product> {
        let name = self.name.trim().to_string();
        ensure!(
            !name.is_empty(),
            "name must be non-empty (product_id={})",
            self.product_id
        );

        let category = self.category.trim().to_string();
        ensure!(
            !category.is_empty(),
            "category must be non-empty (product_id={})",
            self.product_id
        );

        ensure!(
            self.base_price.is_finite() && self.base_price > 0.0,
            "base_price must be positive (product_id={}, got {})",
            self.product_id,
            self.base_price
        );

        Ok(Product {
            product_id: self.product_id,
            name,
            category,
            base_price: self.base_price,
            stock: self.stock,
            sales_7: self.sales_7,
            sales_30: self.sales_30,
            day: self.day,
        })
    }
}

pub(crate) fn read_products<R: Read>(reader: R) -> anyhow::Result<Vec<Product>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut products = Vec::new();
    for (idx, row) in csv_reader.deserialize::<ProductRecord>().enumerate() {
        // Line 1 is the header.
        let record = row.with_context(|| format!("csv parse error at line {}", idx + 2))?;
        products.push(record.validate_into_product()?);
    }

    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
product_id,name,category,base_price,stock,sales_7,sales_30,day
1,Whole Milk 1L,Dairy,2.49,120,85,340,1
2,Bananas 1kg,Produce,1.59,200,180,700,3
3,Eggs 12pk,Dairy,4.19,5,75,290,1
";

    #[test]
    fn parses_sample_rows_in_source_order() {
        let products = read_products(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].product_id, 1);
        assert_eq!(products[0].name, "Whole Milk 1L");
        assert_eq!(products[1].category, "Produce");
        assert!((products[2].base_price - 4.19).abs() < 1e-9);
        assert_eq!(products[2].stock, 5);
        assert_eq!(products[2].sales_7, 75);
        assert_eq!(products[2].sales_30, 290);
        assert_eq!(products[2].day, 1);
    }

    #[test]
    fn rejects_non_positive_base_price() {
        let csv_data = "\
product_id,name,category,base_price,stock,sales_7,sales_30,day
1,Free Sample,Dairy,0.0,10,1,2,1
";
        let err = read_products(csv_data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("base_price must be positive"));
    }

    #[test]
    fn rejects_blank_name() {
        let csv_data = "\
product_id,name,category,base_price,stock,sales_7,sales_30,day
7,  ,Dairy,1.99,10,1,2,1
";
        let err = read_products(csv_data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("name must be non-empty"));
    }

    #[test]
    fn malformed_row_reports_line_number() {
        let csv_data = "\
product_id,name,category,base_price,stock,sales_7,sales_30,day
1,Milk,Dairy,2.49,120,85,340,1
2,Bread,Bakery,not-a-number,30,55,210,5
";
        let err = read_products(csv_data.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
    }
}
