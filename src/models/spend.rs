use indexmap::IndexMap;
use serde::Serialize;

/// Aggregated spend for one business across all of its rows.
///
/// `total_spend` always equals the sum of `products`; the only way to build a
/// record is through [`SpendRecord::from_products`] or the CSV aggregator, both
/// of which derive the total from the breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendRecord {
    business_name: String,
    total_spend: f64,
    /// Product name -> spend, in first-seen order
    products: IndexMap<String, f64>,
}

impl SpendRecord {
    /// Build a record from a product breakdown. Repeated product names accumulate.
    pub fn from_products<I, S>(business_name: impl Into<String>, products: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut record = Self::empty(business_name.into());
        for (product, amount) in products {
            record.add_spend(product.into(), amount);
        }
        record
    }

    pub(crate) fn empty(business_name: String) -> Self {
        Self {
            business_name,
            total_spend: 0.0,
            products: IndexMap::new(),
        }
    }

    pub(crate) fn add_spend(&mut self, product: String, amount: f64) {
        *self.products.entry(product).or_insert(0.0) += amount;
        // Summed from the subtotals so the grouping matches the breakdown exactly
        self.total_spend = self.products.values().sum();
    }

    pub fn business_name(&self) -> &str {
        &self.business_name
    }

    pub fn total_spend(&self) -> f64 {
        self.total_spend
    }

    pub fn products(&self) -> &IndexMap<String, f64> {
        &self.products
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}
