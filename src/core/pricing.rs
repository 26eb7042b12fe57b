//! Order totals and VAT rates.
//!
//! Totals are always computed from the full list of line items. Sums are kept
//! unrounded and each stored figure is rounded to cents once, at the end.

use crate::{config::catalog::TaxConfig, entities::order_item};
use std::collections::HashMap;

/// VAT rates by product category with a standard fallback rate.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxRates {
    standard_rate: f64,
    categories: HashMap<String, f64>,
}

impl TaxRates {
    /// Rates with only a standard rate.
    #[must_use]
    pub fn new(standard_rate: f64) -> Self {
        Self {
            standard_rate,
            categories: HashMap::new(),
        }
    }

    /// Adds a category-specific rate.
    #[must_use]
    pub fn with_category(mut self, category: &str, rate: f64) -> Self {
        self.categories.insert(normalize(category), rate);
        self
    }

    /// The standard rate.
    #[must_use]
    pub const fn standard_rate(&self) -> f64 {
        self.standard_rate
    }

    /// Rate for a product category, falling back to the standard rate.
    #[must_use]
    pub fn rate_for(&self, category: &str) -> f64 {
        self.categories
            .get(&normalize(category))
            .copied()
            .unwrap_or(self.standard_rate)
    }
}

impl Default for TaxRates {
    fn default() -> Self {
        Self::from(&TaxConfig::default())
    }
}

impl From<&TaxConfig> for TaxRates {
    fn from(config: &TaxConfig) -> Self {
        config
            .categories
            .iter()
            .fold(Self::new(config.standard_rate), |rates, (category, rate)| {
                rates.with_category(category, *rate)
            })
    }
}

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Stored totals of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderTotals {
    /// Sum of line totals, excluding VAT
    pub total_ht: f64,
    /// Sum of per-line VAT
    pub tva_amount: f64,
    /// Total including VAT
    pub total_ttc: f64,
}

/// Rounds a money amount to cents.
#[must_use]
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes an order's totals from its line items.
///
/// Items should be passed in a stable order (by id) so repeated computations sum
/// in the same sequence.
#[must_use]
pub fn compute_totals(items: &[order_item::Model]) -> OrderTotals {
    let (ht, vat) = items.iter().fold((0.0, 0.0), |(ht, vat), item| {
        let line = item.unit_price * f64::from(item.quantity);
        (ht + line, vat + line * item.vat_rate)
    });

    OrderTotals {
        total_ht: round_money(ht),
        tva_amount: round_money(vat),
        total_ttc: round_money(ht + vat),
    }
}
