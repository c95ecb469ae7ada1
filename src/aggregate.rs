//! Aggregates derived from a mirror snapshot.
//!
//! Everything here is a pure function of the item slice it is given; nothing
//! is cached between calls.

use crate::types::ItemRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Slice colours for chart series, cycled when there are more labels.
pub const PALETTE: [&str; 6] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40",
];

/// Summed quantity of one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: u64,
}

/// Quantity of one item, for single-series charts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantity {
    pub name: String,
    pub quantity: u64,
}

/// Group items by category in first-seen order and sum their quantities.
///
/// Categories whose items all have quantity zero are kept with a zero total.
pub fn by_category(items: &[ItemRecord]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for item in items {
        match slots.get(item.category.as_str()) {
            Some(&slot) => {
                let entry = &mut totals[slot];
                entry.total = entry.total.saturating_add(item.quantity);
            }
            None => {
                slots.insert(item.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: item.category.clone(),
                    total: item.quantity,
                });
            }
        }
    }

    totals
}

/// Name and quantity of every item, in mirror order.
pub fn by_item(items: &[ItemRecord]) -> Vec<ItemQuantity> {
    items
        .iter()
        .map(|item| ItemQuantity {
            name: item.name.clone(),
            quantity: item.quantity,
        })
        .collect()
}

/// Sum of all quantities.
pub fn total_quantity(items: &[ItemRecord]) -> u64 {
    items
        .iter()
        .fold(0u64, |acc, item| acc.saturating_add(item.quantity))
}

/// Labels, values and colours ready for a chart widget.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
    pub colors: Vec<String>,
}

impl ChartSeries {
    /// Series of category totals.
    pub fn from_categories(totals: &[CategoryTotal]) -> Self {
        Self::build(totals.iter().map(|t| (t.category.clone(), t.total)))
    }

    /// Series of per-item quantities.
    pub fn from_items(items: &[ItemQuantity]) -> Self {
        Self::build(items.iter().map(|i| (i.name.clone(), i.quantity)))
    }

    fn build(points: impl Iterator<Item = (String, u64)>) -> Self {
        let mut series = ChartSeries::default();
        for (i, (label, value)) in points.enumerate() {
            series.labels.push(label);
            series.data.push(value);
            series.colors.push(PALETTE[i % PALETTE.len()].to_string());
        }
        series
    }
}
