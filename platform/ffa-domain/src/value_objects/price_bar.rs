use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: DateTime<Utc>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl PriceBar {
    pub fn new(date: DateTime<Utc>, price: f64) -> Self {
        Self {
            date,
            price,
            volume: None,
        }
    }
}

/// Date-ascending copy of `prices`. Bars sharing a date keep their input order.
pub fn sorted_by_date(prices: &[PriceBar]) -> Vec<PriceBar> {
    let mut sorted = prices.to_vec();
    sorted.sort_by_key(|bar| bar.date);
    sorted
}
