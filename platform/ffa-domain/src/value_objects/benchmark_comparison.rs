use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkComparison {
    pub alpha: f64,
    pub beta: f64,
    pub correlation: f64,
    pub tracking_error: f64,
}
