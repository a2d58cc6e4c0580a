pub mod metrics;
pub mod position;
