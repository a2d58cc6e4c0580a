use thiserror::Error;

/// Contract violations raised by generators and the executor.
///
/// Degenerate market data (empty series, flat prices, zero variance) is never
/// an error; only caller mistakes land here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("{name} must be > 0 (got {value})")]
    InvalidWindow { name: &'static str, value: usize },

    #[error("z_threshold must be finite and > 0 (got {0})")]
    InvalidThreshold(f64),

    #[error("{name} must be within 1..=12 (got {value})")]
    InvalidMonth { name: &'static str, value: u32 },

    #[error("lot_size must be finite and > 0 (got {0})")]
    InvalidLotSize(f64),
}

pub(crate) fn ensure_window(name: &'static str, value: usize) -> Result<usize, BacktestError> {
    if value == 0 {
        return Err(BacktestError::InvalidWindow { name, value });
    }
    Ok(value)
}

pub(crate) fn ensure_month(name: &'static str, value: u32) -> Result<u32, BacktestError> {
    if !(1..=12).contains(&value) {
        return Err(BacktestError::InvalidMonth { name, value });
    }
    Ok(value)
}
