use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub date: DateTime<Utc>,
    pub action: SignalAction,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Signal {
    pub fn hold(date: DateTime<Utc>, price: f64) -> Self {
        Self {
            date,
            action: SignalAction::Hold,
            price,
            reason: None,
        }
    }

    pub fn with_reason(
        date: DateTime<Utc>,
        action: SignalAction,
        price: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            date,
            action,
            price,
            reason: Some(reason.into()),
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.action != SignalAction::Hold
    }
}
