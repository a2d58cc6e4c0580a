use crate::value_objects::trade::Direction;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub direction: Direction,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
}

/// Single-instrument position: at most one open lot at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long {
        entry_date: DateTime<Utc>,
        entry_price: f64,
    },
    Short {
        entry_date: DateTime<Utc>,
        entry_price: f64,
    },
}

impl PositionState {
    pub fn open(direction: Direction, entry_date: DateTime<Utc>, entry_price: f64) -> Self {
        match direction {
            Direction::Long => PositionState::Long {
                entry_date,
                entry_price,
            },
            Direction::Short => PositionState::Short {
                entry_date,
                entry_price,
            },
        }
    }

    pub fn open_position(&self) -> Option<OpenPosition> {
        match *self {
            PositionState::Flat => None,
            PositionState::Long {
                entry_date,
                entry_price,
            } => Some(OpenPosition {
                direction: Direction::Long,
                entry_date,
                entry_price,
            }),
            PositionState::Short {
                entry_date,
                entry_price,
            } => Some(OpenPosition {
                direction: Direction::Short,
                entry_date,
                entry_price,
            }),
        }
    }
}
