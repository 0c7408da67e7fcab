//! Fine (denda) calculation

use chrono::NaiveDate;

use crate::{
    config::CirculationConfig,
    models::{
        enums::{FineKind, ReturnCondition},
        loan::Fine,
    },
};

/// Fine tariff, read from the `circulation` config section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinePolicy {
    pub late_fee_per_day: i64,
    pub damaged_fee: i64,
    pub lost_fee: i64,
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self::from(&CirculationConfig::default())
    }
}

impl From<&CirculationConfig> for FinePolicy {
    fn from(config: &CirculationConfig) -> Self {
        Self {
            late_fee_per_day: config.late_fee_per_day,
            damaged_fee: config.damaged_fee,
            lost_fee: config.lost_fee,
        }
    }
}

/// Calendar days between due and return, zero when on time or early
pub fn days_late(due: NaiveDate, returned: NaiveDate) -> i64 {
    (returned - due).num_days().max(0)
}

impl FinePolicy {
    /// Damaged and lost fines are flat; lateness only counts for normal returns.
    pub fn compute(&self, due: NaiveDate, returned: NaiveDate, condition: ReturnCondition) -> Fine {
        match condition {
            ReturnCondition::Damaged => Fine {
                amount: self.damaged_fee,
                kind: FineKind::Damaged,
            },
            ReturnCondition::Lost => Fine {
                amount: self.lost_fee,
                kind: FineKind::Lost,
            },
            ReturnCondition::Normal => match days_late(due, returned) {
                0 => Fine::NONE,
                days => Fine {
                    amount: days * self.late_fee_per_day,
                    kind: FineKind::Late,
                },
            },
        }
    }
}
