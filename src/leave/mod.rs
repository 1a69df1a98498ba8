//! Leave lifecycle and balance engine.
//!
//! `lifecycle` owns the application state machine and is the only writer of
//! balance rows besides the administrative override in `ledger`. `scheduler`
//! drives the same transitions as a human approver, acting as the system.

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use strum::EnumString;

pub mod accrual;
pub mod approver;
pub mod calendar;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod tests;

pub use approver::{Actor, ApproverResolver};
pub use error::LeaveError;
pub use lifecycle::{LeaveService, SubmitLeave};
pub use scheduler::{AutoApprovalScheduler, SweepReport};

/// Last moment an approved application may still be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CancelCutoff {
    /// Up to the day before the leave starts.
    BeforeStart,
    /// Up to and including the first day of leave.
    StartDay,
}

impl CancelCutoff {
    pub fn allows(self, start_date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            CancelCutoff::BeforeStart => today < start_date,
            CancelCutoff::StartDay => today <= start_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeavePolicy {
    /// Pending applications at least this old get daily reminders to the approver.
    pub urgent_days: i64,
    /// Pending applications at least this old are approved by the system.
    pub auto_approve_days: i64,
    pub sweep_interval: Duration,
    pub cancel_cutoff: CancelCutoff,
    pub carry_forward_cap: Decimal,
    pub leave_type_cache_ttl: Duration,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            urgent_days: 4,
            auto_approve_days: 5,
            sweep_interval: Duration::from_secs(3600),
            cancel_cutoff: CancelCutoff::BeforeStart,
            carry_forward_cap: Decimal::from(6),
            leave_type_cache_ttl: Duration::from_secs(300),
        }
    }
}
