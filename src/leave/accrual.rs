//! BCEA entitlement and eligibility rules.
//!
//! Everything here is a pure function of the hire date, a reference date and
//! the leave category. The stored entitlement and the right to draw on it are
//! separate answers: a new employee accrues sick leave from day one but cannot
//! apply for it until the eligibility threshold is reached.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_type::LeaveCategory;

pub const ANNUAL_LEAVE_DAYS: u32 = 15;
pub const SICK_LEAVE_CYCLE_DAYS: u32 = 30;
/// One day of sick leave accrues per this many days worked in the first six months.
pub const SICK_ACCRUAL_DIVISOR: i64 = 26;
pub const SICK_ELIGIBILITY_DAYS: i64 = 180;
pub const FAMILY_RESPONSIBILITY_ELIGIBILITY_DAYS: i64 = 120;
pub const PATERNITY_ELIGIBILITY_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    NotYet {
        days_employed: i64,
        required_days: i64,
    },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Calendar days from hire to reference; negative before the hire date.
pub fn days_employed(hire_date: NaiveDate, reference: NaiveDate) -> i64 {
    (reference - hire_date).num_days()
}

/// Calendar months from the hire month through December, hire month included.
pub fn months_remaining_in_hire_year(hire_date: NaiveDate) -> u32 {
    12 - hire_date.month() + 1
}

/// Annual leave for the reference year, pro-rated in the year of hire.
pub fn annual_entitlement(hire_date: NaiveDate, reference: NaiveDate) -> Decimal {
    let full = Decimal::from(ANNUAL_LEAVE_DAYS);
    match hire_date.year().cmp(&reference.year()) {
        std::cmp::Ordering::Less => full,
        std::cmp::Ordering::Equal => {
            let months = Decimal::from(months_remaining_in_hire_year(hire_date));
            (months * full / Decimal::from(12))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        }
        std::cmp::Ordering::Greater => Decimal::ZERO,
    }
}

pub fn sick_entitlement(hire_date: NaiveDate, reference: NaiveDate) -> Decimal {
    let days = days_employed(hire_date, reference);
    if days < 0 {
        Decimal::ZERO
    } else if days < SICK_ELIGIBILITY_DAYS {
        Decimal::from(days / SICK_ACCRUAL_DIVISOR)
    } else {
        Decimal::from(SICK_LEAVE_CYCLE_DAYS)
    }
}

fn threshold(category: LeaveCategory) -> Option<i64> {
    match category {
        LeaveCategory::Sick => Some(SICK_ELIGIBILITY_DAYS),
        LeaveCategory::FamilyResponsibility => Some(FAMILY_RESPONSIBILITY_ELIGIBILITY_DAYS),
        LeaveCategory::Paternity => Some(PATERNITY_ELIGIBILITY_DAYS),
        LeaveCategory::Annual
        | LeaveCategory::Maternity
        | LeaveCategory::Study
        | LeaveCategory::Unpaid
        | LeaveCategory::Other => None,
    }
}

/// Whether the employee may apply for leave of this category on `reference`.
pub fn eligibility(
    category: LeaveCategory,
    hire_date: NaiveDate,
    reference: NaiveDate,
) -> Eligibility {
    match threshold(category) {
        Some(required_days) => {
            let days_employed = days_employed(hire_date, reference);
            if days_employed >= required_days {
                Eligibility::Eligible
            } else {
                Eligibility::NotYet {
                    days_employed,
                    required_days,
                }
            }
        }
        None => Eligibility::Eligible,
    }
}

/// Categories whose entitlement rises with tenure inside a leave year, so a
/// row opened early has to be topped up once the employee qualifies.
pub fn grows_with_tenure(category: LeaveCategory) -> bool {
    threshold(category).is_some()
}

/// Days allocated for the reference year, before any carry-forward.
pub fn entitlement(
    category: LeaveCategory,
    default_days: Decimal,
    hire_date: NaiveDate,
    reference: NaiveDate,
) -> Decimal {
    match category {
        LeaveCategory::Annual => annual_entitlement(hire_date, reference),
        LeaveCategory::Sick => sick_entitlement(hire_date, reference),
        LeaveCategory::FamilyResponsibility | LeaveCategory::Paternity => {
            if eligibility(category, hire_date, reference).is_eligible() {
                default_days
            } else {
                Decimal::ZERO
            }
        }
        LeaveCategory::Maternity
        | LeaveCategory::Study
        | LeaveCategory::Unpaid
        | LeaveCategory::Other => default_days,
    }
}

/// Unused annual leave brought into a new year, capped. Nothing without a prior row.
pub fn carry_forward(previous: Option<&LeaveBalance>, cap: Decimal) -> Decimal {
    previous
        .map(|balance| balance.available_days().max(Decimal::ZERO).min(cap))
        .unwrap_or(Decimal::ZERO)
}

/// Date the per-year rules are evaluated against: `today` clamped into `year`.
pub fn reference_date_for_year(year: i32, today: NaiveDate) -> NaiveDate {
    match today.year().cmp(&year) {
        std::cmp::Ordering::Equal => today,
        std::cmp::Ordering::Greater => NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today),
        std::cmp::Ordering::Less => NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today),
    }
}
