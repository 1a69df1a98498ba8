//! Total/Used/Pending/Available ledger.
//!
//! Every mutation goes through one of the functions below, each of which
//! leaves `available = total - used - pending` non-negative or refuses.
//! They only touch the in-memory row; callers persist it inside the same
//! unit of work as the matching application change.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::leave::accrual;
use crate::leave::error::LeaveError;
use crate::leave::lifecycle::LeaveService;
use crate::model::employee::Employee;
use crate::model::leave_balance::{BalanceKey, BalanceView, LeaveBalance, NewLeaveBalance};
use crate::model::leave_type::{LeaveCategory, LeaveType};
use crate::store::LeaveTx;

fn ensure_consistent(balance: &LeaveBalance) -> Result<(), LeaveError> {
    if balance.total_days < Decimal::ZERO
        || balance.used_days < Decimal::ZERO
        || balance.pending_days < Decimal::ZERO
        || balance.available_days() < Decimal::ZERO
    {
        return Err(LeaveError::LedgerInvariant(format!(
            "balance {}: total {}, used {}, pending {}",
            balance.id, balance.total_days, balance.used_days, balance.pending_days
        )));
    }
    Ok(())
}

fn ensure_available(balance: &LeaveBalance, days: Decimal) -> Result<(), LeaveError> {
    let available = balance.available_days();
    if available < days {
        return Err(LeaveError::InsufficientBalance {
            requested: days,
            available,
        });
    }
    Ok(())
}

/// Submission: hold `days` against the balance.
pub fn reserve(balance: &mut LeaveBalance, days: Decimal) -> Result<(), LeaveError> {
    ensure_available(balance, days)?;
    let mut next = balance.clone();
    next.pending_days += days;
    ensure_consistent(&next)?;
    *balance = next;
    Ok(())
}

/// Rejection or cancellation of a pending application.
pub fn release_pending(balance: &mut LeaveBalance, days: Decimal) -> Result<(), LeaveError> {
    let mut next = balance.clone();
    next.pending_days -= days;
    ensure_consistent(&next)?;
    *balance = next;
    Ok(())
}

/// Approval: move `days` from pending to used.
pub fn settle_pending(balance: &mut LeaveBalance, days: Decimal) -> Result<(), LeaveError> {
    let mut next = balance.clone();
    next.pending_days -= days;
    next.used_days += days;
    ensure_consistent(&next)?;
    *balance = next;
    Ok(())
}

/// Cancellation of an approved application.
pub fn restore_used(balance: &mut LeaveBalance, days: Decimal) -> Result<(), LeaveError> {
    let mut next = balance.clone();
    next.used_days -= days;
    ensure_consistent(&next)?;
    *balance = next;
    Ok(())
}

/// Leave types without an approval step are debited straight to used.
pub fn consume(balance: &mut LeaveBalance, days: Decimal) -> Result<(), LeaveError> {
    ensure_available(balance, days)?;
    let mut next = balance.clone();
    next.used_days += days;
    ensure_consistent(&next)?;
    *balance = next;
    Ok(())
}

/// Direct edit of total and/or used by HR or an administrator.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BalanceAdjustment {
    #[schema(example = "18.0", value_type = Option<String>)]
    pub total_days: Option<Decimal>,
    #[schema(example = "2.0", value_type = Option<String>)]
    pub used_days: Option<Decimal>,
}

pub fn adjust(
    balance: &mut LeaveBalance,
    adjustment: &BalanceAdjustment,
) -> Result<(), LeaveError> {
    let mut next = balance.clone();
    if let Some(total) = adjustment.total_days {
        next.total_days = total;
    }
    if let Some(used) = adjustment.used_days {
        next.used_days = used;
    }
    ensure_consistent(&next).map_err(|_| {
        LeaveError::Validation(format!(
            "adjustment leaves balance {} with total {}, used {}, pending {}",
            next.id, next.total_days, next.used_days, next.pending_days
        ))
    })?;
    *balance = next;
    Ok(())
}

/// Returns the balance row for `(employee, leave type, year)`, creating it
/// from the accrual rules when missing. The bool reports a fresh row.
///
/// An existing row of a tenure-gated category is raised to the entitlement
/// due on `today`; its total is never lowered.
pub(crate) async fn open_balance(
    tx: &mut dyn LeaveTx,
    leave_type: &LeaveType,
    employee: &Employee,
    year: i32,
    today: NaiveDate,
    carry_forward_cap: Decimal,
) -> Result<(LeaveBalance, bool), LeaveError> {
    let key = BalanceKey::new(employee.id, leave_type.id, year);
    let reference = accrual::reference_date_for_year(year, today);
    let category = leave_type.category();
    let allocated =
        accrual::entitlement(category, leave_type.default_days, employee.hire_date, reference);

    if let Some(mut existing) = tx.balance(key).await? {
        let due = allocated + existing.carry_forward_days;
        if accrual::grows_with_tenure(category) && due > existing.total_days {
            let before = existing.total_days;
            existing.total_days = due;
            tx.save_balance(&existing).await?;
            info!(
                employee_id = employee.id,
                leave_type_id = leave_type.id,
                year,
                total_before = %before,
                total_after = %due,
                "Leave balance topped up"
            );
        }
        return Ok((existing, false));
    }
    let carried = if category == LeaveCategory::Annual && year > employee.hire_date.year() {
        let previous = tx.balance(key.previous_year()).await?;
        accrual::carry_forward(previous.as_ref(), carry_forward_cap)
    } else {
        Decimal::ZERO
    };

    let created = tx
        .insert_balance(NewLeaveBalance {
            key,
            total_days: allocated + carried,
            carry_forward_days: carried,
        })
        .await?;
    info!(
        employee_id = employee.id,
        leave_type_id = leave_type.id,
        year,
        allocated = %allocated,
        carried = %carried,
        "Leave balance opened"
    );
    Ok((created, true))
}

impl LeaveService {
    /// Every active leave type's balance for the year, opening missing rows.
    pub async fn balances(
        &self,
        employee_id: u64,
        year: i32,
    ) -> Result<Vec<BalanceView>, LeaveError> {
        let (views, _) = self.open_year(employee_id, year).await?;
        Ok(views)
    }

    /// Opens the year's balances ahead of use. Returns how many rows were created.
    #[instrument(skip(self))]
    pub async fn initialize_year(&self, employee_id: u64, year: i32) -> Result<usize, LeaveError> {
        let (_, created) = self.open_year(employee_id, year).await?;
        info!(employee_id, year, created, "Leave year initialised");
        Ok(created)
    }

    async fn open_year(
        &self,
        employee_id: u64,
        year: i32,
    ) -> Result<(Vec<BalanceView>, usize), LeaveError> {
        let employee = self.employee(employee_id).await?;
        let leave_types = self.store().active_leave_types().await?;
        let today = self.clock().today();

        let mut tx = self.store().begin().await?;
        tx.lock_employee(employee_id).await?;
        let mut views = Vec::with_capacity(leave_types.len());
        let mut created = 0;
        for leave_type in &leave_types {
            let (balance, fresh) = open_balance(
                tx.as_mut(),
                leave_type,
                &employee,
                year,
                today,
                self.policy().carry_forward_cap,
            )
            .await?;
            if fresh {
                created += 1;
            }
            views.push(BalanceView::new(balance, leave_type.name.clone()));
        }
        tx.commit().await?;
        Ok((views, created))
    }

    /// Administrative override. Bypasses the state machine but not the
    /// non-negativity rules.
    #[instrument(skip(self))]
    pub async fn adjust_balance(
        &self,
        key: BalanceKey,
        adjustment: BalanceAdjustment,
    ) -> Result<LeaveBalance, LeaveError> {
        let mut tx = self.store().begin().await?;
        let mut balance = tx
            .balance(key)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave balance", key.employee_id))?;
        let before = balance.clone();
        adjust(&mut balance, &adjustment)?;
        tx.save_balance(&balance).await?;
        tx.commit().await?;

        info!(
            employee_id = key.employee_id,
            leave_type_id = key.leave_type_id,
            year = key.year,
            total_before = %before.total_days,
            total_after = %balance.total_days,
            used_before = %before.used_days,
            used_after = %balance.used_days,
            "Leave balance adjusted"
        );
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(total: i64, used: i64, pending: i64) -> LeaveBalance {
        LeaveBalance {
            id: 1,
            employee_id: 10,
            leave_type_id: 1,
            year: 2026,
            total_days: Decimal::from(total),
            used_days: Decimal::from(used),
            pending_days: Decimal::from(pending),
            carry_forward_days: Decimal::ZERO,
        }
    }

    fn days(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn reserve_holds_days_as_pending() {
        let mut row = balance(15, 0, 0);
        reserve(&mut row, days(3)).expect("reserve");
        assert_eq!(row.pending_days, days(3));
        assert_eq!(row.available_days(), days(12));
    }

    #[test]
    fn reserve_refuses_more_than_available() {
        let mut row = balance(15, 13, 0);
        match reserve(&mut row, days(3)) {
            Err(LeaveError::InsufficientBalance {
                requested,
                available,
            }) => {
                assert_eq!(requested, days(3));
                assert_eq!(available, days(2));
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
        assert_eq!(row, balance(15, 13, 0));
    }

    #[test]
    fn settle_moves_pending_to_used_without_changing_available() {
        let mut row = balance(15, 2, 3);
        settle_pending(&mut row, days(3)).expect("settle");
        assert_eq!(row.pending_days, Decimal::ZERO);
        assert_eq!(row.used_days, days(5));
        assert_eq!(row.available_days(), days(10));
    }

    #[test]
    fn release_and_restore_refuse_to_go_negative() {
        let mut row = balance(15, 1, 2);
        assert!(matches!(
            release_pending(&mut row, days(3)),
            Err(LeaveError::LedgerInvariant(_))
        ));
        assert!(matches!(
            restore_used(&mut row, days(2)),
            Err(LeaveError::LedgerInvariant(_))
        ));
        assert_eq!(row, balance(15, 1, 2));
    }

    #[test]
    fn consume_debits_used_directly() {
        let mut row = balance(3, 0, 0);
        consume(&mut row, days(3)).expect("consume");
        assert_eq!(row.used_days, days(3));
        assert!(consume(&mut row, days(1)).is_err());
    }

    #[test]
    fn adjustment_must_keep_available_non_negative() {
        let mut row = balance(15, 5, 4);
        let shrink = BalanceAdjustment {
            total_days: Some(days(8)),
            used_days: None,
        };
        assert!(matches!(
            adjust(&mut row, &shrink),
            Err(LeaveError::Validation(_))
        ));

        let negative = BalanceAdjustment {
            total_days: None,
            used_days: Some(days(-1)),
        };
        assert!(adjust(&mut row, &negative).is_err());

        let fine = BalanceAdjustment {
            total_days: Some(days(20)),
            used_days: Some(days(6)),
        };
        adjust(&mut row, &fine).expect("valid adjustment");
        assert_eq!(row.available_days(), days(10));
    }
}
