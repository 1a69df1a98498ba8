//! In-process implementations of the store seams.
//!
//! `MemoryLeaveStore` serialises every unit of work behind one async mutex:
//! a transaction holds the owned guard for its whole life and edits a staged
//! copy of the state, which replaces the live state only on commit.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{Clock, EmployeeDirectory, LeaveStore, LeaveTx, NotificationSink, StoreError};
use crate::model::employee::Employee;
use crate::model::leave_application::{LeaveApplication, NewLeaveApplication};
use crate::model::leave_balance::{BalanceKey, LeaveBalance, NewLeaveBalance};
use crate::model::leave_type::LeaveType;
use crate::model::notification::Notification;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    leave_types: BTreeMap<u64, LeaveType>,
    balances: BTreeMap<BalanceKey, LeaveBalance>,
    applications: BTreeMap<u64, LeaveApplication>,
    next_balance_id: u64,
    next_application_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLeaveStore {
    state: Arc<AsyncMutex<MemoryState>>,
}

impl MemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_leave_type(&self, leave_type: LeaveType) {
        self.state
            .lock()
            .await
            .leave_types
            .insert(leave_type.id, leave_type);
    }

    pub async fn balance(&self, key: BalanceKey) -> Option<LeaveBalance> {
        self.state.lock().await.balances.get(&key).cloned()
    }

    pub async fn application_count(&self) -> usize {
        self.state.lock().await.applications.len()
    }
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn leave_type(&self, id: u64) -> Result<Option<LeaveType>, StoreError> {
        Ok(self.state.lock().await.leave_types.get(&id).cloned())
    }

    async fn active_leave_types(&self) -> Result<Vec<LeaveType>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .leave_types
            .values()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    async fn application(&self, id: u64) -> Result<Option<LeaveApplication>, StoreError> {
        Ok(self.state.lock().await.applications.get(&id).cloned())
    }

    async fn applications_for_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveApplication>, StoreError> {
        let state = self.state.lock().await;
        let mut applications: Vec<LeaveApplication> = state
            .applications
            .values()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then(b.id.cmp(&a.id)));
        Ok(applications)
    }

    async fn pending_applications(
        &self,
        applied_at_or_before: DateTime<Utc>,
    ) -> Result<Vec<LeaveApplication>, StoreError> {
        let state = self.state.lock().await;
        let mut applications: Vec<LeaveApplication> = state
            .applications
            .values()
            .filter(|a| {
                a.status == crate::model::leave_application::LeaveStatus::Pending
                    && a.applied_at <= applied_at_or_before
            })
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.applied_at.cmp(&b.applied_at).then(a.id.cmp(&b.id)));
        Ok(applications)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl LeaveTx for MemoryTx {
    async fn lock_employee(&mut self, _employee_id: u64) -> Result<(), StoreError> {
        // The whole store is already held.
        Ok(())
    }

    async fn balance(&mut self, key: BalanceKey) -> Result<Option<LeaveBalance>, StoreError> {
        Ok(self.staged.balances.get(&key).cloned())
    }

    async fn insert_balance(
        &mut self,
        balance: NewLeaveBalance,
    ) -> Result<LeaveBalance, StoreError> {
        if let Some(existing) = self.staged.balances.get(&balance.key) {
            return Ok(existing.clone());
        }
        self.staged.next_balance_id += 1;
        let row = LeaveBalance {
            id: self.staged.next_balance_id,
            employee_id: balance.key.employee_id,
            leave_type_id: balance.key.leave_type_id,
            year: balance.key.year,
            total_days: balance.total_days,
            used_days: rust_decimal::Decimal::ZERO,
            pending_days: rust_decimal::Decimal::ZERO,
            carry_forward_days: balance.carry_forward_days,
        };
        self.staged.balances.insert(balance.key, row.clone());
        Ok(row)
    }

    async fn save_balance(&mut self, balance: &LeaveBalance) -> Result<(), StoreError> {
        match self.staged.balances.get_mut(&balance.key()) {
            Some(row) if row.id == balance.id => {
                *row = balance.clone();
                Ok(())
            }
            _ => Err(StoreError::MissingRow(format!("leave balance {}", balance.id))),
        }
    }

    async fn application(&mut self, id: u64) -> Result<Option<LeaveApplication>, StoreError> {
        Ok(self.staged.applications.get(&id).cloned())
    }

    async fn overlapping(
        &mut self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveApplication>, StoreError> {
        Ok(self
            .staged
            .applications
            .values()
            .filter(|a| {
                a.employee_id == employee_id
                    && a.status.occupies_calendar()
                    && a.overlaps(start, end)
            })
            .cloned()
            .collect())
    }

    async fn insert_application(
        &mut self,
        application: NewLeaveApplication,
    ) -> Result<LeaveApplication, StoreError> {
        self.staged.next_application_id += 1;
        let row = application.into_application(self.staged.next_application_id);
        self.staged.applications.insert(row.id, row.clone());
        Ok(row)
    }

    async fn save_application(
        &mut self,
        application: &LeaveApplication,
    ) -> Result<(), StoreError> {
        match self.staged.applications.get_mut(&application.id) {
            Some(row) => {
                *row = application.clone();
                Ok(())
            }
            None => Err(StoreError::MissingRow(format!(
                "leave application {}",
                application.id
            ))),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    employees: RwLock<BTreeMap<u64, Employee>>,
}

impl MemoryDirectory {
    pub fn insert(&self, employee: Employee) {
        self.employees
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(employee.id, employee);
    }

    pub fn update<F: FnOnce(&mut Employee)>(&self, id: u64, change: F) {
        if let Some(employee) = self
            .employees
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
        {
            change(employee);
        }
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryDirectory {
    async fn employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .employees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn employee_id_by_email(&self, email: &str) -> Result<Option<u64>, StoreError> {
        Ok(self
            .employees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|e| !e.is_deleted && e.email.eq_ignore_ascii_case(email))
            .map(|e| e.id))
    }

    async fn direct_reports(&self, manager_id: u64) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .employees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| !e.is_deleted && e.line_manager_id == Some(manager_id))
            .map(|e| e.id)
            .collect())
    }
}

/// Records every notification; can be switched to fail to exercise delivery errors.
#[derive(Debug, Default)]
pub struct MemoryNotifications {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl MemoryNotifications {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSink for MemoryNotifications {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("delivery disabled".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_balance(total: i64) -> NewLeaveBalance {
        NewLeaveBalance {
            key: BalanceKey::new(1, 1, 2026),
            total_days: Decimal::from(total),
            carry_forward_days: Decimal::ZERO,
        }
    }

    #[actix_web::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = MemoryLeaveStore::new();
        {
            let mut tx = store.begin().await.expect("begin");
            tx.insert_balance(new_balance(15)).await.expect("insert");
        }
        assert!(store.balance(BalanceKey::new(1, 1, 2026)).await.is_none());
    }

    #[actix_web::test]
    async fn committed_transaction_is_visible() {
        let store = MemoryLeaveStore::new();
        let mut tx = store.begin().await.expect("begin");
        let mut row = tx.insert_balance(new_balance(15)).await.expect("insert");
        row.pending_days = Decimal::from(2);
        tx.save_balance(&row).await.expect("save");
        tx.commit().await.expect("commit");

        let stored = store
            .balance(BalanceKey::new(1, 1, 2026))
            .await
            .expect("committed row");
        assert_eq!(stored.pending_days, Decimal::from(2));
    }

    #[actix_web::test]
    async fn balance_insert_is_idempotent_per_key() {
        let store = MemoryLeaveStore::new();
        let mut tx = store.begin().await.expect("begin");
        let first = tx.insert_balance(new_balance(15)).await.expect("insert");
        let second = tx.insert_balance(new_balance(99)).await.expect("insert again");
        assert_eq!(first, second);
        assert_eq!(second.total_days, Decimal::from(15));
    }

    #[test]
    fn fixed_clock_advances() {
        let start = DateTime::parse_from_rfc3339("2026-03-02T08:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        let clock = FixedClock::new(start);
        clock.advance(chrono::Duration::days(5));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 7).expect("date"));
    }
}
