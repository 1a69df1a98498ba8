//! Collaborator seams of the leave engine.
//!
//! The engine only talks to persistence, the employee directory, the
//! notification transport and the wall clock through these traits. `mysql`
//! backs them with the service database; `memory` keeps everything in process
//! behind one async mutex and is what the tests run against.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::model::employee::Employee;
use crate::model::leave_application::{LeaveApplication, NewLeaveApplication};
use crate::model::leave_balance::{BalanceKey, LeaveBalance, NewLeaveBalance};
use crate::model::leave_type::LeaveType;
use crate::model::notification::Notification;

pub mod memory;
pub mod mysql;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Decode(String),
    #[error("row not found: {0}")]
    MissingRow(String),
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Read access plus the entry point for transactional units of work.
#[async_trait]
pub trait LeaveStore: Send + Sync {
    /// Opens a unit of work. Dropping it without `commit` rolls everything back.
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, StoreError>;

    async fn leave_type(&self, id: u64) -> Result<Option<LeaveType>, StoreError>;

    async fn active_leave_types(&self) -> Result<Vec<LeaveType>, StoreError>;

    async fn application(&self, id: u64) -> Result<Option<LeaveApplication>, StoreError>;

    /// Newest first.
    async fn applications_for_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveApplication>, StoreError>;

    /// Pending applications submitted at or before `applied_at_or_before`, oldest first.
    async fn pending_applications(
        &self,
        applied_at_or_before: DateTime<Utc>,
    ) -> Result<Vec<LeaveApplication>, StoreError>;
}

/// One atomic read-modify-write unit. Rows read through it stay locked until
/// it commits or is dropped.
#[async_trait]
pub trait LeaveTx: Send {
    /// Serialises concurrent submissions of the same employee.
    async fn lock_employee(&mut self, employee_id: u64) -> Result<(), StoreError>;

    async fn balance(&mut self, key: BalanceKey) -> Result<Option<LeaveBalance>, StoreError>;

    /// Inserts unless a row with the same key exists; returns the row either way.
    async fn insert_balance(&mut self, balance: NewLeaveBalance)
    -> Result<LeaveBalance, StoreError>;

    async fn save_balance(&mut self, balance: &LeaveBalance) -> Result<(), StoreError>;

    async fn application(&mut self, id: u64) -> Result<Option<LeaveApplication>, StoreError>;

    /// Pending or approved applications of the employee intersecting `[start, end]`.
    async fn overlapping(
        &mut self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveApplication>, StoreError>;

    async fn insert_application(
        &mut self,
        application: NewLeaveApplication,
    ) -> Result<LeaveApplication, StoreError>;

    async fn save_application(&mut self, application: &LeaveApplication)
    -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn employee(&self, id: u64) -> Result<Option<Employee>, StoreError>;

    async fn employee_id_by_email(&self, email: &str) -> Result<Option<u64>, StoreError>;

    /// Employees whose line manager is `manager_id`.
    async fn direct_reports(&self, manager_id: u64) -> Result<Vec<u64>, StoreError>;
}

/// Fire-and-forget delivery. Callers log failures and carry on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
