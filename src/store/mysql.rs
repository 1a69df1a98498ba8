//! MySQL-backed stores.
//!
//! Every read inside a unit of work takes `FOR UPDATE` so two decisions on the
//! same application, or two submissions of the same employee, serialise on
//! row locks instead of racing.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::debug;

use super::{EmployeeDirectory, LeaveStore, LeaveTx, NotificationSink, StoreError};
use crate::model::employee::Employee;
use crate::model::leave_application::{LeaveApplication, LeaveStatus, NewLeaveApplication};
use crate::model::leave_balance::{BalanceKey, LeaveBalance, NewLeaveBalance};
use crate::model::leave_type::LeaveType;
use crate::model::notification::Notification;

const APPLICATION_COLUMNS: &str = r#"
    id, employee_id, leave_type_id, start_date, end_date, total_days, reason,
    status, applied_at, reviewer_id, reviewed_by_system, reviewed_at, comments
"#;

const BALANCE_COLUMNS: &str = r#"
    id, employee_id, leave_type_id, year, total_days, used_days, pending_days,
    carry_forward_days
"#;

#[derive(FromRow)]
struct ApplicationRow {
    id: u64,
    employee_id: u64,
    leave_type_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_days: Decimal,
    reason: String,
    status: String,
    applied_at: DateTime<Utc>,
    reviewer_id: Option<u64>,
    reviewed_by_system: bool,
    reviewed_at: Option<DateTime<Utc>>,
    comments: Option<String>,
}

impl TryFrom<ApplicationRow> for LeaveApplication {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let status: LeaveStatus = row.status.parse().map_err(|_| {
            StoreError::Decode(format!(
                "leave application {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(LeaveApplication {
            id: row.id,
            employee_id: row.employee_id,
            leave_type_id: row.leave_type_id,
            start_date: row.start_date,
            end_date: row.end_date,
            total_days: row.total_days,
            reason: row.reason,
            status,
            applied_at: row.applied_at,
            reviewer_id: row.reviewer_id,
            reviewed_by_system: row.reviewed_by_system,
            reviewed_at: row.reviewed_at,
            comments: row.comments,
        })
    }
}

fn decode_all(rows: Vec<ApplicationRow>) -> Result<Vec<LeaveApplication>, StoreError> {
    rows.into_iter().map(LeaveApplication::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTx { tx }))
    }

    async fn leave_type(&self, id: u64) -> Result<Option<LeaveType>, StoreError> {
        let leave_type = sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT id, name, default_days, requires_approval, is_paid, is_active
            FROM leave_types
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(leave_type)
    }

    async fn active_leave_types(&self) -> Result<Vec<LeaveType>, StoreError> {
        let leave_types = sqlx::query_as::<_, LeaveType>(
            r#"
            SELECT id, name, default_days, requires_approval, is_paid, is_active
            FROM leave_types
            WHERE is_active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(leave_types)
    }

    async fn application(&self, id: u64) -> Result<Option<LeaveApplication>, StoreError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM leave_applications WHERE id = ?");
        sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveApplication::try_from)
            .transpose()
    }

    async fn applications_for_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveApplication>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications \
             WHERE employee_id = ? ORDER BY applied_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn pending_applications(
        &self,
        applied_at_or_before: DateTime<Utc>,
    ) -> Result<Vec<LeaveApplication>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications \
             WHERE status = ? AND applied_at <= ? ORDER BY applied_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(LeaveStatus::Pending.as_str())
            .bind(applied_at_or_before)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }
}

struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl LeaveTx for MySqlTx {
    async fn lock_employee(&mut self, employee_id: u64) -> Result<(), StoreError> {
        sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(employee_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn balance(&mut self, key: BalanceKey) -> Result<Option<LeaveBalance>, StoreError> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS} FROM leave_balances \
             WHERE employee_id = ? AND leave_type_id = ? AND year = ? FOR UPDATE"
        );
        let balance = sqlx::query_as::<_, LeaveBalance>(&sql)
            .bind(key.employee_id)
            .bind(key.leave_type_id)
            .bind(key.year)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(balance)
    }

    async fn insert_balance(
        &mut self,
        balance: NewLeaveBalance,
    ) -> Result<LeaveBalance, StoreError> {
        // A concurrent opener may have won; the unique key makes this a no-op then.
        sqlx::query(
            r#"
            INSERT INTO leave_balances
                (employee_id, leave_type_id, year, total_days, used_days, pending_days, carry_forward_days)
            VALUES (?, ?, ?, ?, 0, 0, ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(balance.key.employee_id)
        .bind(balance.key.leave_type_id)
        .bind(balance.key.year)
        .bind(balance.total_days)
        .bind(balance.carry_forward_days)
        .execute(&mut *self.tx)
        .await?;

        self.balance(balance.key).await?.ok_or_else(|| {
            StoreError::MissingRow(format!(
                "leave balance ({}, {}, {})",
                balance.key.employee_id, balance.key.leave_type_id, balance.key.year
            ))
        })
    }

    async fn save_balance(&mut self, balance: &LeaveBalance) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_balances
            SET total_days = ?, used_days = ?, pending_days = ?, carry_forward_days = ?
            WHERE id = ?
            "#,
        )
        .bind(balance.total_days)
        .bind(balance.used_days)
        .bind(balance.pending_days)
        .bind(balance.carry_forward_days)
        .bind(balance.id)
        .execute(&mut *self.tx)
        .await?;

        // MySQL reports 0 affected rows for an update that changes nothing.
        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT id FROM leave_balances WHERE id = ?")
                .bind(balance.id)
                .fetch_optional(&mut *self.tx)
                .await?;
            if exists.is_none() {
                return Err(StoreError::MissingRow(format!("leave balance {}", balance.id)));
            }
        }
        Ok(())
    }

    async fn application(&mut self, id: u64) -> Result<Option<LeaveApplication>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications WHERE id = ? FOR UPDATE"
        );
        sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(LeaveApplication::try_from)
            .transpose()
    }

    async fn overlapping(
        &mut self,
        employee_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LeaveApplication>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM leave_applications \
             WHERE employee_id = ? AND status IN (?, ?) \
             AND start_date <= ? AND end_date >= ? \
             ORDER BY start_date FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(employee_id)
            .bind(LeaveStatus::Pending.as_str())
            .bind(LeaveStatus::Approved.as_str())
            .bind(end)
            .bind(start)
            .fetch_all(&mut *self.tx)
            .await?;
        decode_all(rows)
    }

    async fn insert_application(
        &mut self,
        application: NewLeaveApplication,
    ) -> Result<LeaveApplication, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_applications
                (employee_id, leave_type_id, start_date, end_date, total_days, reason,
                 status, applied_at, reviewed_by_system, reviewed_at, comments)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(application.employee_id)
        .bind(application.leave_type_id)
        .bind(application.start_date)
        .bind(application.end_date)
        .bind(application.total_days)
        .bind(&application.reason)
        .bind(application.status.as_str())
        .bind(application.applied_at)
        .bind(application.reviewed_by_system)
        .bind(application.reviewed_at)
        .bind(&application.comments)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_id();
        debug!(application_id = id, "Leave application row inserted");
        Ok(application.into_application(id))
    }

    async fn save_application(
        &mut self,
        application: &LeaveApplication,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_applications
            SET status = ?, reviewer_id = ?, reviewed_by_system = ?, reviewed_at = ?, comments = ?
            WHERE id = ?
            "#,
        )
        .bind(application.status.as_str())
        .bind(application.reviewer_id)
        .bind(application.reviewed_by_system)
        .bind(application.reviewed_at)
        .bind(&application.comments)
        .bind(application.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow(format!(
                "leave application {}",
                application.id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MySqlEmployeeDirectory {
    pool: MySqlPool,
}

impl MySqlEmployeeDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlEmployeeDirectory {
    async fn employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, email, hire_date, line_manager_id, is_deleted
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn employee_id_by_email(&self, email: &str) -> Result<Option<u64>, StoreError> {
        let id = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM employees WHERE email = ? AND is_deleted = FALSE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn direct_reports(&self, manager_id: u64) -> Result<Vec<u64>, StoreError> {
        let ids = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT id FROM employees
            WHERE line_manager_id = ? AND is_deleted = FALSE
            ORDER BY id
            "#,
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

/// Writes notifications to the `notifications` table for the inbox UI.
#[derive(Debug, Clone)]
pub struct MySqlNotificationSink {
    pool: MySqlPool,
}

impl MySqlNotificationSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for MySqlNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, kind, title, message, action_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.recipient_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.action_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(())
    }
}
