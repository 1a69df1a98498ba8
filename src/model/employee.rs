use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Directory view of an employee, as far as leave processing needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Employee {
    pub id: u64,
    pub email: String,
    pub hire_date: NaiveDate,
    /// Employee id of the line manager who decides this employee's leave.
    pub line_manager_id: Option<u64>,
    pub is_deleted: bool,
}
