use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Composite key of a balance row. One row per employee, leave type and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub year: i32,
}

impl BalanceKey {
    pub fn new(employee_id: u64, leave_type_id: u64, year: i32) -> Self {
        Self {
            employee_id,
            leave_type_id,
            year,
        }
    }

    pub fn previous_year(&self) -> Self {
        Self {
            year: self.year - 1,
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "employee_id": 1000,
        "leave_type_id": 1,
        "year": 2026,
        "total_days": "17.0",
        "used_days": "3.0",
        "pending_days": "2.0",
        "carry_forward_days": "2.0"
    })
)]
pub struct LeaveBalance {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    /// Allocation for the year, carry-forward included.
    #[schema(value_type = String)]
    pub total_days: Decimal,
    #[schema(value_type = String)]
    pub used_days: Decimal,
    #[schema(value_type = String)]
    pub pending_days: Decimal,
    #[schema(value_type = String)]
    pub carry_forward_days: Decimal,
}

impl LeaveBalance {
    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.employee_id, self.leave_type_id, self.year)
    }

    pub fn available_days(&self) -> Decimal {
        self.total_days - self.used_days - self.pending_days
    }
}

/// Balance row before the store assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveBalance {
    pub key: BalanceKey,
    pub total_days: Decimal,
    pub carry_forward_days: Decimal,
}

/// Balance row as exposed over the API, with the derived available figure.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceView {
    #[serde(flatten)]
    pub balance: LeaveBalance,
    #[schema(example = "Annual Leave")]
    pub leave_type: String,
    #[schema(example = "12.0", value_type = String)]
    pub available_days: Decimal,
}

impl BalanceView {
    pub fn new(balance: LeaveBalance, leave_type: String) -> Self {
        let available_days = balance.available_days();
        Self {
            balance,
            leave_type,
            available_days,
        }
    }
}
