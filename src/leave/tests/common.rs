use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::leave::{LeavePolicy, LeaveService, SubmitLeave};
use crate::model::employee::Employee;
use crate::model::leave_balance::{BalanceKey, LeaveBalance};
use crate::model::leave_type::LeaveType;
use crate::store::Clock;
use crate::store::memory::{FixedClock, MemoryDirectory, MemoryLeaveStore, MemoryNotifications};

pub const ANNUAL: u64 = 1;
pub const SICK: u64 = 2;
pub const FAMILY: u64 = 3;
pub const STUDY: u64 = 4;

/// Line manager of `EMPLOYEE`.
pub const MANAGER: u64 = 1;
/// Manages nobody.
pub const OTHER_MANAGER: u64 = 3;
pub const GONE_MANAGER: u64 = 2;
pub const EMPLOYEE: u64 = 10;
pub const UNMANAGED: u64 = 11;
pub const ORPHANED: u64 = 12;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn days(value: i64) -> Decimal {
    Decimal::from(value)
}

/// Monday 2 March 2026, 08:00 UTC.
pub fn monday_morning() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T08:00:00Z")
        .expect("timestamp")
        .with_timezone(&Utc)
}

fn leave_type(id: u64, name: &str, default_days: i64, requires_approval: bool) -> LeaveType {
    LeaveType {
        id,
        name: name.to_string(),
        default_days: Decimal::from(default_days),
        requires_approval,
        is_paid: true,
        is_active: true,
    }
}

pub fn employee(id: u64, hire_date: NaiveDate, line_manager_id: Option<u64>) -> Employee {
    Employee {
        id,
        email: format!("employee{id}@example.co.za"),
        hire_date,
        line_manager_id,
        is_deleted: false,
    }
}

pub struct Harness {
    pub service: Arc<LeaveService>,
    pub store: Arc<MemoryLeaveStore>,
    pub directory: Arc<MemoryDirectory>,
    pub notifications: Arc<MemoryNotifications>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policy(LeavePolicy::default()).await
    }

    pub async fn with_policy(policy: LeavePolicy) -> Self {
        let store = Arc::new(MemoryLeaveStore::new());
        store.add_leave_type(leave_type(ANNUAL, "Annual Leave", 15, true)).await;
        store.add_leave_type(leave_type(SICK, "Sick Leave", 30, true)).await;
        store
            .add_leave_type(leave_type(FAMILY, "Family Responsibility Leave", 3, true))
            .await;
        store.add_leave_type(leave_type(STUDY, "Study Leave", 5, false)).await;

        let directory = Arc::new(MemoryDirectory::default());
        directory.insert(employee(MANAGER, date(2020, 1, 6), None));
        directory.insert(Employee {
            is_deleted: true,
            ..employee(GONE_MANAGER, date(2019, 5, 1), None)
        });
        directory.insert(employee(OTHER_MANAGER, date(2021, 2, 1), None));
        directory.insert(employee(EMPLOYEE, date(2024, 1, 15), Some(MANAGER)));
        directory.insert(employee(UNMANAGED, date(2024, 1, 15), None));
        directory.insert(employee(ORPHANED, date(2024, 1, 15), Some(GONE_MANAGER)));

        let notifications = Arc::new(MemoryNotifications::default());
        let clock = Arc::new(FixedClock::new(monday_morning()));
        let service = Arc::new(LeaveService::new(
            store.clone(),
            directory.clone(),
            notifications.clone(),
            clock.clone(),
            policy,
        ));

        Self {
            service,
            store,
            directory,
            notifications,
            clock,
        }
    }

    /// Adds an employee reporting to `MANAGER`, hired `days_ago` days before now.
    pub fn hire(&self, id: u64, days_ago: i64) {
        let hired = monday_morning().date_naive() - Duration::days(days_ago);
        self.directory.insert(employee(id, hired, Some(MANAGER)));
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn balance(&self, employee_id: u64, leave_type_id: u64, year: i32) -> LeaveBalance {
        self.store
            .balance(BalanceKey::new(employee_id, leave_type_id, year))
            .await
            .expect("balance row")
    }
}

pub fn request(leave_type_id: u64, start: NaiveDate, end: NaiveDate) -> SubmitLeave {
    SubmitLeave {
        leave_type_id,
        start_date: start,
        end_date: end,
        reason: "Family visit".to_string(),
    }
}

/// Mon 9 to Wed 11 March 2026: three working days.
pub fn three_days() -> SubmitLeave {
    request(ANNUAL, date(2026, 3, 9), date(2026, 3, 11))
}
