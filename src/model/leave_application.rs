use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Allowed edges of the application lifecycle.
    pub fn can_become(self, next: LeaveStatus) -> bool {
        use LeaveStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }

    /// Statuses that hold days on the calendar and block overlapping requests.
    pub fn occupies_calendar(self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type_id": 1,
    "start_date": "2026-03-09",
    "end_date": "2026-03-11",
    "total_days": "3",
    "reason": "Family visit",
    "status": "pending",
    "applied_at": "2026-03-02T08:00:00Z",
    "reviewer_id": null,
    "reviewed_by_system": false,
    "reviewed_at": null,
    "comments": null
}))]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-03-09", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-11", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Working days in the range, weekends and public holidays excluded.
    #[schema(example = "3", value_type = String)]
    pub total_days: Decimal,
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(format = "date-time", value_type = String)]
    pub applied_at: DateTime<Utc>,
    pub reviewer_id: Option<u64>,
    pub reviewed_by_system: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

impl LeaveApplication {
    /// Inclusive interval intersection.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }

    pub fn balance_year(&self) -> i32 {
        use chrono::Datelike;
        self.start_date.year()
    }
}

/// Application row before the store assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveApplication {
    pub employee_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: Decimal,
    pub reason: String,
    pub status: LeaveStatus,
    pub applied_at: DateTime<Utc>,
    pub reviewed_by_system: bool,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

impl NewLeaveApplication {
    pub fn into_application(self, id: u64) -> LeaveApplication {
        LeaveApplication {
            id,
            employee_id: self.employee_id,
            leave_type_id: self.leave_type_id,
            start_date: self.start_date,
            end_date: self.end_date,
            total_days: self.total_days,
            reason: self.reason,
            status: self.status,
            applied_at: self.applied_at,
            reviewer_id: None,
            reviewed_by_system: self.reviewed_by_system,
            reviewed_at: self.reviewed_at,
            comments: self.comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn lifecycle_edges() {
        use LeaveStatus::*;
        assert!(Pending.can_become(Approved));
        assert!(Pending.can_become(Rejected));
        assert!(Pending.can_become(Cancelled));
        assert!(Approved.can_become(Cancelled));

        assert!(!Approved.can_become(Approved));
        assert!(!Approved.can_become(Rejected));
        assert!(!Rejected.can_become(Cancelled));
        assert!(!Cancelled.can_become(Approved));
        assert!(!Cancelled.can_become(Cancelled));
    }

    #[test]
    fn status_round_trips_through_column_text() {
        assert_eq!(LeaveStatus::Cancelled.as_str(), "cancelled");
        assert_eq!(LeaveStatus::from_str("approved").ok(), Some(LeaveStatus::Approved));
        assert!(LeaveStatus::from_str("escalated").is_err());
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let application = NewLeaveApplication {
            employee_id: 1,
            leave_type_id: 1,
            start_date: date(2026, 3, 9),
            end_date: date(2026, 3, 11),
            total_days: Decimal::from(3),
            reason: String::new(),
            status: LeaveStatus::Pending,
            applied_at: Utc::now(),
            reviewed_by_system: false,
            reviewed_at: None,
            comments: None,
        }
        .into_application(1);

        assert!(application.overlaps(date(2026, 3, 11), date(2026, 3, 13)));
        assert!(application.overlaps(date(2026, 3, 5), date(2026, 3, 9)));
        assert!(application.overlaps(date(2026, 3, 10), date(2026, 3, 10)));
        assert!(!application.overlaps(date(2026, 3, 12), date(2026, 3, 13)));
        assert!(!application.overlaps(date(2026, 3, 2), date(2026, 3, 8)));
    }
}
