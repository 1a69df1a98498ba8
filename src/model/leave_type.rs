use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::EnumString;
use utoipa::ToSchema;

/// Statutory category a leave type falls under. Decides which accrual and
/// eligibility rule applies; anything unrecognised gets its configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LeaveCategory {
    #[strum(serialize = "Annual Leave", serialize = "annual")]
    Annual,
    #[strum(serialize = "Sick Leave", serialize = "sick")]
    Sick,
    #[strum(
        serialize = "Family Responsibility Leave",
        serialize = "family responsibility",
        serialize = "family"
    )]
    FamilyResponsibility,
    #[strum(serialize = "Paternity Leave", serialize = "paternity")]
    Paternity,
    #[strum(serialize = "Maternity Leave", serialize = "maternity")]
    Maternity,
    #[strum(serialize = "Study Leave", serialize = "study")]
    Study,
    #[strum(serialize = "Unpaid Leave", serialize = "unpaid")]
    Unpaid,
    #[strum(disabled)]
    Other,
}

impl LeaveCategory {
    pub fn from_name(name: &str) -> Self {
        name.trim().parse().unwrap_or(LeaveCategory::Other)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Annual Leave",
        "default_days": "15.0",
        "requires_approval": true,
        "is_paid": true,
        "is_active": true
    })
)]
pub struct LeaveType {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Annual Leave")]
    pub name: String,
    /// Default annual allotment in days.
    #[schema(example = "15.0", value_type = String)]
    pub default_days: Decimal,
    pub requires_approval: bool,
    pub is_paid: bool,
    pub is_active: bool,
}

impl LeaveType {
    pub fn category(&self) -> LeaveCategory {
        LeaveCategory::from_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_matches_statutory_names_case_insensitively() {
        assert_eq!(LeaveCategory::from_name("Annual Leave"), LeaveCategory::Annual);
        assert_eq!(LeaveCategory::from_name("sick leave"), LeaveCategory::Sick);
        assert_eq!(
            LeaveCategory::from_name(" Family Responsibility Leave "),
            LeaveCategory::FamilyResponsibility
        );
        assert_eq!(LeaveCategory::from_name("PATERNITY"), LeaveCategory::Paternity);
    }

    #[test]
    fn unknown_names_fall_back_to_other() {
        assert_eq!(LeaveCategory::from_name("Sabbatical"), LeaveCategory::Other);
        assert_eq!(LeaveCategory::from_name("Other"), LeaveCategory::Other);
    }
}
