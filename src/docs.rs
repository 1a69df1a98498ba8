use crate::api::leave_request::{LeaveFilter, ReviewLeave};
use crate::leave::SubmitLeave;
use crate::leave::ledger::BalanceAdjustment;
use crate::model::leave_application::{LeaveApplication, LeaveStatus};
use crate::model::leave_balance::{BalanceView, LeaveBalance};
use crate::model::leave_type::LeaveType;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave Management

Leave lifecycle and balance engine of the HRM system, following the South
African Basic Conditions of Employment Act.

### Key Features
- **Applications**
  - Submit, approve, reject and cancel leave; working days exclude weekends and public holidays
- **Balances**
  - Statutory accrual, pro-rating in the hire year and capped annual carry-forward
- **Auto-approval**
  - Reminders to the line manager, then system approval of stale requests

### Security
Every endpoint requires a **JWT Bearer** access token. Decisions belong to the
applicant's line manager; balance administration is limited to **Admin** and **HR**.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::pending_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::leave_balance::my_balances,
        crate::api::leave_balance::employee_balances,
        crate::api::leave_balance::adjust_balance,
        crate::api::leave_balance::initialize_year
    ),
    components(
        schemas(
            SubmitLeave,
            ReviewLeave,
            LeaveFilter,
            LeaveApplication,
            LeaveStatus,
            LeaveType,
            LeaveBalance,
            BalanceView,
            BalanceAdjustment
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave application APIs"),
        (name = "Leave Balance", description = "Leave balance APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_leave_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/leave",
            "/api/leave/pending",
            "/api/leave/{leave_id}",
            "/api/leave/{leave_id}/approve",
            "/api/leave/{leave_id}/reject",
            "/api/leave/{leave_id}/cancel",
            "/api/leave/balance",
            "/api/leave/balance/{employee_id}",
            "/api/leave/balance/{employee_id}/{leave_type_id}/{year}",
            "/api/leave/balance/{employee_id}/init/{year}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
