use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use rust_decimal::Decimal;
use serde_json::json;

use crate::model::leave_application::LeaveStatus;
use crate::store::StoreError;

/// Every way a leave operation can refuse or fail. Only `Persistence` means a
/// write was attempted; everything else is detected before anything changes.
#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(
        "not eligible for {leave_type}: {days_employed} days employed, {required_days} required"
    )]
    NotEligible {
        leave_type: String,
        days_employed: i64,
        required_days: i64,
    },

    #[error("insufficient balance: requested {requested} days, {available} available")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("dates overlap existing application {existing}")]
    OverlapConflict { existing: u64 },

    #[error("employee {employee_id} has no line manager assigned")]
    NoManagerAssigned { employee_id: u64 },

    #[error("line manager {manager_id} of employee {employee_id} is no longer active")]
    ManagerInactive { employee_id: u64, manager_id: u64 },

    #[error("employee {actor_id} may not decide application {application_id}")]
    NotAuthorized { actor_id: u64, application_id: u64 },

    #[error("application {application_id} cannot go from {from} to {to}")]
    InvalidStateTransition {
        application_id: u64,
        from: LeaveStatus,
        to: LeaveStatus,
    },

    #[error("application {application_id} can no longer be cancelled: {reason}")]
    NotCancellable {
        application_id: u64,
        reason: &'static str,
    },

    #[error("balance ledger would break: {0}")]
    LedgerInvariant(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl LeaveError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        LeaveError::NotFound { entity, id }
    }

    /// Outcomes a concurrent actor can legitimately cause; not worth a warning.
    pub fn is_benign_race(&self) -> bool {
        matches!(self, LeaveError::InvalidStateTransition { .. })
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_) => StatusCode::BAD_REQUEST,
            LeaveError::NotEligible { .. }
            | LeaveError::InsufficientBalance { .. }
            | LeaveError::NoManagerAssigned { .. }
            | LeaveError::ManagerInactive { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::OverlapConflict { .. }
            | LeaveError::InvalidStateTransition { .. }
            | LeaveError::NotCancellable { .. }
            | LeaveError::LedgerInvariant(_) => StatusCode::CONFLICT,
            LeaveError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            LeaveError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeaveError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LeaveError::Persistence(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
