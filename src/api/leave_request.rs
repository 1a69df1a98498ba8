use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::{Actor, LeaveError, LeaveService, SubmitLeave};
use crate::model::leave_application::LeaveStatus;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Another employee's applications (HR/Admin only)
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    #[schema(example = "pending", value_type = Option<String>)]
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewLeave {
    #[schema(example = "Enjoy the break")]
    pub comments: Option<String>,
}

fn comments(body: Option<web::Json<ReviewLeave>>) -> Option<String> {
    body.and_then(|b| b.into_inner().comments)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/* =========================
Submit leave application
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = SubmitLeave,
        description = "Leave application payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave application submitted", body = crate::model::leave_application::LeaveApplication),
        (status = 400, description = "Invalid dates or inactive leave type"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Dates overlap an existing application"),
        (status = 422, description = "Not eligible, insufficient balance or no approver")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<SubmitLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id(&service).await?;
    let application = service.submit(employee_id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(application))
}

/* =========================
List applications
========================= */
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Applications, newest first", body = [crate::model::leave_application::LeaveApplication]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let filter = query.into_inner();
    let own_id = auth.employee_id(&service).await.ok();

    let employee_id = match (filter.employee_id, own_id) {
        (Some(requested), Some(own)) if requested == own => own,
        (Some(requested), _) => {
            auth.require_hr_or_admin()?;
            requested
        }
        (None, Some(own)) => own,
        (None, None) => return Err(actix_web::error::ErrorForbidden("No employee profile")),
    };

    let mut applications = service.applications_for_employee(employee_id).await?;
    if let Some(status) = filter.status {
        applications.retain(|a| a.status == status);
    }
    debug!(employee_id, count = applications.len(), "Leave applications listed");
    Ok(HttpResponse::Ok().json(applications))
}

/* =========================
Awaiting the caller's decision
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/pending",
    responses(
        (status = 200, description = "Pending applications of direct reports, oldest first", body = [crate::model::leave_application::LeaveApplication]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let manager_id = auth.employee_id(&service).await?;
    let pending = service.pending_for_approver(manager_id).await?;
    Ok(HttpResponse::Ok().json(pending))
}

/* =========================
Single application
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application")
    ),
    responses(
        (status = 200, description = "Leave application found", body = crate::model::leave_application::LeaveApplication),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found", body = Object, example = json!({
            "error": "leave application 42 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();
    let application = service.application(leave_id).await?;

    if !auth.is_hr_or_admin() {
        let caller = auth.employee_id(&service).await?;
        let allowed = application.employee_id == caller
            || service.resolver().can_approve(caller, &application).await?;
        if !allowed {
            return Err(LeaveError::NotAuthorized {
                actor_id: caller,
                application_id: leave_id,
            }
            .into());
        }
    }

    Ok(HttpResponse::Ok().json(application))
}

/* =========================
Approve (line manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to approve")
    ),
    request_body(content = ReviewLeave, description = "Optional reviewer comments", content_type = "application/json"),
    responses(
        (status = 200, description = "Leave approved", body = crate::model::leave_application::LeaveApplication),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the applicant's line manager"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Application already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewLeave>>,
) -> actix_web::Result<impl Responder> {
    let approver_id = auth.employee_id(&service).await?;
    let application = service
        .approve(path.into_inner(), Actor::Employee(approver_id), comments(body))
        .await?;
    Ok(HttpResponse::Ok().json(application))
}

/* =========================
Reject (line manager)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to reject")
    ),
    request_body(content = ReviewLeave, description = "Optional reviewer comments", content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = crate::model::leave_application::LeaveApplication),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not the applicant's line manager"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Application already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewLeave>>,
) -> actix_web::Result<impl Responder> {
    let approver_id = auth.employee_id(&service).await?;
    let application = service
        .reject(path.into_inner(), Actor::Employee(approver_id), comments(body))
        .await?;
    Ok(HttpResponse::Ok().json(application))
}

/* =========================
Cancel (applicant)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = crate::model::leave_application::LeaveApplication),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the applicant may cancel"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Already decided, cancelled or started")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id(&service).await?;
    let application = service.cancel(path.into_inner(), employee_id).await?;
    Ok(HttpResponse::Ok().json(application))
}
