use actix_web::{HttpResponse, Responder, web};
use chrono::Datelike;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::leave::LeaveService;
use crate::leave::ledger::BalanceAdjustment;
use crate::model::leave_balance::BalanceKey;

#[derive(Debug, Deserialize, IntoParams)]
pub struct YearQuery {
    /// Leave year; defaults to the current year
    pub year: Option<i32>,
}

fn year_or_current(query: &YearQuery, service: &LeaveService) -> i32 {
    query.year.unwrap_or_else(|| service.clock().today().year())
}

/// Caller's balances for every active leave type
#[utoipa::path(
    get,
    path = "/api/leave/balance",
    params(YearQuery),
    responses(
        (status = 200, description = "Balances for the year", body = [crate::model::leave_balance::BalanceView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn my_balances(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id(&service).await?;
    let year = year_or_current(&query, &service);
    let balances = service.balances(employee_id, year).await?;
    Ok(HttpResponse::Ok().json(balances))
}

#[utoipa::path(
    get,
    path = "/api/leave/balance/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee whose balances to show"),
        YearQuery
    ),
    responses(
        (status = 200, description = "Balances for the year", body = [crate::model::leave_balance::BalanceView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn employee_balances(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    query: web::Query<YearQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let year = year_or_current(&query, &service);
    let balances = service.balances(path.into_inner(), year).await?;
    Ok(HttpResponse::Ok().json(balances))
}

/// Direct edit of total and/or used days
#[utoipa::path(
    put,
    path = "/api/leave/balance/{employee_id}/{leave_type_id}/{year}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        ("leave_type_id" = u64, Path, description = "Leave type ID"),
        ("year" = i32, Path, description = "Leave year")
    ),
    request_body(content = BalanceAdjustment, content_type = "application/json"),
    responses(
        (status = 200, description = "Adjusted balance", body = crate::model::leave_balance::LeaveBalance),
        (status = 400, description = "Adjustment would make the balance negative"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Balance not opened")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn adjust_balance(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<(u64, u64, i32)>,
    payload: web::Json<BalanceAdjustment>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (employee_id, leave_type_id, year) = path.into_inner();
    tracing::info!(
        admin_user_id = auth.user_id,
        employee_id,
        leave_type_id,
        year,
        "Balance override requested"
    );
    let balance = service
        .adjust_balance(
            BalanceKey::new(employee_id, leave_type_id, year),
            payload.into_inner(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(balance))
}

#[utoipa::path(
    post,
    path = "/api/leave/balance/{employee_id}/init/{year}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        ("year" = i32, Path, description = "Leave year to open")
    ),
    responses(
        (status = 200, description = "Balances opened", body = Object, example = json!({
            "employee_id": 1000,
            "year": 2026,
            "created": 7
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave Balance"
)]
pub async fn initialize_year(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<(u64, i32)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (employee_id, year) = path.into_inner();
    let created = service.initialize_year(employee_id, year).await?;
    Ok(HttpResponse::Ok().json(json!({
        "employee_id": employee_id,
        "year": year,
        "created": created
    })))
}
