use actix_web::error::{ErrorForbidden, ErrorUnauthorized};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::leave::LeaveService;
use crate::model::role::Role;

/// Caller identity placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.can_administer_leave() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    pub fn is_hr_or_admin(&self) -> bool {
        self.role.can_administer_leave()
    }

    /// Employee record of the caller: the token's claim, else a directory
    /// lookup by username (the work email).
    pub async fn employee_id(&self, service: &LeaveService) -> actix_web::Result<u64> {
        if let Some(id) = self.employee_id {
            return Ok(id);
        }
        let found = service
            .directory()
            .employee_id_by_email(&self.username)
            .await
            .map_err(crate::leave::LeaveError::from)?;
        found.ok_or_else(|| ErrorForbidden("No employee profile"))
    }
}
