use std::fmt;
use std::sync::Arc;

use crate::leave::error::LeaveError;
use crate::model::employee::Employee;
use crate::model::leave_application::LeaveApplication;
use crate::store::EmployeeDirectory;

/// Who is performing a transition. `System` is the scheduler's identity and
/// bypasses the line-manager check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Employee(u64),
    System,
}

impl Actor {
    pub fn employee_id(self) -> Option<u64> {
        match self {
            Actor::Employee(id) => Some(id),
            Actor::System => None,
        }
    }

    pub fn is_system(self) -> bool {
        matches!(self, Actor::System)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Employee(id) => write!(f, "employee:{id}"),
            Actor::System => write!(f, "system"),
        }
    }
}

/// Maps an employee to the one line manager allowed to decide their leave.
#[derive(Clone)]
pub struct ApproverResolver {
    directory: Arc<dyn EmployeeDirectory>,
}

impl ApproverResolver {
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, employee_id: u64) -> Result<u64, LeaveError> {
        let employee = self
            .directory
            .employee(employee_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("employee", employee_id))?;
        self.resolve_for(&employee).await
    }

    /// Never falls back to HR: a missing or deleted manager is an error.
    pub async fn resolve_for(&self, employee: &Employee) -> Result<u64, LeaveError> {
        let manager_id = employee
            .line_manager_id
            .ok_or(LeaveError::NoManagerAssigned {
                employee_id: employee.id,
            })?;

        match self.directory.employee(manager_id).await? {
            Some(manager) if !manager.is_deleted => Ok(manager.id),
            _ => Err(LeaveError::ManagerInactive {
                employee_id: employee.id,
                manager_id,
            }),
        }
    }

    /// Line-manager relation only; roles are checked elsewhere.
    pub async fn can_approve(
        &self,
        actor_id: u64,
        application: &LeaveApplication,
    ) -> Result<bool, LeaveError> {
        match self.resolve(application.employee_id).await {
            Ok(approver_id) => Ok(approver_id == actor_id),
            Err(LeaveError::NoManagerAssigned { .. } | LeaveError::ManagerInactive { .. }) => {
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }
}
