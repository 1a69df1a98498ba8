//! Leave application state machine.
//!
//! ```text
//! Pending ──approve──▶ Approved ──cancel──▶ Cancelled
//!    │                                        ▲
//!    ├────reject────▶ Rejected                │
//!    └────────────────cancel──────────────────┘
//! ```
//!
//! Each transition reads, checks and writes the application and its balance
//! row inside one `LeaveTx`, so a racing transition on the same application
//! sees the committed status and fails its precondition instead of adjusting
//! the ledger twice.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::leave::accrual::{self, Eligibility};
use crate::leave::approver::{Actor, ApproverResolver};
use crate::leave::calendar;
use crate::leave::error::LeaveError;
use crate::leave::ledger;
use crate::leave::LeavePolicy;
use crate::model::employee::Employee;
use crate::model::leave_application::{LeaveApplication, LeaveStatus, NewLeaveApplication};
use crate::model::leave_type::LeaveType;
use crate::model::notification::{Notification, NotificationKind};
use crate::store::{Clock, EmployeeDirectory, LeaveStore, NotificationSink};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitLeave {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-03-09", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-11", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    #[schema(example = "Family visit")]
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn status(self) -> LeaveStatus {
        match self {
            Decision::Approve => LeaveStatus::Approved,
            Decision::Reject => LeaveStatus::Rejected,
        }
    }
}

fn ensure_transition(application: &LeaveApplication, to: LeaveStatus) -> Result<(), LeaveError> {
    if application.status.can_become(to) {
        Ok(())
    } else {
        Err(LeaveError::InvalidStateTransition {
            application_id: application.id,
            from: application.status,
            to,
        })
    }
}

fn action_url(application_id: u64) -> String {
    format!("/leave/{application_id}")
}

pub struct LeaveService {
    store: Arc<dyn LeaveStore>,
    directory: Arc<dyn EmployeeDirectory>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    resolver: ApproverResolver,
    policy: LeavePolicy,
    leave_types: Cache<u64, LeaveType>,
}

impl LeaveService {
    pub fn new(
        store: Arc<dyn LeaveStore>,
        directory: Arc<dyn EmployeeDirectory>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        policy: LeavePolicy,
    ) -> Self {
        let leave_types = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(policy.leave_type_cache_ttl)
            .build();
        Self {
            resolver: ApproverResolver::new(Arc::clone(&directory)),
            store,
            directory,
            notifications,
            clock,
            policy,
            leave_types,
        }
    }

    pub fn store(&self) -> &dyn LeaveStore {
        self.store.as_ref()
    }

    pub fn directory(&self) -> &dyn EmployeeDirectory {
        self.directory.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn resolver(&self) -> &ApproverResolver {
        &self.resolver
    }

    pub fn policy(&self) -> &LeavePolicy {
        &self.policy
    }

    /// Reference data, served from cache.
    pub async fn leave_type(&self, id: u64) -> Result<LeaveType, LeaveError> {
        if let Some(cached) = self.leave_types.get(&id).await {
            return Ok(cached);
        }
        let leave_type = self
            .store
            .leave_type(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave type", id))?;
        self.leave_types.insert(id, leave_type.clone()).await;
        Ok(leave_type)
    }

    pub async fn employee(&self, id: u64) -> Result<Employee, LeaveError> {
        self.directory
            .employee(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("employee", id))
    }

    pub async fn application(&self, id: u64) -> Result<LeaveApplication, LeaveError> {
        self.store
            .application(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application", id))
    }

    pub async fn applications_for_employee(
        &self,
        employee_id: u64,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        Ok(self.store.applications_for_employee(employee_id).await?)
    }

    /// Pending applications of everyone whose line manager is `manager_id`.
    pub async fn pending_for_approver(
        &self,
        manager_id: u64,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        let mut pending = Vec::new();
        for employee_id in self.directory.direct_reports(manager_id).await? {
            pending.extend(
                self.store
                    .applications_for_employee(employee_id)
                    .await?
                    .into_iter()
                    .filter(|a| a.status == LeaveStatus::Pending),
            );
        }
        pending.sort_by_key(|a| (a.applied_at, a.id));
        Ok(pending)
    }

    #[instrument(skip(self, request), fields(leave_type_id = request.leave_type_id))]
    pub async fn submit(
        &self,
        employee_id: u64,
        request: SubmitLeave,
    ) -> Result<LeaveApplication, LeaveError> {
        if request.end_date < request.start_date {
            return Err(LeaveError::Validation(
                "end_date cannot be before start_date".to_string(),
            ));
        }

        let leave_type = self.leave_type(request.leave_type_id).await?;
        if !leave_type.is_active {
            return Err(LeaveError::Validation(format!(
                "leave type {} is not active",
                leave_type.name
            )));
        }

        let working_days = calendar::working_days_between(request.start_date, request.end_date);
        if working_days == 0 {
            return Err(LeaveError::Validation(
                "requested range contains no working days".to_string(),
            ));
        }
        let days = Decimal::from(working_days);

        let employee = self.employee(employee_id).await?;
        let approver_id = self.resolver.resolve_for(&employee).await?;

        let now = self.clock.now();
        let today = now.date_naive();
        if let Eligibility::NotYet {
            days_employed,
            required_days,
        } = accrual::eligibility(leave_type.category(), employee.hire_date, today)
        {
            return Err(LeaveError::NotEligible {
                leave_type: leave_type.name.clone(),
                days_employed,
                required_days,
            });
        }

        let mut tx = self.store.begin().await?;
        tx.lock_employee(employee_id).await?;

        if let Some(existing) = tx
            .overlapping(employee_id, request.start_date, request.end_date)
            .await?
            .first()
        {
            return Err(LeaveError::OverlapConflict {
                existing: existing.id,
            });
        }

        let year = request.start_date.year();
        let (mut balance, _) = ledger::open_balance(
            tx.as_mut(),
            &leave_type,
            &employee,
            year,
            today,
            self.policy.carry_forward_cap,
        )
        .await?;

        let auto_approved = !leave_type.requires_approval;
        if auto_approved {
            ledger::consume(&mut balance, days)?;
        } else {
            ledger::reserve(&mut balance, days)?;
        }

        let application = tx
            .insert_application(NewLeaveApplication {
                employee_id,
                leave_type_id: leave_type.id,
                start_date: request.start_date,
                end_date: request.end_date,
                total_days: days,
                reason: request.reason,
                status: if auto_approved {
                    LeaveStatus::Approved
                } else {
                    LeaveStatus::Pending
                },
                applied_at: now,
                reviewed_by_system: auto_approved,
                reviewed_at: auto_approved.then_some(now),
                comments: None,
            })
            .await?;
        tx.save_balance(&balance).await?;
        tx.commit().await?;

        info!(
            application_id = application.id,
            employee_id,
            leave_type_id = leave_type.id,
            days = %days,
            to = application.status.as_str(),
            actor = %Actor::Employee(employee_id),
            "Leave application submitted"
        );

        let notification = if auto_approved {
            Notification {
                recipient_id: employee_id,
                title: "Leave auto-approved".to_string(),
                message: format!(
                    "Your {} request from {} to {} needs no approval and was recorded",
                    leave_type.name, application.start_date, application.end_date
                ),
                action_url: action_url(application.id),
                kind: NotificationKind::LeaveAutoApproved,
            }
        } else {
            Notification {
                recipient_id: approver_id,
                title: "Leave request awaiting approval".to_string(),
                message: format!(
                    "{} requested {} day(s) of {} from {} to {}",
                    employee.email,
                    days,
                    leave_type.name,
                    application.start_date,
                    application.end_date
                ),
                action_url: action_url(application.id),
                kind: NotificationKind::LeaveSubmitted,
            }
        };
        self.deliver(notification).await;

        Ok(application)
    }

    pub async fn approve(
        &self,
        application_id: u64,
        actor: Actor,
        comments: Option<String>,
    ) -> Result<LeaveApplication, LeaveError> {
        self.decide(application_id, actor, Decision::Approve, comments)
            .await
    }

    pub async fn reject(
        &self,
        application_id: u64,
        actor: Actor,
        comments: Option<String>,
    ) -> Result<LeaveApplication, LeaveError> {
        self.decide(application_id, actor, Decision::Reject, comments)
            .await
    }

    #[instrument(skip(self, actor, comments), fields(actor = %actor))]
    async fn decide(
        &self,
        application_id: u64,
        actor: Actor,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<LeaveApplication, LeaveError> {
        let snapshot = self.application(application_id).await?;
        if let Actor::Employee(actor_id) = actor {
            if !self.resolver.can_approve(actor_id, &snapshot).await? {
                return Err(LeaveError::NotAuthorized {
                    actor_id,
                    application_id,
                });
            }
        }
        let leave_type = self.leave_type(snapshot.leave_type_id).await?;
        let employee = self.employee(snapshot.employee_id).await?;

        let now = self.clock.now();
        let to = decision.status();

        let mut tx = self.store.begin().await?;
        let mut application = tx
            .application(application_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application", application_id))?;
        ensure_transition(&application, to)?;

        let (mut balance, _) = ledger::open_balance(
            tx.as_mut(),
            &leave_type,
            &employee,
            application.balance_year(),
            now.date_naive(),
            self.policy.carry_forward_cap,
        )
        .await?;
        match decision {
            Decision::Approve => ledger::settle_pending(&mut balance, application.total_days)?,
            Decision::Reject => ledger::release_pending(&mut balance, application.total_days)?,
        }

        let from = application.status;
        application.status = to;
        application.reviewer_id = actor.employee_id();
        application.reviewed_by_system = actor.is_system();
        application.reviewed_at = Some(now);
        application.comments = comments;

        tx.save_balance(&balance).await?;
        tx.save_application(&application).await?;
        tx.commit().await?;

        info!(
            application_id,
            employee_id = application.employee_id,
            leave_type_id = application.leave_type_id,
            days = %application.total_days,
            from = from.as_str(),
            to = to.as_str(),
            actor = %actor,
            "Leave application decided"
        );

        let (title, kind) = match (decision, actor) {
            (Decision::Approve, Actor::System) => {
                ("Leave auto-approved", NotificationKind::LeaveAutoApproved)
            }
            (Decision::Approve, Actor::Employee(_)) => {
                ("Leave approved", NotificationKind::LeaveApproved)
            }
            (Decision::Reject, _) => ("Leave rejected", NotificationKind::LeaveRejected),
        };
        self.deliver(Notification {
            recipient_id: application.employee_id,
            title: title.to_string(),
            message: format!(
                "Your {} request from {} to {} was {}",
                leave_type.name,
                application.start_date,
                application.end_date,
                to.as_str()
            ),
            action_url: action_url(application_id),
            kind,
        })
        .await;

        Ok(application)
    }

    /// Only the applicant may cancel. Approved leave is cancellable until the
    /// configured cutoff relative to its start date.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        application_id: u64,
        employee_id: u64,
    ) -> Result<LeaveApplication, LeaveError> {
        let snapshot = self.application(application_id).await?;
        if snapshot.employee_id != employee_id {
            return Err(LeaveError::NotAuthorized {
                actor_id: employee_id,
                application_id,
            });
        }
        let leave_type = self.leave_type(snapshot.leave_type_id).await?;
        let employee = self.employee(employee_id).await?;
        let today = self.clock.today();

        let mut tx = self.store.begin().await?;
        let mut application = tx
            .application(application_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave application", application_id))?;
        ensure_transition(&application, LeaveStatus::Cancelled)?;

        let from = application.status;
        if from == LeaveStatus::Approved
            && !self.policy.cancel_cutoff.allows(application.start_date, today)
        {
            return Err(LeaveError::NotCancellable {
                application_id,
                reason: "leave has already started",
            });
        }

        let (mut balance, _) = ledger::open_balance(
            tx.as_mut(),
            &leave_type,
            &employee,
            application.balance_year(),
            today,
            self.policy.carry_forward_cap,
        )
        .await?;
        if from == LeaveStatus::Approved {
            ledger::restore_used(&mut balance, application.total_days)?;
        } else {
            ledger::release_pending(&mut balance, application.total_days)?;
        }
        application.status = LeaveStatus::Cancelled;

        tx.save_balance(&balance).await?;
        tx.save_application(&application).await?;
        tx.commit().await?;

        info!(
            application_id,
            employee_id,
            leave_type_id = application.leave_type_id,
            days = %application.total_days,
            from = from.as_str(),
            to = LeaveStatus::Cancelled.as_str(),
            actor = %Actor::Employee(employee_id),
            "Leave application cancelled"
        );

        match self.resolver.resolve_for(&employee).await {
            Ok(approver_id) => {
                self.deliver(Notification {
                    recipient_id: approver_id,
                    title: "Leave cancelled".to_string(),
                    message: format!(
                        "{} cancelled {} from {} to {}",
                        employee.email,
                        leave_type.name,
                        application.start_date,
                        application.end_date
                    ),
                    action_url: action_url(application_id),
                    kind: NotificationKind::LeaveCancelled,
                })
                .await
            }
            Err(err) => warn!(
                application_id,
                error = %err,
                "No approver to notify of cancellation"
            ),
        }

        Ok(application)
    }

    /// Delivery failures never undo a committed transition.
    pub(crate) async fn deliver(&self, notification: Notification) {
        let recipient_id = notification.recipient_id;
        let kind = notification.kind.as_str();
        if let Err(err) = self.notifications.notify(notification).await {
            warn!(recipient_id, kind, error = %err, "Notification delivery failed");
        }
    }
}
