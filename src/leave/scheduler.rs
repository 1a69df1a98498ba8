//! Recurring sweep over pending applications.
//!
//! Each tick runs two independent passes:
//! * reminders to the approver for applications aged `[urgent, auto)` days;
//! * system approval for applications aged `auto` days or more.
//!
//! Items are processed one at a time, each in its own transaction. A failing
//! item is logged and skipped. Shutdown is checked between items, never
//! inside one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::leave::approver::Actor;
use crate::leave::error::LeaveError;
use crate::leave::lifecycle::LeaveService;
use crate::model::leave_application::LeaveApplication;
use crate::model::notification::{Notification, NotificationKind};

pub const AUTO_APPROVAL_COMMENT: &str =
    "Automatically approved by the system: no decision within the approval window";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub processed: usize,
    /// Already decided by someone else before the sweep reached it.
    pub skipped: usize,
    pub failed: usize,
}

pub struct AutoApprovalScheduler {
    service: Arc<LeaveService>,
}

impl AutoApprovalScheduler {
    pub fn new(service: Arc<LeaveService>) -> Self {
        Self { service }
    }

    fn urgent_after(&self) -> Duration {
        Duration::days(self.service.policy().urgent_days)
    }

    fn auto_approve_after(&self) -> Duration {
        Duration::days(self.service.policy().auto_approve_days)
    }

    /// Pending applications whose age is in `[urgent, auto)`; one reminder each.
    pub async fn send_urgent_reminders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, LeaveError> {
        let urgent_after = self.urgent_after();
        let auto_after = self.auto_approve_after();
        let candidates = self
            .service
            .store()
            .pending_applications(now - urgent_after)
            .await?;

        let mut report = SweepReport::default();
        for application in candidates
            .into_iter()
            .filter(|a| now - a.applied_at < auto_after)
        {
            report.examined += 1;
            match self.remind(&application, now).await {
                Ok(()) => report.processed += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        application_id = application.id,
                        employee_id = application.employee_id,
                        error = %err,
                        "Urgent reminder skipped"
                    );
                }
            }
        }
        Ok(report)
    }

    async fn remind(
        &self,
        application: &LeaveApplication,
        now: DateTime<Utc>,
    ) -> Result<(), LeaveError> {
        let approver_id = self.service.resolver().resolve(application.employee_id).await?;
        let hours_left = (application.applied_at + self.auto_approve_after() - now).num_hours();
        self.service
            .deliver(Notification {
                recipient_id: approver_id,
                title: "Urgent: leave request awaiting your decision".to_string(),
                message: format!(
                    "Leave request {} from {} to {} will be approved automatically in about {} hour(s)",
                    application.id, application.start_date, application.end_date, hours_left
                ),
                action_url: format!("/leave/{}", application.id),
                kind: NotificationKind::UrgentReminder,
            })
            .await;
        debug!(application_id = application.id, approver_id, "Urgent reminder sent");
        Ok(())
    }

    /// Approves every pending application at least `auto` days old as the system.
    pub async fn approve_stale(
        &self,
        now: DateTime<Utc>,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<SweepReport, LeaveError> {
        let stale = self
            .service
            .store()
            .pending_applications(now - self.auto_approve_after())
            .await?;

        let mut report = SweepReport::default();
        for application in stale {
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                info!(
                    examined = report.examined,
                    "Shutdown requested, auto-approval sweep stopped"
                );
                break;
            }
            report.examined += 1;
            match self
                .service
                .approve(application.id, Actor::System, Some(AUTO_APPROVAL_COMMENT.to_string()))
                .await
            {
                Ok(_) => report.processed += 1,
                Err(err) if err.is_benign_race() => {
                    report.skipped += 1;
                    debug!(application_id = application.id, error = %err, "Already decided");
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        application_id = application.id,
                        employee_id = application.employee_id,
                        error = %err,
                        "Auto-approval failed"
                    );
                }
            }
        }
        Ok(report)
    }

    /// One full tick. Never fails: listing errors are logged.
    pub async fn sweep(&self, shutdown: Option<&watch::Receiver<bool>>) {
        let now = self.service.clock().now();
        let span = info_span!("leave_sweep", sweep_id = %Uuid::new_v4());
        async {
            match self.send_urgent_reminders(now).await {
                Ok(report) => info!(?report, "Urgent reminder sweep finished"),
                Err(err) => error!(error = %err, "Urgent reminder sweep failed"),
            }
            match self.approve_stale(now, shutdown).await {
                Ok(report) => info!(?report, "Auto-approval sweep finished"),
                Err(err) => error!(error = %err, "Auto-approval sweep failed"),
            }
        }
        .instrument(span)
        .await
    }

    /// Polls until `shutdown` turns true or its sender goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.service.policy().sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.service.policy().sweep_interval.as_secs(),
            "Leave scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if *shutdown.borrow() {
                break;
            }
            self.sweep(Some(&shutdown)).await;
        }

        info!("Leave scheduler stopped");
    }
}
