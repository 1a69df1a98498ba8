use chrono::Duration;

use super::common::*;
use crate::leave::scheduler::AUTO_APPROVAL_COMMENT;
use crate::leave::AutoApprovalScheduler;
use crate::model::leave_application::LeaveStatus;
use crate::model::notification::NotificationKind;

fn scheduler(h: &Harness) -> AutoApprovalScheduler {
    AutoApprovalScheduler::new(h.service.clone())
}

#[actix_web::test]
async fn stale_applications_are_approved_by_the_system() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.clock.advance(Duration::days(5));

    let report = scheduler(&h)
        .approve_stale(h.clock_now(), None)
        .await
        .expect("swept");
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);

    let approved = h.service.application(submitted.id).await.expect("stored");
    assert_eq!(approved.status, LeaveStatus::Approved);
    assert!(approved.reviewed_by_system);
    assert_eq!(approved.reviewer_id, None);
    assert_eq!(approved.comments.as_deref(), Some(AUTO_APPROVAL_COMMENT));

    let balance = h.balance(EMPLOYEE, ANNUAL, 2026).await;
    assert_eq!(balance.used_days, days(3));
    assert_eq!(balance.pending_days, days(0));

    let last = h.notifications.sent().pop().expect("applicant notified");
    assert_eq!(last.recipient_id, EMPLOYEE);
    assert_eq!(last.kind, NotificationKind::LeaveAutoApproved);
}

#[actix_web::test]
async fn repeated_sweeps_change_nothing_more() {
    let h = Harness::new().await;
    h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.clock.advance(Duration::days(6));

    let sweeper = scheduler(&h);
    sweeper.sweep(None).await;
    let after_first = h.balance(EMPLOYEE, ANNUAL, 2026).await;
    let sent_after_first = h.notifications.sent().len();

    sweeper.sweep(None).await;
    let report = sweeper.approve_stale(h.clock_now(), None).await.expect("swept");

    assert_eq!(report.examined, 0);
    assert_eq!(h.balance(EMPLOYEE, ANNUAL, 2026).await, after_first);
    assert_eq!(h.notifications.sent().len(), sent_after_first);
}

#[actix_web::test]
async fn young_applications_are_left_alone() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.clock.advance(Duration::days(5) - Duration::minutes(1));

    let report = scheduler(&h)
        .approve_stale(h.clock_now(), None)
        .await
        .expect("swept");

    assert_eq!(report.examined, 0);
    assert_eq!(
        h.service.application(submitted.id).await.expect("stored").status,
        LeaveStatus::Pending
    );
}

#[actix_web::test]
async fn reminders_go_out_only_inside_the_urgent_window() {
    let h = Harness::new().await;
    h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    let sweeper = scheduler(&h);

    h.clock.advance(Duration::days(3));
    let early = sweeper.send_urgent_reminders(h.clock_now()).await.expect("swept");
    assert_eq!(early.processed, 0);

    h.clock.advance(Duration::days(1));
    let due = sweeper.send_urgent_reminders(h.clock_now()).await.expect("swept");
    assert_eq!(due.processed, 1);
    let reminder = h.notifications.sent().pop().expect("reminder sent");
    assert_eq!(reminder.recipient_id, MANAGER);
    assert_eq!(reminder.kind, NotificationKind::UrgentReminder);

    h.clock.advance(Duration::days(1));
    let late = sweeper.send_urgent_reminders(h.clock_now()).await.expect("swept");
    assert_eq!(late.examined, 0);
}

#[actix_web::test]
async fn cancel_racing_auto_approval_settles_exactly_once() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.clock.advance(Duration::days(5));
    let sweeper = scheduler(&h);
    let now = h.clock_now();

    let (cancelled, report) = futures::join!(
        h.service.cancel(submitted.id, EMPLOYEE),
        sweeper.approve_stale(now, None)
    );

    cancelled.expect("cancel wins or follows approval");
    let report = report.expect("swept");
    assert_eq!(report.failed, 0);

    let stored = h.service.application(submitted.id).await.expect("stored");
    assert_eq!(stored.status, LeaveStatus::Cancelled);
    let balance = h.balance(EMPLOYEE, ANNUAL, 2026).await;
    assert_eq!(balance.used_days, days(0));
    assert_eq!(balance.pending_days, days(0));
}

#[actix_web::test]
async fn sweep_stops_when_shutdown_is_signalled() {
    let h = Harness::new().await;
    h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.clock.advance(Duration::days(5));
    let (tx, rx) = tokio::sync::watch::channel(true);

    let report = scheduler(&h)
        .approve_stale(h.clock_now(), Some(&rx))
        .await
        .expect("swept");

    assert_eq!(report.examined, 0);
    drop(tx);
}

#[actix_web::test]
async fn unresolvable_approver_fails_only_that_reminder() {
    let h = Harness::new().await;
    h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.directory.update(MANAGER, |m| m.is_deleted = true);
    h.clock.advance(Duration::days(4));

    let report = scheduler(&h)
        .send_urgent_reminders(h.clock_now())
        .await
        .expect("swept");

    assert_eq!(report.examined, 1);
    assert_eq!(report.failed, 1);
}
