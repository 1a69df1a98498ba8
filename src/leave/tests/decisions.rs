use chrono::Duration;

use super::common::*;
use crate::leave::{Actor, CancelCutoff, LeaveError, LeavePolicy};
use crate::model::leave_application::LeaveStatus;
use crate::model::notification::NotificationKind;

#[actix_web::test]
async fn manager_approval_moves_pending_to_used() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.clock.advance(Duration::hours(3));

    let approved = h
        .service
        .approve(submitted.id, Actor::Employee(MANAGER), Some("Enjoy".to_string()))
        .await
        .expect("approved");

    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(approved.reviewer_id, Some(MANAGER));
    assert!(!approved.reviewed_by_system);
    assert_eq!(approved.reviewed_at, Some(monday_morning() + Duration::hours(3)));
    assert_eq!(approved.comments.as_deref(), Some("Enjoy"));

    let balance = h.balance(EMPLOYEE, ANNUAL, 2026).await;
    assert_eq!(balance.pending_days, days(0));
    assert_eq!(balance.used_days, days(3));
    assert_eq!(balance.available_days(), days(12));

    let last = h.notifications.sent().pop().expect("applicant notified");
    assert_eq!(last.recipient_id, EMPLOYEE);
    assert_eq!(last.kind, NotificationKind::LeaveApproved);
}

#[actix_web::test]
async fn rejection_releases_the_reservation() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");

    let rejected = h
        .service
        .reject(submitted.id, Actor::Employee(MANAGER), Some("Quarter end".to_string()))
        .await
        .expect("rejected");

    assert_eq!(rejected.status, LeaveStatus::Rejected);
    assert_eq!(rejected.reviewer_id, Some(MANAGER));
    let balance = h.balance(EMPLOYEE, ANNUAL, 2026).await;
    assert_eq!(balance.pending_days, days(0));
    assert_eq!(balance.used_days, days(0));

    let last = h.notifications.sent().pop().expect("applicant notified");
    assert_eq!(last.kind, NotificationKind::LeaveRejected);

    let again = h
        .service
        .approve(submitted.id, Actor::Employee(MANAGER), None)
        .await;
    assert!(matches!(
        again,
        Err(LeaveError::InvalidStateTransition {
            from: LeaveStatus::Rejected,
            to: LeaveStatus::Approved,
            ..
        })
    ));
}

#[actix_web::test]
async fn only_the_line_manager_may_decide() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");

    for actor_id in [OTHER_MANAGER, EMPLOYEE] {
        let result = h
            .service
            .approve(submitted.id, Actor::Employee(actor_id), None)
            .await;
        assert!(matches!(
            result,
            Err(LeaveError::NotAuthorized { actor_id: a, .. }) if a == actor_id
        ));
    }

    let unchanged = h.service.application(submitted.id).await.expect("stored");
    assert_eq!(unchanged.status, LeaveStatus::Pending);
    assert_eq!(h.balance(EMPLOYEE, ANNUAL, 2026).await.pending_days, days(3));
}

#[actix_web::test]
async fn cancelling_pending_leave_restores_the_balance() {
    let h = Harness::new().await;
    let before = {
        h.service.balances(EMPLOYEE, 2026).await.expect("opened");
        h.balance(EMPLOYEE, ANNUAL, 2026).await
    };

    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    let cancelled = h.service.cancel(submitted.id, EMPLOYEE).await.expect("cancelled");

    assert_eq!(cancelled.status, LeaveStatus::Cancelled);
    assert_eq!(h.balance(EMPLOYEE, ANNUAL, 2026).await, before);

    let last = h.notifications.sent().pop().expect("manager notified");
    assert_eq!(last.recipient_id, MANAGER);
    assert_eq!(last.kind, NotificationKind::LeaveCancelled);
}

#[actix_web::test]
async fn cancelling_approved_leave_before_it_starts_restores_used_days() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.service
        .approve(submitted.id, Actor::Employee(MANAGER), None)
        .await
        .expect("approved");

    h.service.cancel(submitted.id, EMPLOYEE).await.expect("cancelled");

    let balance = h.balance(EMPLOYEE, ANNUAL, 2026).await;
    assert_eq!(balance.used_days, days(0));
    assert_eq!(balance.pending_days, days(0));
    assert_eq!(balance.available_days(), days(15));
}

#[actix_web::test]
async fn approved_leave_cannot_be_cancelled_once_started() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.service
        .approve(submitted.id, Actor::Employee(MANAGER), None)
        .await
        .expect("approved");
    h.clock.set(monday_morning() + Duration::days(7));

    let result = h.service.cancel(submitted.id, EMPLOYEE).await;
    assert!(matches!(result, Err(LeaveError::NotCancellable { .. })));
    assert_eq!(h.balance(EMPLOYEE, ANNUAL, 2026).await.used_days, days(3));
}

#[actix_web::test]
async fn start_day_cutoff_still_allows_cancelling_on_the_first_day() {
    let h = Harness::with_policy(LeavePolicy {
        cancel_cutoff: CancelCutoff::StartDay,
        ..LeavePolicy::default()
    })
    .await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.service
        .approve(submitted.id, Actor::Employee(MANAGER), None)
        .await
        .expect("approved");
    h.clock.set(monday_morning() + Duration::days(7));

    h.service
        .cancel(submitted.id, EMPLOYEE)
        .await
        .expect("cancelled on the first day");
}

#[actix_web::test]
async fn only_the_applicant_may_cancel() {
    let h = Harness::new().await;
    let submitted = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");

    let result = h.service.cancel(submitted.id, MANAGER).await;
    assert!(matches!(result, Err(LeaveError::NotAuthorized { .. })));

    h.service.cancel(submitted.id, EMPLOYEE).await.expect("cancelled");
    let twice = h.service.cancel(submitted.id, EMPLOYEE).await;
    assert!(matches!(twice, Err(LeaveError::InvalidStateTransition { .. })));
}

#[actix_web::test]
async fn manager_sees_pending_requests_of_direct_reports() {
    let h = Harness::new().await;
    h.hire(20, 400);
    let first = h.service.submit(EMPLOYEE, three_days()).await.expect("submitted");
    h.clock.advance(Duration::minutes(5));
    let second = h
        .service
        .submit(20, request(ANNUAL, date(2026, 3, 16), date(2026, 3, 16)))
        .await
        .expect("submitted");

    let pending = h.service.pending_for_approver(MANAGER).await.expect("listed");
    let ids: Vec<u64> = pending.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    assert!(
        h.service
            .pending_for_approver(OTHER_MANAGER)
            .await
            .expect("listed")
            .is_empty()
    );
}
