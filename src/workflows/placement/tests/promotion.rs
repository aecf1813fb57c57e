use super::common::*;
use crate::workflows::placement::domain::{ApplicationId, ApplicationRecord, ApplicationStatus};
use crate::workflows::placement::memory::{InMemoryApplicationRepository, RecordingNotifier};
use crate::workflows::placement::repository::{ApplicationRepository, PlacementEvent};
use crate::workflows::placement::waitlist::WaitlistBook;
use crate::workflows::placement::{PlacementError, PromotionEngine};

fn stored(id: &str, status: ApplicationStatus) -> ApplicationRecord {
    ApplicationRecord::restore(
        ApplicationId::from(id),
        applicant(id),
        opp("O1"),
        status,
        start(),
        None,
        None,
        false,
    )
}

#[test]
fn promoting_from_an_empty_waitlist_changes_nothing() {
    let harness = build_service(&[("O1", 1)]);
    let offered = harness.offer("ana", "O1");

    let promoted = harness.service.promote_next(&opp("O1")).expect("no error");

    assert!(promoted.is_none());
    assert_eq!(harness.status(&offered), ApplicationStatus::Successful);
    assert!(harness.notifier.events().is_empty());
}

#[test]
fn promotion_refused_when_opportunity_is_full() {
    let harness = build_service(&[("O1", 1)]);
    let queued = harness.submit("ben", "O1");
    harness.confirm("ana", "O1");
    harness
        .service
        .enqueue_waitlist(&opp("O1"), &queued)
        .expect("enqueued");

    match harness.service.promote_next(&opp("O1")) {
        Err(PlacementError::CapacityViolation { .. }) => {}
        other => panic!("expected capacity violation, got {other:?}"),
    }
    assert_eq!(harness.queue("O1"), vec![queued.clone()]);
    assert_eq!(harness.status(&queued), ApplicationStatus::Waitlisted);
}

#[test]
fn promote_next_takes_the_reordered_head() {
    let harness = build_service(&[("O1", 2)]);
    harness.confirm("ana", "O1");
    let x = harness.waitlist("xia", "O1");
    let y = harness.waitlist("yan", "O1");
    let z = harness.waitlist("zed", "O1");
    harness
        .service
        .reorder_waitlist(&opp("O1"), &z, 0)
        .expect("reordered");

    let promotion = harness
        .service
        .promote_next(&opp("O1"))
        .expect("promotion runs")
        .expect("candidate present");

    assert_eq!(promotion.record.application_id, z);
    assert_eq!(promotion.entry.priority, 0);
    assert_eq!(harness.status(&z), ApplicationStatus::Successful);
    let remaining = harness.service.waitlist(&opp("O1"));
    assert_eq!(remaining.len(), 2);
    assert_eq!(
        (remaining[0].application_id.clone(), remaining[0].priority),
        (x, 0)
    );
    assert_eq!(
        (remaining[1].application_id.clone(), remaining[1].priority),
        (y, 1)
    );
}

#[test]
fn manual_promotion_honours_outstanding_offers() {
    let harness = build_service(&[("O1", 2)]);
    let x = harness.waitlist("xia", "O1");
    let y = harness.waitlist("yan", "O1");
    let z = harness.waitlist("zed", "O1");

    let promoted = harness
        .service
        .promote_application(&opp("O1"), &y)
        .expect("manual promotion");
    assert_eq!(promoted.record.status(), ApplicationStatus::Successful);
    assert_eq!(harness.queue("O1"), vec![x.clone(), z.clone()]);

    harness
        .service
        .promote_application(&opp("O1"), &z)
        .expect("second seat");

    match harness.service.promote_application(&opp("O1"), &x) {
        Err(PlacementError::CapacityViolation {
            occupied,
            max_slots,
            ..
        }) => assert_eq!((occupied, max_slots), (2, 2)),
        other => panic!("expected capacity violation, got {other:?}"),
    }
    assert_eq!(harness.status(&x), ApplicationStatus::Waitlisted);
}

#[test]
fn manual_promotion_requires_a_queued_application() {
    let harness = build_service(&[("O1", 2)]);
    let pending = harness.submit("ana", "O1");

    match harness.service.promote_application(&opp("O1"), &pending) {
        Err(PlacementError::NotWaitlisted { application_id, .. }) => {
            assert_eq!(application_id, pending)
        }
        other => panic!("expected not waitlisted, got {other:?}"),
    }
}

#[test]
fn engine_drops_missing_and_stale_entries() {
    let applications = InMemoryApplicationRepository::default();
    let notifier = RecordingNotifier::default();
    applications
        .insert(stored("stale", ApplicationStatus::Withdrawn))
        .expect("inserted");
    applications
        .insert(stored("live", ApplicationStatus::Waitlisted))
        .expect("inserted");

    let mut book = WaitlistBook::default();
    for id in ["ghost", "stale", "live"] {
        book.enqueue(&opp("O1"), ApplicationId::from(id), start())
            .expect("queued");
    }

    let promotion = PromotionEngine::new(&mut book, &applications, &notifier)
        .promote_next(&opp("O1"), start())
        .expect("engine runs")
        .expect("live entry promoted");

    assert_eq!(promotion.record.application_id, ApplicationId::from("live"));
    assert_eq!(book.size(&opp("O1")), 0);
    let stale = applications
        .fetch(&ApplicationId::from("stale"))
        .expect("fetch")
        .expect("present");
    assert_eq!(stale.status(), ApplicationStatus::Withdrawn);
    assert_eq!(
        notifier.events(),
        vec![PlacementEvent::Promoted {
            application_id: ApplicationId::from("live"),
            applicant_id: applicant("live"),
            opportunity_id: opp("O1"),
        }]
    );
}

#[test]
fn engine_keeps_promotion_when_notifier_is_offline() {
    let applications = InMemoryApplicationRepository::default();
    let notifier = OfflineNotifier::default();
    applications
        .insert(stored("live", ApplicationStatus::Waitlisted))
        .expect("inserted");
    let mut book = WaitlistBook::default();
    book.enqueue(&opp("O1"), ApplicationId::from("live"), start())
        .expect("queued");

    PromotionEngine::new(&mut book, &applications, &notifier)
        .promote_next(&opp("O1"), start())
        .expect("engine runs")
        .expect("promoted");

    let record = applications
        .fetch(&ApplicationId::from("live"))
        .expect("fetch")
        .expect("present");
    assert_eq!(record.status(), ApplicationStatus::Successful);
    assert_eq!(*notifier.attempts.lock().expect("attempts"), 1);
}

#[test]
fn failed_store_write_returns_the_head_to_the_waitlist() {
    let memory = InMemoryApplicationRepository::default();
    for id in ["first", "second"] {
        memory
            .insert(stored(id, ApplicationStatus::Waitlisted))
            .expect("inserted");
    }
    let applications = ReadOnlyRepository(memory);
    let notifier = RecordingNotifier::default();
    let mut book = WaitlistBook::default();
    for id in ["first", "second"] {
        book.enqueue(&opp("O1"), ApplicationId::from(id), start())
            .expect("queued");
    }

    let err = PromotionEngine::new(&mut book, &applications, &notifier)
        .promote_next(&opp("O1"), start())
        .expect_err("write refused");

    assert_eq!(err.reason_code(), "repository");
    let order: Vec<(ApplicationId, usize)> = book
        .entries(&opp("O1"))
        .into_iter()
        .map(|entry| (entry.application_id, entry.priority))
        .collect();
    assert_eq!(
        order,
        vec![
            (ApplicationId::from("first"), 0),
            (ApplicationId::from("second"), 1),
        ]
    );
    assert!(notifier.events().is_empty());
}

#[test]
fn failed_manual_promotion_keeps_the_entry_at_its_rank() {
    let memory = InMemoryApplicationRepository::default();
    for id in ["first", "second", "third"] {
        memory
            .insert(stored(id, ApplicationStatus::Waitlisted))
            .expect("inserted");
    }
    let applications = ReadOnlyRepository(memory);
    let notifier = RecordingNotifier::default();
    let mut book = WaitlistBook::default();
    for id in ["first", "second", "third"] {
        book.enqueue(&opp("O1"), ApplicationId::from(id), start())
            .expect("queued");
    }

    PromotionEngine::new(&mut book, &applications, &notifier)
        .promote(&opp("O1"), &ApplicationId::from("second"), start())
        .expect_err("write refused");

    assert_eq!(
        book.position(&opp("O1"), &ApplicationId::from("second")),
        Some(2)
    );
    assert_eq!(book.size(&opp("O1")), 3);
    let record = applications
        .fetch(&ApplicationId::from("second"))
        .expect("fetch")
        .expect("present");
    assert_eq!(record.status(), ApplicationStatus::Waitlisted);
}
