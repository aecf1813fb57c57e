//! End-to-end placement scenarios driven through the public service facade.

mod common {
    use std::sync::Arc;

    use internship_placement::config::PlacementConfig;
    use internship_placement::workflows::placement::{
        ApplicantId, ApplicationId, ApplicationRepository, ApplicationStatus,
        InMemoryApplicationRepository, InMemoryOpportunityRepository, Opportunity, OpportunityId,
        PlacementService, RecordingNotifier,
    };

    pub(super) type Service = PlacementService<
        InMemoryApplicationRepository,
        InMemoryOpportunityRepository,
        RecordingNotifier,
    >;

    pub(super) struct Placement {
        pub(super) service: Service,
        pub(super) applications: Arc<InMemoryApplicationRepository>,
        pub(super) notifier: Arc<RecordingNotifier>,
    }

    pub(super) fn placement(slots: &[(&str, u32)]) -> Placement {
        let applications = Arc::new(InMemoryApplicationRepository::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let opportunities = InMemoryOpportunityRepository::with_opportunities(
            slots.iter().map(|(id, max)| {
                Opportunity::new(OpportunityId::from(*id), "Summer internship", *max)
            }),
        );
        let service = PlacementService::new(
            applications.clone(),
            Arc::new(opportunities),
            notifier.clone(),
            PlacementConfig::default(),
        );
        Placement {
            service,
            applications,
            notifier,
        }
    }

    impl Placement {
        pub(super) fn submit(&self, who: &str, opportunity: &str) -> ApplicationId {
            self.service
                .submit_application(&ApplicantId::from(who), &OpportunityId::from(opportunity))
                .expect("submission accepted")
                .application_id
        }

        pub(super) fn status(&self, id: &ApplicationId) -> ApplicationStatus {
            self.applications
                .fetch(id)
                .expect("fetch succeeds")
                .expect("record present")
                .status()
        }
    }
}

use common::placement;
use internship_placement::workflows::placement::{
    ApplicationStatus, CascadeStep, OpportunityId, PlacementError, PlacementEvent,
};

#[test]
fn offer_acceptance_withdrawal_and_promotion_round() {
    let o1 = OpportunityId::from("O1");
    let env = placement(&[("O1", 1)]);
    let a = env.submit("A", "O1");
    let b = env.submit("B", "O1");

    env.service.decide(&a, true).expect("approve A");
    assert_eq!(env.status(&a), ApplicationStatus::Successful);
    env.service.accept_offer(&a).expect("A accepts");
    assert_eq!(env.status(&a), ApplicationStatus::Confirmed);
    assert_eq!(env.service.occupancy(&o1).expect("occupancy"), 1);

    env.service.enqueue_waitlist(&o1, &b).expect("B waitlisted");
    assert_eq!(env.status(&b), ApplicationStatus::Waitlisted);
    assert_eq!(env.service.waitlist_position(&o1, &b), Some(1));

    let requested = env.service.request_withdrawal(&a).expect("A asks to leave");
    assert_eq!(
        requested.application.previous_status(),
        Some(ApplicationStatus::Confirmed)
    );
    let approved = env.service.resolve_withdrawal(&a, true).expect("approved");

    assert_eq!(env.status(&a), ApplicationStatus::Withdrawn);
    assert_eq!(env.status(&b), ApplicationStatus::Successful);
    assert_eq!(env.service.waitlist_size(&o1), 0);
    assert_eq!(
        approved.promoted().map(|record| record.application_id.clone()),
        Some(b.clone())
    );

    env.service.accept_offer(&b).expect("B accepts the freed seat");
    assert_eq!(env.service.occupancy(&o1).expect("occupancy"), 1);

    let events = env.notifier.events();
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, PlacementEvent::OpportunityFilled { .. }))
            .count(),
        2
    );
}

#[test]
fn batch_approval_offers_free_seats_and_waitlists_overflow() {
    let o1 = OpportunityId::from("O1");
    let o2 = OpportunityId::from("O2");
    let env = placement(&[("O1", 2), ("O2", 1)]);
    let early = env.submit("ana", "O1");
    env.service.decide(&early, true).expect("first offer out");
    let ben = env.submit("ben", "O1");
    let cai = env.submit("cai", "O1");
    let dee = env.submit("dee", "O2");
    let decided = env.submit("eli", "O2");
    env.service.decide(&decided, false).expect("rejected");

    let batch = env
        .service
        .batch_approve(&[ben.clone(), cai.clone(), dee.clone(), decided.clone()])
        .expect("batch runs");

    assert_eq!(batch.approved, vec![ben.clone(), dee.clone()]);
    assert_eq!(batch.waitlisted.len(), 1);
    assert_eq!(batch.waitlisted[0].application_id, cai);
    assert_eq!(batch.skipped, vec![decided]);

    assert_eq!(env.status(&ben), ApplicationStatus::Successful);
    assert_eq!(env.status(&cai), ApplicationStatus::Waitlisted);
    assert_eq!(env.service.waitlist_position(&o1, &cai), Some(1));
    assert_eq!(env.service.waitlist_size(&o2), 0);
}

#[test]
fn withdrawal_rejection_reverts_to_pending() {
    let env = placement(&[("O1", 1)]);
    let c = env.submit("C", "O1");

    env.service.request_withdrawal(&c).expect("requested");
    let outcome = env.service.resolve_withdrawal(&c, false).expect("rejected");

    assert_eq!(outcome.application.status(), ApplicationStatus::Pending);
    assert_eq!(outcome.application.previous_status(), None);
    assert!(matches!(outcome.steps.as_slice(), [CascadeStep::Transition(_)]));
}

#[test]
fn staff_reorder_and_duplicate_enqueue() {
    let o2 = OpportunityId::from("O2");
    let env = placement(&[("O2", 1)]);
    let x = env.submit("X", "O2");
    let y = env.submit("Y", "O2");
    let z = env.submit("Z", "O2");
    for id in [&x, &y, &z] {
        env.service.enqueue_waitlist(&o2, id).expect("queued");
    }

    let reordered = env.service.reorder_waitlist(&o2, &y, 0).expect("moved");
    let order: Vec<_> = reordered
        .iter()
        .map(|entry| (entry.application_id.clone(), entry.priority))
        .collect();
    assert_eq!(order, vec![(y.clone(), 0), (x.clone(), 1), (z.clone(), 2)]);

    let err = env
        .service
        .enqueue_waitlist(&o2, &x)
        .expect_err("already queued");
    assert!(matches!(err, PlacementError::AlreadyWaitlisted { .. }));
    assert_eq!(err.reason_code(), "already_waitlisted");
    assert_eq!(env.service.waitlist(&o2), reordered);
}

#[test]
fn accepting_one_offer_releases_every_other_claim() {
    let env = placement(&[("O1", 1), ("O2", 1), ("O3", 1)]);
    let first = env.submit("ana", "O1");
    let second = env.submit("ana", "O2");
    let third = env.submit("ana", "O3");
    env.service.decide(&first, true).expect("offer");
    env.service.decide(&second, true).expect("offer");
    env.service
        .enqueue_waitlist(&OpportunityId::from("O3"), &third)
        .expect("queued");

    let outcome = env.service.accept_offer(&first).expect("accepted");

    assert_eq!(outcome.withdrawn().len(), 2);
    assert_eq!(env.status(&second), ApplicationStatus::Withdrawn);
    assert_eq!(env.status(&third), ApplicationStatus::Withdrawn);
    assert_eq!(env.service.waitlist_size(&OpportunityId::from("O3")), 0);
    assert_eq!(
        env.service
            .capacity(&OpportunityId::from("O2"))
            .expect("capacity")
            .offered,
        0
    );
}

#[test]
fn lifecycle_outcome_serializes_for_callers() {
    let env = placement(&[("O1", 1)]);
    let id = env.submit("ana", "O1");
    let outcome = env.service.decide(&id, true).expect("approved");

    let json = serde_json::to_value(&outcome).expect("serializes");
    assert_eq!(json["application"]["status"], "successful");
    assert_eq!(json["steps"][0]["step"], "transition");
    assert_eq!(json["steps"][0]["from"], "pending");
}
