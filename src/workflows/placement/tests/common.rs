use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::PlacementConfig;
use crate::workflows::placement::domain::{
    ApplicantId, ApplicationId, ApplicationRecord, ApplicationStatus, Opportunity, OpportunityId,
};
use crate::workflows::placement::memory::{
    InMemoryApplicationRepository, InMemoryOpportunityRepository, ManualClock, RecordingNotifier,
};
use crate::workflows::placement::repository::{
    ApplicationRepository, NotifyError, PlacementEvent, PlacementNotifier, RepositoryError,
};
use crate::workflows::placement::PlacementService;

pub(super) type TestService = PlacementService<
    InMemoryApplicationRepository,
    InMemoryOpportunityRepository,
    RecordingNotifier,
>;

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 3, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn opp(raw: &str) -> OpportunityId {
    OpportunityId::from(raw)
}

pub(super) fn applicant(raw: &str) -> ApplicantId {
    ApplicantId::from(raw)
}

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) applications: Arc<InMemoryApplicationRepository>,
    pub(super) opportunities: Arc<InMemoryOpportunityRepository>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) clock: ManualClock,
}

/// Service over in-memory stores seeded with `(opportunity id, max slots)` pairs.
pub(super) fn build_service(slots: &[(&str, u32)]) -> Harness {
    let applications = Arc::new(InMemoryApplicationRepository::default());
    let opportunities = Arc::new(InMemoryOpportunityRepository::with_opportunities(
        slots
            .iter()
            .map(|(id, max)| Opportunity::new(opp(id), format!("{id} internship"), *max)),
    ));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = ManualClock::starting_at(start());
    let service = PlacementService::new(
        applications.clone(),
        opportunities.clone(),
        notifier.clone(),
        PlacementConfig::default(),
    )
    .with_clock(Arc::new(clock.clone()));

    Harness {
        service,
        applications,
        opportunities,
        notifier,
        clock,
    }
}

impl Harness {
    pub(super) fn tick(&self) {
        self.clock.advance(Duration::minutes(1));
    }

    pub(super) fn submit(&self, who: &str, opportunity: &str) -> ApplicationId {
        self.tick();
        self.service
            .submit_application(&applicant(who), &opp(opportunity))
            .expect("submission accepted")
            .application_id
    }

    /// Submitted and approved: holds an outstanding offer.
    pub(super) fn offer(&self, who: &str, opportunity: &str) -> ApplicationId {
        let id = self.submit(who, opportunity);
        self.service.decide(&id, true).expect("approval succeeds");
        id
    }

    /// Every applicant submits before any offer goes out, so offers may outnumber slots.
    pub(super) fn offers(&self, who: &[&str], opportunity: &str) -> Vec<ApplicationId> {
        let ids: Vec<ApplicationId> = who
            .iter()
            .map(|name| self.submit(name, opportunity))
            .collect();
        for id in &ids {
            self.service.decide(id, true).expect("approval succeeds");
        }
        ids
    }

    pub(super) fn confirm(&self, who: &str, opportunity: &str) -> ApplicationId {
        let id = self.offer(who, opportunity);
        self.service.accept_offer(&id).expect("offer accepted");
        id
    }

    pub(super) fn waitlist(&self, who: &str, opportunity: &str) -> ApplicationId {
        let id = self.submit(who, opportunity);
        self.service
            .enqueue_waitlist(&opp(opportunity), &id)
            .expect("enqueued");
        id
    }

    pub(super) fn record(&self, id: &ApplicationId) -> ApplicationRecord {
        self.applications
            .fetch(id)
            .expect("fetch succeeds")
            .expect("record present")
    }

    pub(super) fn status(&self, id: &ApplicationId) -> ApplicationStatus {
        self.record(id).status()
    }

    pub(super) fn queue(&self, opportunity: &str) -> Vec<ApplicationId> {
        self.service
            .waitlist(&opp(opportunity))
            .into_iter()
            .map(|entry| entry.application_id)
            .collect()
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_opportunity(
        &self,
        _opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_applicant(
        &self,
        _applicant_id: &ApplicantId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Store that serves reads from memory but refuses every write.
pub(super) struct ReadOnlyRepository(pub(super) InMemoryApplicationRepository);

impl ApplicationRepository for ReadOnlyRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("replica is read-only".to_string()))
    }

    fn update(&self, _record: ApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("replica is read-only".to_string()))
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.0.fetch(id)
    }

    fn for_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.0.for_opportunity(opportunity_id)
    }

    fn for_applicant(
        &self,
        applicant_id: &ApplicantId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.0.for_applicant(applicant_id)
    }

    fn all(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.0.all()
    }
}

/// Notifier whose transport is always down; counts attempts.
#[derive(Default)]
pub(super) struct OfflineNotifier {
    pub(super) attempts: Mutex<usize>,
}

impl PlacementNotifier for OfflineNotifier {
    fn publish(&self, _event: PlacementEvent) -> Result<(), NotifyError> {
        *self.attempts.lock().expect("attempt mutex poisoned") += 1;
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}
