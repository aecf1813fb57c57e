//! In-process collaborators used by the CLI demo and the test suites.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::domain::{ApplicantId, ApplicationId, ApplicationRecord, Opportunity, OpportunityId};
use super::repository::{
    ApplicationRepository, Clock, NotifyError, OpportunityRepository, PlacementEvent,
    PlacementNotifier, RepositoryError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<BTreeMap<ApplicationId, ApplicationRecord>>>,
}

impl InMemoryApplicationRepository {
    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }

    fn matching<F>(&self, predicate: F) -> Vec<ApplicationRecord>
    where
        F: Fn(&ApplicationRecord) -> bool,
    {
        lock(&self.records)
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = lock(&self.records);
        if guard.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records);
        match guard.get_mut(&record.application_id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(lock(&self.records).get(id).cloned())
    }

    fn for_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self.matching(|record| &record.opportunity_id == opportunity_id))
    }

    fn for_applicant(
        &self,
        applicant_id: &ApplicantId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self.matching(|record| &record.applicant_id == applicant_id))
    }

    fn all(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self.matching(|_| true))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryOpportunityRepository {
    opportunities: Arc<Mutex<BTreeMap<OpportunityId, Opportunity>>>,
}

impl InMemoryOpportunityRepository {
    pub fn with_opportunities(opportunities: impl IntoIterator<Item = Opportunity>) -> Self {
        let repository = Self::default();
        {
            let mut guard = lock(&repository.opportunities);
            for opportunity in opportunities {
                guard.insert(opportunity.opportunity_id.clone(), opportunity);
            }
        }
        repository
    }

    pub fn add(&self, opportunity: Opportunity) {
        lock(&self.opportunities).insert(opportunity.opportunity_id.clone(), opportunity);
    }
}

impl OpportunityRepository for InMemoryOpportunityRepository {
    fn fetch_opportunity(
        &self,
        id: &OpportunityId,
    ) -> Result<Option<Opportunity>, RepositoryError> {
        Ok(lock(&self.opportunities).get(id).cloned())
    }

    fn update_opportunity(&self, opportunity: Opportunity) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.opportunities);
        match guard.get_mut(&opportunity.opportunity_id) {
            Some(slot) => {
                *slot = opportunity;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Notifier that keeps every published event for later inspection.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<PlacementEvent>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<PlacementEvent> {
        lock(&self.events).clone()
    }
}

impl PlacementNotifier for RecordingNotifier {
    fn publish(&self, event: PlacementEvent) -> Result<(), NotifyError> {
        lock(&self.events).push(event);
        Ok(())
    }
}

/// Clock that returns a fixed instant, advanced manually.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = lock(&self.now);
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}
