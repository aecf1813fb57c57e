use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicantId, ApplicationId, ApplicationRecord, Opportunity, OpportunityId};

/// Storage abstraction for application records so the core can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn for_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    fn for_applicant(
        &self,
        applicant_id: &ApplicantId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    fn all(&self) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

/// Read/write access to the postings applications compete for.
pub trait OpportunityRepository: Send + Sync {
    fn fetch_opportunity(&self, id: &OpportunityId)
        -> Result<Option<Opportunity>, RepositoryError>;
    fn update_opportunity(&self, opportunity: Opportunity) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook so callers can tell applicants about promotions and capacity changes.
pub trait PlacementNotifier: Send + Sync {
    fn publish(&self, event: PlacementEvent) -> Result<(), NotifyError>;
}

/// Side-channel notifications emitted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlacementEvent {
    Promoted {
        application_id: ApplicationId,
        applicant_id: ApplicantId,
        opportunity_id: OpportunityId,
    },
    OpportunityFilled {
        opportunity_id: OpportunityId,
    },
    OpportunityReopened {
        opportunity_id: OpportunityId,
    },
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Source of timestamps for `applied_at`, `queued_at`, and waitlist `added_at`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
