//! Internship placement core: application lifecycle, capacity, waitlists, and promotion.
//!
//! The application repository is the only owner of application records. Waitlists
//! and cascades refer to applications by id and re-read the store, so a status
//! change is visible to every reader as soon as it is committed.

pub mod capacity;
pub mod domain;
pub(crate) mod intake;
pub mod lifecycle;
pub mod memory;
pub mod pipeline;
pub mod promotion;
pub mod repository;
pub mod service;
pub mod waitlist;

#[cfg(test)]
mod tests;

pub use capacity::CapacitySnapshot;
pub use domain::{
    ApplicantId, ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationStatusView,
    Opportunity, OpportunityId, OpportunityStatus,
};
pub use intake::SubmissionRejection;
pub use lifecycle::{InvalidTransition, LifecycleEvent, StatusChange};
pub use memory::{
    InMemoryApplicationRepository, InMemoryOpportunityRepository, ManualClock, RecordingNotifier,
};
pub use pipeline::{CascadeStep, LifecycleOutcome};
pub use promotion::{Promotion, PromotionEngine};
pub use repository::{
    ApplicationRepository, Clock, NotifyError, OpportunityRepository, PlacementEvent,
    PlacementNotifier, RepositoryError, SystemClock,
};
pub use service::{BatchApproval, PlacementError, PlacementService};
pub use waitlist::{ReorderError, WaitlistBook, WaitlistEntry};
