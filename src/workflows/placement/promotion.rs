use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{ApplicationId, ApplicationRecord, OpportunityId};
use super::lifecycle::{self, LifecycleEvent};
use super::repository::{ApplicationRepository, PlacementEvent, PlacementNotifier};
use super::service::PlacementError;
use super::waitlist::{WaitlistBook, WaitlistEntry};

/// A waitlisted application that has been granted an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub opportunity_id: OpportunityId,
    pub entry: WaitlistEntry,
    pub record: ApplicationRecord,
}

/// Moves waitlist heads to `Successful` once a slot frees up.
///
/// Promotion stops at `Successful`: the applicant still accepts through the normal
/// offer step. Capacity checks belong to the caller; the engine only pulls from the
/// queue and drives the lifecycle.
pub struct PromotionEngine<'a, R: ?Sized, N: ?Sized> {
    book: &'a mut WaitlistBook,
    applications: &'a R,
    notifier: &'a N,
}

impl<'a, R, N> PromotionEngine<'a, R, N>
where
    R: ApplicationRepository + ?Sized,
    N: PlacementNotifier + ?Sized,
{
    pub fn new(book: &'a mut WaitlistBook, applications: &'a R, notifier: &'a N) -> Self {
        Self {
            book,
            applications,
            notifier,
        }
    }

    /// Promote the minimum-priority entry, or `None` when the waitlist is empty.
    ///
    /// Entries whose record vanished or is no longer `Waitlisted` are dropped and
    /// the next entry is tried. A store failure puts the popped entry back.
    pub fn promote_next(
        &mut self,
        opportunity_id: &OpportunityId,
        now: DateTime<Utc>,
    ) -> Result<Option<Promotion>, PlacementError> {
        while let Some(entry) = self.book.pop_next(opportunity_id) {
            let record = match self.applications.fetch(&entry.application_id) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    warn!(
                        application_id = %entry.application_id,
                        opportunity_id = %opportunity_id,
                        "dropping waitlist entry without a stored application"
                    );
                    continue;
                }
                Err(err) => {
                    self.book.reinsert(opportunity_id, entry);
                    return Err(err.into());
                }
            };

            match self.grant(opportunity_id, entry, record, now)? {
                Some(promotion) => return Ok(Some(promotion)),
                None => continue,
            }
        }

        Ok(None)
    }

    /// Promote one specific queued application regardless of its rank.
    pub fn promote(
        &mut self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<Promotion, PlacementError> {
        let record = self
            .applications
            .fetch(application_id)?
            .ok_or_else(|| PlacementError::ApplicationNotFound(application_id.clone()))?;
        let entry = self.book.remove(opportunity_id, application_id).ok_or_else(|| {
            PlacementError::NotWaitlisted {
                opportunity_id: opportunity_id.clone(),
                application_id: application_id.clone(),
            }
        })?;

        let from = record.status();
        self.grant(opportunity_id, entry, record, now)?
            .ok_or(PlacementError::InvalidTransition(lifecycle::InvalidTransition {
                from,
                event: LifecycleEvent::Promote,
            }))
    }

    fn grant(
        &mut self,
        opportunity_id: &OpportunityId,
        entry: WaitlistEntry,
        mut record: ApplicationRecord,
        now: DateTime<Utc>,
    ) -> Result<Option<Promotion>, PlacementError> {
        if let Err(err) = lifecycle::apply(&mut record, LifecycleEvent::Promote, now) {
            warn!(
                application_id = %entry.application_id,
                opportunity_id = %opportunity_id,
                error = %err,
                "dropping stale waitlist entry"
            );
            return Ok(None);
        }

        if let Err(err) = self.applications.update(record.clone()) {
            warn!(
                application_id = %entry.application_id,
                opportunity_id = %opportunity_id,
                error = %err,
                "promotion not stored, entry returned to waitlist"
            );
            self.book.reinsert(opportunity_id, entry);
            return Err(err.into());
        }

        info!(
            application_id = %record.application_id,
            applicant_id = %record.applicant_id,
            opportunity_id = %opportunity_id,
            priority = entry.priority,
            "promoted from waitlist"
        );

        let event = PlacementEvent::Promoted {
            application_id: record.application_id.clone(),
            applicant_id: record.applicant_id.clone(),
            opportunity_id: opportunity_id.clone(),
        };
        if let Err(err) = self.notifier.publish(event) {
            warn!(error = %err, "promotion notification failed");
        }

        Ok(Some(Promotion {
            opportunity_id: opportunity_id.clone(),
            entry,
            record,
        }))
    }
}
