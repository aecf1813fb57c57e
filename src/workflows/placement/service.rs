use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PlacementConfig;

use super::capacity::CapacitySnapshot;
use super::domain::{
    ApplicantId, ApplicationId, ApplicationRecord, ApplicationStatus, Opportunity, OpportunityId,
    OpportunityStatus,
};
use super::intake::{SubmissionGuard, SubmissionRejection};
use super::lifecycle::{
    self, cascade_targets, CascadeScope, InvalidTransition, LifecycleEvent, StatusChange,
};
use super::pipeline::{CascadeStep, LifecycleOutcome, StepLog};
use super::promotion::{Promotion, PromotionEngine};
use super::repository::{
    ApplicationRepository, Clock, OpportunityRepository, PlacementEvent, PlacementNotifier,
    RepositoryError, SystemClock,
};
use super::waitlist::{ReorderError, WaitlistBook, WaitlistEntry};

/// Service composing the record store, the waitlists, and the promotion engine.
///
/// Every public operation holds the waitlist lock for its full duration, cascade
/// included, so concurrent callers are serialized through a single point.
pub struct PlacementService<R, O, N> {
    applications: Arc<R>,
    opportunities: Arc<O>,
    notifier: Arc<N>,
    guard: SubmissionGuard,
    clock: Arc<dyn Clock>,
    waitlists: Mutex<WaitlistBook>,
    sequence: AtomicU64,
}

/// Result of a batch approval run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchApproval {
    pub approved: Vec<ApplicationId>,
    pub waitlisted: Vec<WaitlistEntry>,
    /// Unknown ids, repeated ids, and applications that were no longer pending.
    pub skipped: Vec<ApplicationId>,
}

impl<R, O, N> PlacementService<R, O, N>
where
    R: ApplicationRepository + 'static,
    O: OpportunityRepository + 'static,
    N: PlacementNotifier + 'static,
{
    pub fn new(
        applications: Arc<R>,
        opportunities: Arc<O>,
        notifier: Arc<N>,
        config: PlacementConfig,
    ) -> Self {
        Self {
            applications,
            opportunities,
            notifier,
            guard: SubmissionGuard::new(config.max_active_applications),
            clock: Arc::new(SystemClock),
            waitlists: Mutex::new(WaitlistBook::default()),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Rebuild waitlists from records already stored as `Waitlisted`.
    ///
    /// Queues are ordered by `queued_at` (falling back to `applied_at`), then id.
    /// Returns the number of entries added.
    pub fn restore_waitlists(&self) -> Result<usize, PlacementError> {
        let mut book = self.lock_waitlists();

        let mut waitlisted: Vec<ApplicationRecord> = self
            .applications
            .all()?
            .into_iter()
            .filter(|record| record.status() == ApplicationStatus::Waitlisted)
            .collect();
        waitlisted.sort_by(|a, b| {
            let a_key = (a.queued_at().unwrap_or(a.applied_at), &a.application_id);
            let b_key = (b.queued_at().unwrap_or(b.applied_at), &b.application_id);
            a_key.cmp(&b_key)
        });

        let mut restored = 0;
        for record in waitlisted {
            let added_at = record.queued_at().unwrap_or(record.applied_at);
            if book
                .enqueue(&record.opportunity_id, record.application_id, added_at)
                .is_some()
            {
                restored += 1;
            }
        }

        info!(restored, "waitlists restored from stored applications");
        Ok(restored)
    }

    /// Seed a new `Pending` application after the submission guard passes.
    pub fn submit_application(
        &self,
        applicant_id: &ApplicantId,
        opportunity_id: &OpportunityId,
    ) -> Result<ApplicationRecord, PlacementError> {
        let _book = self.lock_waitlists();

        let opportunity = self.fetch_opportunity(opportunity_id)?;
        let existing = self.applications.for_applicant(applicant_id)?;
        let competing = self.applications.for_opportunity(opportunity_id)?;
        self.guard.check(&opportunity, &existing, &competing)?;

        let record = ApplicationRecord::new(
            self.next_application_id(),
            applicant_id.clone(),
            opportunity_id.clone(),
            self.clock.now(),
        );
        let stored = self.applications.insert(record)?;

        info!(
            application_id = %stored.application_id,
            applicant_id = %applicant_id,
            opportunity_id = %opportunity_id,
            "application submitted"
        );
        Ok(stored)
    }

    /// Review decision: `Pending -> Successful | Unsuccessful`.
    pub fn decide(
        &self,
        application_id: &ApplicationId,
        approve: bool,
    ) -> Result<LifecycleOutcome, PlacementError> {
        let _book = self.lock_waitlists();
        let now = self.clock.now();
        let mut steps = StepLog::default();

        let mut record = self.fetch_application(application_id)?;
        let change = self.transition(&mut record, LifecycleEvent::Review { approve }, now)?;
        steps.push(CascadeStep::Transition(change));

        Ok(steps.finish(record))
    }

    /// Approve pending applications grouped by opportunity, waitlisting the overflow.
    ///
    /// Outstanding offers count as held seats here, so an opportunity with
    /// `max_slots` of 2 and one unanswered offer approves one more and queues the rest.
    pub fn batch_approve(
        &self,
        application_ids: &[ApplicationId],
    ) -> Result<BatchApproval, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();
        let mut result = BatchApproval::default();

        let mut seen = BTreeSet::new();
        let mut groups: Vec<(OpportunityId, Vec<ApplicationRecord>)> = Vec::new();
        for application_id in application_ids {
            if !seen.insert(application_id) {
                debug!(application_id = %application_id, "duplicate id in batch");
                result.skipped.push(application_id.clone());
                continue;
            }
            let record = match self.applications.fetch(application_id)? {
                Some(record) if record.status() == ApplicationStatus::Pending => record,
                _ => {
                    result.skipped.push(application_id.clone());
                    continue;
                }
            };
            match groups
                .iter_mut()
                .find(|(opportunity_id, _)| opportunity_id == &record.opportunity_id)
            {
                Some((_, records)) => records.push(record),
                None => groups.push((record.opportunity_id.clone(), vec![record])),
            }
        }

        for (opportunity_id, records) in groups {
            let opportunity = self.fetch_opportunity(&opportunity_id)?;
            let mut open = self.capacity_of(&opportunity)?.open_offers();

            for mut record in records {
                if open > 0 {
                    self.transition(&mut record, LifecycleEvent::Review { approve: true }, now)?;
                    result.approved.push(record.application_id.clone());
                    open -= 1;
                } else {
                    let entry = self.enqueue_locked(&mut book, &opportunity_id, record, now)?;
                    result.waitlisted.push(entry);
                }
            }
        }

        info!(
            approved = result.approved.len(),
            waitlisted = result.waitlisted.len(),
            skipped = result.skipped.len(),
            "batch approval complete"
        );
        Ok(result)
    }

    /// Applicant accepts an offer: `Successful -> Confirmed`.
    ///
    /// A confirmed seat with an undecided withdrawal request still counts as taken.
    /// Every other application of the same applicant that is not already withdrawn
    /// is withdrawn. When confirmations reach `max_slots` the opportunity is marked
    /// filled.
    pub fn accept_offer(
        &self,
        application_id: &ApplicationId,
    ) -> Result<LifecycleOutcome, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();
        let mut steps = StepLog::default();

        let mut record = self.fetch_application(application_id)?;
        lifecycle::next_status(record.status(), LifecycleEvent::AcceptOffer)?;

        let mut opportunity = self.fetch_opportunity(&record.opportunity_id)?;
        let capacity = self.capacity_of(&opportunity)?;
        if !capacity.can_accept() {
            warn!(
                application_id = %application_id,
                opportunity_id = %opportunity.opportunity_id,
                occupied = capacity.held(),
                pending_release = capacity.pending_release,
                max_slots = capacity.max_slots,
                "offer acceptance refused: opportunity at capacity"
            );
            return Err(PlacementError::CapacityViolation {
                opportunity_id: opportunity.opportunity_id,
                occupied: capacity.held(),
                max_slots: capacity.max_slots,
            });
        }

        let change = self.transition(&mut record, LifecycleEvent::AcceptOffer, now)?;
        steps.push(CascadeStep::Transition(change));

        self.cascade_withdraw(
            &mut book,
            &record,
            CascadeScope::AllActive,
            now,
            &mut steps,
        )?;

        let capacity = self.capacity_of(&opportunity)?;
        debug_assert!(
            capacity.confirmed <= capacity.max_slots,
            "occupancy exceeded max_slots"
        );
        if capacity.is_full() && !opportunity.is_filled() {
            opportunity.status = OpportunityStatus::Filled;
            self.opportunities.update_opportunity(opportunity.clone())?;
            self.notify(PlacementEvent::OpportunityFilled {
                opportunity_id: opportunity.opportunity_id.clone(),
            });
            info!(opportunity_id = %opportunity.opportunity_id, "opportunity filled");
            steps.push(CascadeStep::OpportunityFilled {
                opportunity_id: opportunity.opportunity_id,
            });
        }

        Ok(steps.finish(record))
    }

    /// `{Pending, Successful, Confirmed} -> WithdrawalRequested`, remembering the prior status.
    pub fn request_withdrawal(
        &self,
        application_id: &ApplicationId,
    ) -> Result<LifecycleOutcome, PlacementError> {
        let _book = self.lock_waitlists();
        let now = self.clock.now();
        let mut steps = StepLog::default();

        let mut record = self.fetch_application(application_id)?;
        let change = self.transition(&mut record, LifecycleEvent::RequestWithdrawal, now)?;
        steps.push(CascadeStep::Transition(change));

        Ok(steps.finish(record))
    }

    /// Staff decision on a withdrawal request.
    ///
    /// Rejection restores the status held before the request (`Successful` when
    /// none was recorded). Approval withdraws the application; if it held a slot,
    /// the applicant's other open claims are withdrawn, a filled opportunity is
    /// reopened, and at most one waitlisted application is promoted.
    pub fn resolve_withdrawal(
        &self,
        application_id: &ApplicationId,
        approve: bool,
    ) -> Result<LifecycleOutcome, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();
        let mut steps = StepLog::default();

        let mut record = self.fetch_application(application_id)?;

        if !approve {
            let change = self.transition(&mut record, LifecycleEvent::RejectWithdrawal, now)?;
            steps.push(CascadeStep::Transition(change));
            return Ok(steps.finish(record));
        }

        let previous = record.previous_status();
        let change = self.transition(&mut record, LifecycleEvent::ApproveWithdrawal, now)?;
        steps.push(CascadeStep::Transition(change));

        let Some(previous) = previous.filter(|status| status.holds_slot()) else {
            return Ok(steps.finish(record));
        };

        self.cascade_withdraw(
            &mut book,
            &record,
            CascadeScope::OpenClaims,
            now,
            &mut steps,
        )?;

        let mut opportunity = self.fetch_opportunity(&record.opportunity_id)?;
        let capacity = self.capacity_of(&opportunity)?;

        if previous == ApplicationStatus::Confirmed
            && opportunity.is_filled()
            && capacity.has_vacancy()
        {
            opportunity.status = OpportunityStatus::Open;
            self.opportunities.update_opportunity(opportunity.clone())?;
            self.notify(PlacementEvent::OpportunityReopened {
                opportunity_id: opportunity.opportunity_id.clone(),
            });
            info!(opportunity_id = %opportunity.opportunity_id, "opportunity reopened");
            steps.push(CascadeStep::OpportunityReopened {
                opportunity_id: opportunity.opportunity_id.clone(),
            });
        }

        if !capacity.has_vacancy() {
            debug!(
                opportunity_id = %opportunity.opportunity_id,
                "promotion skipped: no vacancy"
            );
            steps.push(CascadeStep::PromotionSkipped {
                opportunity_id: opportunity.opportunity_id,
                reason: "no vacancy",
            });
            return Ok(steps.finish(record));
        }

        let mut engine = PromotionEngine::new(&mut book, &*self.applications, &*self.notifier);
        match engine.promote_next(&opportunity.opportunity_id, now)? {
            Some(promotion) => steps.push(CascadeStep::Promoted(promotion)),
            None => steps.push(CascadeStep::PromotionSkipped {
                opportunity_id: opportunity.opportunity_id,
                reason: "waitlist empty",
            }),
        }

        Ok(steps.finish(record))
    }

    /// Place an application at the back of its opportunity's waitlist.
    pub fn enqueue_waitlist(
        &self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
    ) -> Result<WaitlistEntry, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();

        let record = self.fetch_application(application_id)?;
        if &record.opportunity_id != opportunity_id {
            return Err(PlacementError::OpportunityMismatch {
                application_id: application_id.clone(),
                requested: opportunity_id.clone(),
                actual: record.opportunity_id,
            });
        }
        self.fetch_opportunity(opportunity_id)?;

        self.enqueue_locked(&mut book, opportunity_id, record, now)
    }

    /// Take an application off a waitlist; a `Waitlisted` record reverts to `Successful`.
    pub fn dequeue_waitlist(
        &self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
    ) -> Result<WaitlistEntry, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();

        let entry = book.remove(opportunity_id, application_id).ok_or_else(|| {
            PlacementError::NotWaitlisted {
                opportunity_id: opportunity_id.clone(),
                application_id: application_id.clone(),
            }
        })?;
        self.unqueue_record(application_id, now)?;

        info!(
            application_id = %application_id,
            opportunity_id = %opportunity_id,
            "removed from waitlist"
        );
        Ok(entry)
    }

    /// Move an entry to 0-based `position`, returning the reordered waitlist.
    pub fn reorder_waitlist(
        &self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
        position: usize,
    ) -> Result<Vec<WaitlistEntry>, PlacementError> {
        let mut book = self.lock_waitlists();

        book.reorder(opportunity_id, application_id, position)
            .map_err(|err| match err {
                ReorderError::NotQueued => PlacementError::NotWaitlisted {
                    opportunity_id: opportunity_id.clone(),
                    application_id: application_id.clone(),
                },
                ReorderError::OutOfRange { position, len } => PlacementError::PositionOutOfRange {
                    opportunity_id: opportunity_id.clone(),
                    position,
                    len,
                },
            })?;
        debug_assert!(book.is_consistent(), "waitlist priorities not contiguous");

        info!(
            application_id = %application_id,
            opportunity_id = %opportunity_id,
            position,
            "waitlist reordered"
        );
        Ok(book.entries(opportunity_id))
    }

    /// Promote the head of the waitlist, or `None` when nobody is waiting.
    pub fn promote_next(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<Promotion>, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();

        if book.size(opportunity_id) == 0 {
            debug!(opportunity_id = %opportunity_id, "no waitlisted candidate to promote");
            return Ok(None);
        }

        let opportunity = self.fetch_opportunity(opportunity_id)?;
        let capacity = self.capacity_of(&opportunity)?;
        if !capacity.has_vacancy() {
            warn!(
                opportunity_id = %opportunity_id,
                "promotion refused: opportunity at capacity"
            );
            return Err(PlacementError::CapacityViolation {
                opportunity_id: opportunity_id.clone(),
                occupied: capacity.confirmed,
                max_slots: capacity.max_slots,
            });
        }

        PromotionEngine::new(&mut book, &*self.applications, &*self.notifier)
            .promote_next(opportunity_id, now)
    }

    /// Staff promotion of a specific waitlisted application, ignoring its rank.
    ///
    /// Requires a seat that is neither confirmed nor held by an outstanding offer.
    pub fn promote_application(
        &self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
    ) -> Result<Promotion, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();

        let opportunity = self.fetch_opportunity(opportunity_id)?;
        let capacity = self.capacity_of(&opportunity)?;
        if capacity.open_offers() == 0 {
            warn!(
                application_id = %application_id,
                opportunity_id = %opportunity_id,
                "manual promotion refused: all slots held"
            );
            return Err(PlacementError::CapacityViolation {
                opportunity_id: opportunity_id.clone(),
                occupied: capacity.held() + capacity.offered,
                max_slots: capacity.max_slots,
            });
        }

        PromotionEngine::new(&mut book, &*self.applications, &*self.notifier).promote(
            opportunity_id,
            application_id,
            now,
        )
    }

    /// Entries ordered by ascending priority.
    pub fn waitlist(&self, opportunity_id: &OpportunityId) -> Vec<WaitlistEntry> {
        self.lock_waitlists().entries(opportunity_id)
    }

    /// 1-based rank, `None` when not queued.
    pub fn waitlist_position(
        &self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
    ) -> Option<usize> {
        self.lock_waitlists().position(opportunity_id, application_id)
    }

    pub fn waitlist_size(&self, opportunity_id: &OpportunityId) -> usize {
        self.lock_waitlists().size(opportunity_id)
    }

    /// Drop every entry for the opportunity, reverting `Waitlisted` records to `Successful`.
    pub fn clear_waitlist(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<ApplicationId>, PlacementError> {
        let mut book = self.lock_waitlists();
        let now = self.clock.now();

        let mut reverted = Vec::new();
        for entry in book.clear(opportunity_id) {
            if self.unqueue_record(&entry.application_id, now)? {
                reverted.push(entry.application_id);
            }
        }

        info!(
            opportunity_id = %opportunity_id,
            reverted = reverted.len(),
            "waitlist cleared"
        );
        Ok(reverted)
    }

    /// Confirmed applications for the opportunity.
    pub fn occupancy(&self, opportunity_id: &OpportunityId) -> Result<usize, PlacementError> {
        Ok(self.capacity(opportunity_id)?.occupancy())
    }

    pub fn has_vacancy(&self, opportunity_id: &OpportunityId) -> Result<bool, PlacementError> {
        Ok(self.capacity(opportunity_id)?.has_vacancy())
    }

    pub fn capacity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<CapacitySnapshot, PlacementError> {
        let opportunity = self.fetch_opportunity(opportunity_id)?;
        self.capacity_of(&opportunity)
    }

    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, PlacementError> {
        self.fetch_application(application_id)
    }

    pub fn opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Opportunity, PlacementError> {
        self.fetch_opportunity(opportunity_id)
    }

    fn lock_waitlists(&self) -> MutexGuard<'_, WaitlistBook> {
        self.waitlists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_application_id(&self) -> ApplicationId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        ApplicationId(format!("app-{id:06}"))
    }

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, PlacementError> {
        self.applications
            .fetch(application_id)?
            .ok_or_else(|| PlacementError::ApplicationNotFound(application_id.clone()))
    }

    fn fetch_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Opportunity, PlacementError> {
        self.opportunities
            .fetch_opportunity(opportunity_id)?
            .ok_or_else(|| PlacementError::OpportunityNotFound(opportunity_id.clone()))
    }

    fn capacity_of(&self, opportunity: &Opportunity) -> Result<CapacitySnapshot, PlacementError> {
        let records = self
            .applications
            .for_opportunity(&opportunity.opportunity_id)?;
        Ok(CapacitySnapshot::compute(opportunity, &records))
    }

    fn transition(
        &self,
        record: &mut ApplicationRecord,
        event: LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, PlacementError> {
        let change = lifecycle::apply(record, event, now)?;
        self.applications.update(record.clone())?;

        info!(
            application_id = %change.application_id,
            event = %change.event,
            from = %change.from,
            to = %change.to,
            "application transitioned"
        );
        Ok(change)
    }

    fn enqueue_locked(
        &self,
        book: &mut WaitlistBook,
        opportunity_id: &OpportunityId,
        mut record: ApplicationRecord,
        now: DateTime<Utc>,
    ) -> Result<WaitlistEntry, PlacementError> {
        let already_queued = book
            .queue(opportunity_id)
            .is_some_and(|queue| queue.contains(&record.application_id));
        if already_queued {
            return Err(PlacementError::AlreadyWaitlisted {
                opportunity_id: opportunity_id.clone(),
                application_id: record.application_id,
            });
        }

        self.transition(&mut record, LifecycleEvent::Enqueue, now)?;
        let entry = book
            .enqueue(opportunity_id, record.application_id.clone(), now)
            .ok_or_else(|| PlacementError::AlreadyWaitlisted {
                opportunity_id: opportunity_id.clone(),
                application_id: record.application_id.clone(),
            })?;

        info!(
            application_id = %entry.application_id,
            opportunity_id = %opportunity_id,
            priority = entry.priority,
            "added to waitlist"
        );
        Ok(entry)
    }

    /// Revert a record taken off a waitlist. Returns whether it was `Waitlisted`.
    fn unqueue_record(
        &self,
        application_id: &ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<bool, PlacementError> {
        let Some(mut record) = self.applications.fetch(application_id)? else {
            return Ok(false);
        };
        if record.status() != ApplicationStatus::Waitlisted {
            return Ok(false);
        }
        self.transition(&mut record, LifecycleEvent::Unqueue, now)?;
        Ok(true)
    }

    fn cascade_withdraw(
        &self,
        book: &mut WaitlistBook,
        trigger: &ApplicationRecord,
        scope: CascadeScope,
        now: DateTime<Utc>,
        steps: &mut StepLog,
    ) -> Result<(), PlacementError> {
        let siblings = self.applications.for_applicant(&trigger.applicant_id)?;

        for target in cascade_targets(&siblings, &trigger.application_id, scope) {
            let mut record = self.fetch_application(&target)?;

            if let Some(opportunity_id) = book.locate(&target).cloned() {
                if let Some(entry) = book.remove(&opportunity_id, &target) {
                    steps.push(CascadeStep::Dequeued {
                        opportunity_id,
                        entry,
                    });
                }
            }

            let change = self.transition(&mut record, LifecycleEvent::CascadeWithdraw, now)?;
            steps.push(CascadeStep::CascadeWithdrawn(change));
        }

        Ok(())
    }

    fn notify(&self, event: PlacementEvent) {
        if let Err(err) = self.notifier.publish(event) {
            warn!(error = %err, "placement notification failed");
        }
    }
}

/// Error raised by the placement service.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("opportunity {0} not found")]
    OpportunityNotFound(OpportunityId),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("opportunity {opportunity_id} has no free slot ({occupied}/{max_slots} taken)")]
    CapacityViolation {
        opportunity_id: OpportunityId,
        occupied: usize,
        max_slots: usize,
    },
    #[error("application {application_id} is already on the waitlist for {opportunity_id}")]
    AlreadyWaitlisted {
        opportunity_id: OpportunityId,
        application_id: ApplicationId,
    },
    #[error("application {application_id} is not on the waitlist for {opportunity_id}")]
    NotWaitlisted {
        opportunity_id: OpportunityId,
        application_id: ApplicationId,
    },
    #[error("position {position} is outside the waitlist for {opportunity_id} (length {len})")]
    PositionOutOfRange {
        opportunity_id: OpportunityId,
        position: usize,
        len: usize,
    },
    #[error("application {application_id} belongs to {actual}, not {requested}")]
    OpportunityMismatch {
        application_id: ApplicationId,
        requested: OpportunityId,
        actual: OpportunityId,
    },
    #[error(transparent)]
    Submission(#[from] SubmissionRejection),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PlacementError {
    /// Stable code callers can map to user-facing messages.
    pub fn reason_code(&self) -> &'static str {
        match self {
            PlacementError::ApplicationNotFound(_) | PlacementError::OpportunityNotFound(_) => {
                "not_found"
            }
            PlacementError::InvalidTransition(_) => "invalid_transition",
            PlacementError::CapacityViolation { .. } => "capacity_violation",
            PlacementError::AlreadyWaitlisted { .. } => "already_waitlisted",
            PlacementError::NotWaitlisted { .. } => "not_waitlisted",
            PlacementError::PositionOutOfRange { .. } => "position_out_of_range",
            PlacementError::OpportunityMismatch { .. } => "opportunity_mismatch",
            PlacementError::Submission(_) => "submission_rejected",
            PlacementError::Repository(_) => "repository",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.reason_code() == "not_found"
    }
}
