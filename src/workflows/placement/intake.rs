use super::domain::{ApplicationRecord, ApplicationStatus, Opportunity, OpportunityId};

/// Reasons a new application is refused before any record is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionRejection {
    #[error("opportunity {0} is already filled")]
    OpportunityFilled(OpportunityId),
    #[error("applicant has already applied to opportunity {0}")]
    DuplicateApplication(OpportunityId),
    #[error("applicant already holds a confirmed placement")]
    AlreadyConfirmed,
    #[error("applicant already has {active} active applications (max {max})")]
    TooManyActive { active: usize, max: usize },
    #[error("opportunity {opportunity_id} is already full ({held}/{max_slots} seats held)")]
    OpportunityAtCapacity {
        opportunity_id: OpportunityId,
        held: usize,
        max_slots: usize,
    },
}

/// Guard applied before a submission is seeded as `Pending`.
#[derive(Debug, Clone)]
pub struct SubmissionGuard {
    max_active_applications: usize,
}

impl SubmissionGuard {
    pub fn new(max_active_applications: usize) -> Self {
        Self {
            max_active_applications,
        }
    }

    /// `existing` holds every application the applicant has already submitted;
    /// `competing` every application already made to `opportunity`.
    pub fn check(
        &self,
        opportunity: &Opportunity,
        existing: &[ApplicationRecord],
        competing: &[ApplicationRecord],
    ) -> Result<(), SubmissionRejection> {
        if opportunity.is_filled() {
            return Err(SubmissionRejection::OpportunityFilled(
                opportunity.opportunity_id.clone(),
            ));
        }

        if existing
            .iter()
            .any(|record| record.status() == ApplicationStatus::Confirmed)
        {
            return Err(SubmissionRejection::AlreadyConfirmed);
        }

        if existing
            .iter()
            .any(|record| record.opportunity_id == opportunity.opportunity_id)
        {
            return Err(SubmissionRejection::DuplicateApplication(
                opportunity.opportunity_id.clone(),
            ));
        }

        let active = existing
            .iter()
            .filter(|record| record.status().is_active())
            .count();
        if active >= self.max_active_applications {
            return Err(SubmissionRejection::TooManyActive {
                active,
                max: self.max_active_applications,
            });
        }

        // Offers and pending withdrawals may still turn into confirmations.
        let held = competing
            .iter()
            .filter(|record| record.opportunity_id == opportunity.opportunity_id)
            .filter(|record| {
                matches!(
                    record.status(),
                    ApplicationStatus::Confirmed
                        | ApplicationStatus::Successful
                        | ApplicationStatus::WithdrawalRequested
                )
            })
            .count();
        let max_slots = opportunity.max_slots as usize;
        if held >= max_slots {
            return Err(SubmissionRejection::OpportunityAtCapacity {
                opportunity_id: opportunity.opportunity_id.clone(),
                held,
                max_slots,
            });
        }

        Ok(())
    }
}
