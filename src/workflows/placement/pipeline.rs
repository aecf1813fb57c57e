//! Ordered record of what one operation committed.
//!
//! Cascades run as discrete steps in a fixed order: the triggering transition,
//! then withdrawals of the applicant's other applications, then opportunity status
//! changes, then promotion. Each step is committed to the repository as it runs;
//! if a later step fails, the earlier ones stay applied.

use serde::Serialize;
use tracing::debug;

use super::domain::{ApplicationId, ApplicationRecord, OpportunityId};
use super::lifecycle::StatusChange;
use super::promotion::Promotion;
use super::waitlist::WaitlistEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CascadeStep {
    Transition(StatusChange),
    Enqueued {
        opportunity_id: OpportunityId,
        entry: WaitlistEntry,
    },
    Dequeued {
        opportunity_id: OpportunityId,
        entry: WaitlistEntry,
    },
    CascadeWithdrawn(StatusChange),
    OpportunityFilled {
        opportunity_id: OpportunityId,
    },
    OpportunityReopened {
        opportunity_id: OpportunityId,
    },
    Promoted(Promotion),
    PromotionSkipped {
        opportunity_id: OpportunityId,
        reason: &'static str,
    },
}

/// Structured result of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleOutcome {
    /// The triggering application as it stands after the whole cascade.
    pub application: ApplicationRecord,
    pub steps: Vec<CascadeStep>,
}

impl LifecycleOutcome {
    /// Applications withdrawn as a side effect.
    pub fn withdrawn(&self) -> Vec<&ApplicationId> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                CascadeStep::CascadeWithdrawn(change) => Some(&change.application_id),
                _ => None,
            })
            .collect()
    }

    pub fn promoted(&self) -> Option<&ApplicationRecord> {
        self.steps.iter().find_map(|step| match step {
            CascadeStep::Promoted(promotion) => Some(&promotion.record),
            _ => None,
        })
    }

    pub fn opportunity_filled(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, CascadeStep::OpportunityFilled { .. }))
    }

    /// Every application this operation changed; the set a caller should persist.
    pub fn touched(&self) -> Vec<ApplicationId> {
        let mut touched = vec![self.application.application_id.clone()];
        for step in &self.steps {
            let id = match step {
                CascadeStep::Transition(change) | CascadeStep::CascadeWithdrawn(change) => {
                    &change.application_id
                }
                CascadeStep::Promoted(promotion) => &promotion.record.application_id,
                _ => continue,
            };
            if !touched.contains(id) {
                touched.push(id.clone());
            }
        }
        touched
    }
}

/// Accumulates steps while an operation runs.
#[derive(Debug, Default)]
pub(crate) struct StepLog {
    steps: Vec<CascadeStep>,
}

impl StepLog {
    pub(crate) fn push(&mut self, step: CascadeStep) {
        debug!(?step, "cascade step committed");
        self.steps.push(step);
    }

    pub(crate) fn finish(self, application: ApplicationRecord) -> LifecycleOutcome {
        LifecycleOutcome {
            application,
            steps: self.steps,
        }
    }
}
