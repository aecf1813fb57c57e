//! Occupancy derived from the record set; nothing here is cached or stored.

use serde::Serialize;

use super::domain::{ApplicationRecord, ApplicationStatus, Opportunity, OpportunityId};

/// Number of records for `opportunity_id` that hold a committed seat.
///
/// Only `Confirmed` counts: a `Successful` offer can still be revoked or lose out
/// to a competing confirmation.
pub fn occupancy<'a, I>(records: I, opportunity_id: &OpportunityId) -> usize
where
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    count_status(records, opportunity_id, ApplicationStatus::Confirmed)
}

pub fn has_vacancy<'a, I>(records: I, opportunity: &Opportunity) -> bool
where
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    occupancy(records, &opportunity.opportunity_id) < opportunity.max_slots as usize
}

fn count_status<'a, I>(
    records: I,
    opportunity_id: &OpportunityId,
    status: ApplicationStatus,
) -> usize
where
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    records
        .into_iter()
        .filter(|record| &record.opportunity_id == opportunity_id && record.status() == status)
        .count()
}

/// Point-in-time view of one opportunity's seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacitySnapshot {
    pub opportunity_id: OpportunityId,
    pub max_slots: usize,
    /// `Confirmed` records: the occupancy.
    pub confirmed: usize,
    /// Outstanding `Successful` offers, not yet accepted.
    pub offered: usize,
    /// `WithdrawalRequested` records that were `Confirmed`; the seat stays held
    /// until staff approve the withdrawal.
    pub pending_release: usize,
    pub waitlisted: usize,
}

impl CapacitySnapshot {
    pub fn compute<'a, I>(opportunity: &Opportunity, records: I) -> Self
    where
        I: IntoIterator<Item = &'a ApplicationRecord>,
    {
        let mut snapshot = Self {
            opportunity_id: opportunity.opportunity_id.clone(),
            max_slots: opportunity.max_slots as usize,
            confirmed: 0,
            offered: 0,
            pending_release: 0,
            waitlisted: 0,
        };

        for record in records {
            if record.opportunity_id != opportunity.opportunity_id {
                continue;
            }
            match record.status() {
                ApplicationStatus::Confirmed => snapshot.confirmed += 1,
                ApplicationStatus::Successful => snapshot.offered += 1,
                ApplicationStatus::Waitlisted => snapshot.waitlisted += 1,
                ApplicationStatus::WithdrawalRequested
                    if record.previous_status() == Some(ApplicationStatus::Confirmed) =>
                {
                    snapshot.pending_release += 1
                }
                _ => {}
            }
        }

        snapshot
    }

    pub fn occupancy(&self) -> usize {
        self.confirmed
    }

    pub fn has_vacancy(&self) -> bool {
        self.confirmed < self.max_slots
    }

    pub fn is_full(&self) -> bool {
        !self.has_vacancy()
    }

    /// Seats that cannot be given away: confirmations plus confirmed seats whose
    /// withdrawal is still undecided.
    pub fn held(&self) -> usize {
        self.confirmed + self.pending_release
    }

    /// Whether one more offer may be accepted. A rejected withdrawal restores
    /// `Confirmed`, so its seat is not free yet.
    pub fn can_accept(&self) -> bool {
        self.held() < self.max_slots
    }

    /// Seats left once outstanding offers are treated as holds.
    ///
    /// Used when deciding how many fresh offers may go out (batch approval and
    /// manual promotion), where an unanswered offer still blocks a seat.
    pub fn open_offers(&self) -> usize {
        self.max_slots.saturating_sub(self.held() + self.offered)
    }
}
