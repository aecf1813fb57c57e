//! Per-opportunity waitlists with explicit, staff-adjustable priority ranks.
//!
//! Entries hold only the application id; the record itself lives in the
//! application repository, so a status change made by the lifecycle is what every
//! reader of the waitlist sees. Priority is a rank (0 = promoted next), not an
//! arrival time: reordering never touches `added_at`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicationId, OpportunityId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistEntry {
    pub application_id: ApplicationId,
    pub priority: usize,
    pub added_at: DateTime<Utc>,
}

/// Why a reorder request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    #[error("application is not on this waitlist")]
    NotQueued,
    #[error("position {position} is outside a waitlist of length {len}")]
    OutOfRange { position: usize, len: usize },
}

/// Ordered queue for one opportunity. Vector order is priority order.
#[derive(Debug, Clone, Default)]
pub struct OpportunityWaitlist {
    entries: Vec<WaitlistEntry>,
}

impl OpportunityWaitlist {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[WaitlistEntry] {
        &self.entries
    }

    pub fn contains(&self, application_id: &ApplicationId) -> bool {
        self.index_of(application_id).is_some()
    }

    /// Append at the lowest priority. Returns `None` if the id is already queued.
    pub fn push(
        &mut self,
        application_id: ApplicationId,
        added_at: DateTime<Utc>,
    ) -> Option<&WaitlistEntry> {
        if self.contains(&application_id) {
            return None;
        }

        let priority = self.entries.len();
        self.entries.push(WaitlistEntry {
            application_id,
            priority,
            added_at,
        });
        self.entries.last()
    }

    /// Remove and return the entry with the minimum priority.
    pub fn pop_next(&mut self) -> Option<WaitlistEntry> {
        let head = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| entry.priority)
            .map(|(index, _)| index)?;
        let entry = self.entries.remove(head);
        self.reindex();
        Some(entry)
    }

    pub fn remove(&mut self, application_id: &ApplicationId) -> Option<WaitlistEntry> {
        let index = self.index_of(application_id)?;
        let entry = self.entries.remove(index);
        self.reindex();
        Some(entry)
    }

    /// Put a previously removed entry back at its old rank, clamped to the tail.
    /// Returns `false` if the id is queued again already.
    pub fn reinsert(&mut self, entry: WaitlistEntry) -> bool {
        if self.contains(&entry.application_id) {
            return false;
        }
        let index = entry.priority.min(self.entries.len());
        self.entries.insert(index, entry);
        self.reindex();
        true
    }

    /// Stable move to `position` (0-based); every entry in between shifts by one.
    pub fn move_to(
        &mut self,
        application_id: &ApplicationId,
        position: usize,
    ) -> Result<(), ReorderError> {
        let len = self.entries.len();
        if position >= len {
            return Err(ReorderError::OutOfRange { position, len });
        }
        let index = self
            .index_of(application_id)
            .ok_or(ReorderError::NotQueued)?;

        let entry = self.entries.remove(index);
        self.entries.insert(position, entry);
        self.reindex();
        Ok(())
    }

    /// 1-based rank, or `None` when the application is not queued here.
    pub fn position(&self, application_id: &ApplicationId) -> Option<usize> {
        self.index_of(application_id).map(|index| index + 1)
    }

    pub fn drain(&mut self) -> Vec<WaitlistEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn priorities_are_contiguous(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(index, entry)| entry.priority == index)
    }

    fn index_of(&self, application_id: &ApplicationId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.application_id == application_id)
    }

    fn reindex(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.priority = index;
        }
    }
}

/// All waitlists, keyed by opportunity.
#[derive(Debug, Clone, Default)]
pub struct WaitlistBook {
    queues: BTreeMap<OpportunityId, OpportunityWaitlist>,
}

impl WaitlistBook {
    pub fn queue(&self, opportunity_id: &OpportunityId) -> Option<&OpportunityWaitlist> {
        self.queues.get(opportunity_id)
    }

    pub fn enqueue(
        &mut self,
        opportunity_id: &OpportunityId,
        application_id: ApplicationId,
        added_at: DateTime<Utc>,
    ) -> Option<WaitlistEntry> {
        self.queues
            .entry(opportunity_id.clone())
            .or_default()
            .push(application_id, added_at)
            .cloned()
    }

    pub fn pop_next(&mut self, opportunity_id: &OpportunityId) -> Option<WaitlistEntry> {
        let queue = self.queues.get_mut(opportunity_id)?;
        let entry = queue.pop_next();
        self.prune(opportunity_id);
        entry
    }

    pub fn remove(
        &mut self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
    ) -> Option<WaitlistEntry> {
        let queue = self.queues.get_mut(opportunity_id)?;
        let entry = queue.remove(application_id);
        self.prune(opportunity_id);
        entry
    }

    pub fn reinsert(&mut self, opportunity_id: &OpportunityId, entry: WaitlistEntry) -> bool {
        self.queues
            .entry(opportunity_id.clone())
            .or_default()
            .reinsert(entry)
    }

    pub fn reorder(
        &mut self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
        position: usize,
    ) -> Result<(), ReorderError> {
        match self.queues.get_mut(opportunity_id) {
            Some(queue) => queue.move_to(application_id, position),
            None => Err(ReorderError::OutOfRange { position, len: 0 }),
        }
    }

    pub fn position(
        &self,
        opportunity_id: &OpportunityId,
        application_id: &ApplicationId,
    ) -> Option<usize> {
        self.queues
            .get(opportunity_id)
            .and_then(|queue| queue.position(application_id))
    }

    pub fn size(&self, opportunity_id: &OpportunityId) -> usize {
        self.queues.get(opportunity_id).map_or(0, OpportunityWaitlist::len)
    }

    /// Entries sorted ascending by priority.
    pub fn entries(&self, opportunity_id: &OpportunityId) -> Vec<WaitlistEntry> {
        self.queues
            .get(opportunity_id)
            .map(|queue| queue.entries().to_vec())
            .unwrap_or_default()
    }

    pub fn clear(&mut self, opportunity_id: &OpportunityId) -> Vec<WaitlistEntry> {
        self.queues
            .remove(opportunity_id)
            .map(|mut queue| queue.drain())
            .unwrap_or_default()
    }

    /// Opportunity whose queue currently holds `application_id`, if any.
    pub fn locate(&self, application_id: &ApplicationId) -> Option<&OpportunityId> {
        self.queues
            .iter()
            .find(|(_, queue)| queue.contains(application_id))
            .map(|(opportunity_id, _)| opportunity_id)
    }

    pub fn is_consistent(&self) -> bool {
        self.queues
            .values()
            .all(OpportunityWaitlist::priorities_are_contiguous)
    }

    fn prune(&mut self, opportunity_id: &OpportunityId) {
        if self
            .queues
            .get(opportunity_id)
            .is_some_and(OpportunityWaitlist::is_empty)
        {
            self.queues.remove(opportunity_id);
        }
    }
}
