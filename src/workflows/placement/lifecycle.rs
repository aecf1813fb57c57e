use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicationId, ApplicationRecord, ApplicationStatus};

/// Inputs that move an application between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Reviewer decision on a pending application.
    Review { approve: bool },
    AcceptOffer,
    RequestWithdrawal,
    ApproveWithdrawal,
    RejectWithdrawal,
    /// Capacity-exceeded placement onto a waitlist.
    Enqueue,
    /// Head of the waitlist granted an offer.
    Promote,
    /// Taken off a waitlist without promotion (explicit removal or clear).
    Unqueue,
    /// Side effect of the same applicant confirming or leaving another placement.
    CascadeWithdraw,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleEvent::Review { approve: true } => "approve",
            LifecycleEvent::Review { approve: false } => "reject",
            LifecycleEvent::AcceptOffer => "accept offer",
            LifecycleEvent::RequestWithdrawal => "request withdrawal",
            LifecycleEvent::ApproveWithdrawal => "approve withdrawal",
            LifecycleEvent::RejectWithdrawal => "reject withdrawal",
            LifecycleEvent::Enqueue => "waitlist",
            LifecycleEvent::Promote => "promote",
            LifecycleEvent::Unqueue => "remove from waitlist",
            LifecycleEvent::CascadeWithdraw => "cascade withdraw",
        };
        f.write_str(label)
    }
}

/// Transition refused because `event` is not legal from `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event}: application is {from}")]
pub struct InvalidTransition {
    pub from: ApplicationStatus,
    pub event: LifecycleEvent,
}

/// Target state for `event` from `current`, or the reason it is not allowed.
///
/// `RejectWithdrawal` yields the transient `WithdrawalRejected`; the record turns
/// that into the restored status when it is applied.
pub fn next_status(
    current: ApplicationStatus,
    event: LifecycleEvent,
) -> Result<ApplicationStatus, InvalidTransition> {
    use ApplicationStatus as S;
    use LifecycleEvent as E;

    let next = match (current, event) {
        (S::Pending, E::Review { approve: true }) => S::Successful,
        (S::Pending, E::Review { approve: false }) => S::Unsuccessful,
        (S::Successful, E::AcceptOffer) => S::Confirmed,
        (S::Pending | S::Successful | S::Confirmed, E::RequestWithdrawal) => {
            S::WithdrawalRequested
        }
        (S::WithdrawalRequested, E::ApproveWithdrawal) => S::Withdrawn,
        (S::WithdrawalRequested, E::RejectWithdrawal) => S::WithdrawalRejected,
        (_, E::Enqueue) => S::Waitlisted,
        (S::Waitlisted, E::Promote | E::Unqueue) => S::Successful,
        (status, E::CascadeWithdraw) if status != S::Withdrawn => S::Withdrawn,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

/// Record of one committed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub application_id: ApplicationId,
    pub event: LifecycleEvent,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// Validate `event` against the record's state and apply it.
pub fn apply(
    record: &mut ApplicationRecord,
    event: LifecycleEvent,
    now: DateTime<Utc>,
) -> Result<StatusChange, InvalidTransition> {
    let from = record.status();
    let next = next_status(from, event)?;

    record.apply_status(next, now);
    match event {
        LifecycleEvent::RequestWithdrawal => record.set_manually_withdrawn(true),
        LifecycleEvent::RejectWithdrawal => record.set_manually_withdrawn(false),
        _ => {}
    }

    Ok(StatusChange {
        application_id: record.application_id.clone(),
        event,
        from,
        to: record.status(),
    })
}

/// Which of an applicant's other applications a cascade withdraws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeScope {
    /// After an offer is accepted: everything not already withdrawn.
    AllActive,
    /// After a slot-holding withdrawal is approved: open offers and queue places.
    OpenClaims,
}

impl CascadeScope {
    pub fn includes(self, status: ApplicationStatus) -> bool {
        match self {
            CascadeScope::AllActive => status != ApplicationStatus::Withdrawn,
            CascadeScope::OpenClaims => matches!(
                status,
                ApplicationStatus::Pending
                    | ApplicationStatus::Successful
                    | ApplicationStatus::Waitlisted
            ),
        }
    }
}

/// Ids of `records` other than `trigger` that a cascade of `scope` should withdraw.
pub fn cascade_targets<'a, I>(
    records: I,
    trigger: &ApplicationId,
    scope: CascadeScope,
) -> Vec<ApplicationId>
where
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    records
        .into_iter()
        .filter(|record| &record.application_id != trigger && scope.includes(record.status()))
        .map(|record| record.application_id.clone())
        .collect()
}
