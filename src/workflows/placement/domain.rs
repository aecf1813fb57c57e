use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier of the student (or other applicant) who owns an application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

/// Identifier of the capacity-bounded internship posting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpportunityId(pub String);

macro_rules! display_inner {
    ($($name:ident),+) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        )+
    };
}

display_inner!(ApplicationId, ApplicantId, OpportunityId);

/// Closed set of states an application moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Successful,
    Unsuccessful,
    Confirmed,
    Waitlisted,
    WithdrawalRequested,
    Withdrawn,
    /// Transient: applying it restores the status held before the withdrawal request.
    WithdrawalRejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Successful => "successful",
            ApplicationStatus::Unsuccessful => "unsuccessful",
            ApplicationStatus::Confirmed => "confirmed",
            ApplicationStatus::Waitlisted => "waitlisted",
            ApplicationStatus::WithdrawalRequested => "withdrawal_requested",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::WithdrawalRejected => "withdrawal_rejected",
        }
    }

    /// Statuses whose withdrawal frees capacity and hands the slot to the waitlist.
    pub const fn holds_slot(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Confirmed | ApplicationStatus::Successful
        )
    }

    /// Counted against the per-applicant cap on open applications.
    pub const fn is_active(self) -> bool {
        !matches!(
            self,
            ApplicationStatus::Withdrawn | ApplicationStatus::Unsuccessful
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One applicant's claim on one opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub applicant_id: ApplicantId,
    pub opportunity_id: OpportunityId,
    status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    previous_status: Option<ApplicationStatus>,
    queued_at: Option<DateTime<Utc>>,
    manually_withdrawn: bool,
}

impl ApplicationRecord {
    pub fn new(
        application_id: ApplicationId,
        applicant_id: ApplicantId,
        opportunity_id: OpportunityId,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id,
            applicant_id,
            opportunity_id,
            status: ApplicationStatus::Pending,
            applied_at,
            previous_status: None,
            queued_at: None,
            manually_withdrawn: false,
        }
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    /// Set only while the record sits in `WithdrawalRequested`.
    pub fn previous_status(&self) -> Option<ApplicationStatus> {
        self.previous_status
    }

    /// First instant the record entered `Waitlisted`.
    pub fn queued_at(&self) -> Option<DateTime<Utc>> {
        self.queued_at
    }

    pub fn manually_withdrawn(&self) -> bool {
        self.manually_withdrawn
    }

    pub(crate) fn set_manually_withdrawn(&mut self, value: bool) {
        self.manually_withdrawn = value;
    }

    /// Write a new status, keeping the bookkeeping fields consistent with it.
    ///
    /// Legality is checked by the lifecycle before this is called; the record only
    /// maintains its own invariants:
    /// - `previous_status` is `Some` exactly while the status is `WithdrawalRequested`.
    /// - `queued_at` is stamped on the first entry into `Waitlisted` and never reset.
    /// - `WithdrawalRejected` is never stored; it restores `previous_status`, or
    ///   `Successful` when none was recorded.
    pub(crate) fn apply_status(&mut self, next: ApplicationStatus, now: DateTime<Utc>) {
        if next == ApplicationStatus::WithdrawalRejected {
            self.status = self
                .previous_status
                .take()
                .unwrap_or(ApplicationStatus::Successful);
            self.manually_withdrawn = false;
            return;
        }

        if next == self.status {
            return;
        }

        if next == ApplicationStatus::WithdrawalRequested {
            self.previous_status = Some(self.status);
        } else {
            self.previous_status = None;
        }

        if next == ApplicationStatus::Waitlisted && self.queued_at.is_none() {
            self.queued_at = Some(now);
        }

        self.status = next;
    }

    /// Rebuild a record from stored fields, e.g. when a repository hydrates from disk.
    ///
    /// The stored `previous_status` is dropped unless the status is
    /// `WithdrawalRequested`, and a stored `WithdrawalRejected` is resolved
    /// immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        application_id: ApplicationId,
        applicant_id: ApplicantId,
        opportunity_id: OpportunityId,
        status: ApplicationStatus,
        applied_at: DateTime<Utc>,
        previous_status: Option<ApplicationStatus>,
        queued_at: Option<DateTime<Utc>>,
        manually_withdrawn: bool,
    ) -> Self {
        let mut record = Self {
            application_id,
            applicant_id,
            opportunity_id,
            status,
            applied_at,
            previous_status: None,
            queued_at,
            manually_withdrawn,
        };

        match status {
            ApplicationStatus::WithdrawalRequested => record.previous_status = previous_status,
            ApplicationStatus::WithdrawalRejected => {
                record.previous_status = previous_status;
                record.apply_status(ApplicationStatus::WithdrawalRejected, applied_at);
            }
            _ => {}
        }

        record
    }
}

/// Whether an opportunity still accepts applications and offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Open,
    Filled,
}

/// Referenced posting; occupancy is never stored here, only derived from records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub opportunity_id: OpportunityId,
    pub title: String,
    pub max_slots: u32,
    pub status: OpportunityStatus,
}

impl Opportunity {
    pub fn new(opportunity_id: OpportunityId, title: impl Into<String>, max_slots: u32) -> Self {
        Self {
            opportunity_id,
            title: title.into(),
            max_slots,
            status: OpportunityStatus::Open,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.status == OpportunityStatus::Filled
    }
}

/// Sanitized snapshot returned to callers so they can render or persist results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub applicant_id: ApplicantId,
    pub opportunity_id: OpportunityId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_at: Option<DateTime<Utc>>,
    pub manually_withdrawn: bool,
}

impl From<&ApplicationRecord> for ApplicationStatusView {
    fn from(record: &ApplicationRecord) -> Self {
        Self {
            application_id: record.application_id.clone(),
            applicant_id: record.applicant_id.clone(),
            opportunity_id: record.opportunity_id.clone(),
            status: record.status.label(),
            previous_status: record.previous_status.map(ApplicationStatus::label),
            queued_at: record.queued_at,
            manually_withdrawn: record.manually_withdrawn,
        }
    }
}
