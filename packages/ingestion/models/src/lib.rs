#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot, acknowledgement, and workflow state types for the ingestion
//! trigger.
//!
//! The collection backend is fire-and-forget: it accepts a request and
//! returns no job id. Whether a job produced data is inferred by comparing
//! record-count [`Snapshot`]s taken before and after the trigger, and the
//! result of that inference is a [`WorkflowOutcome`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Status text used when the backend accepts a request without saying
/// anything useful about it.
pub const DEFAULT_ACKNOWLEDGEMENT: &str = "Data collection triggered";

/// Point-in-time cardinality of the record store.
///
/// Snapshots carry no identity. Two snapshots are only ever compared by
/// count because the store offers no transaction or change-log API.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Snapshot {
    /// Number of records visible to the read.
    pub count: u64,
}

impl Snapshot {
    /// Creates a snapshot of `count` records.
    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self { count }
    }

    /// Number of records added since `baseline`, or `None` if this
    /// snapshot does not exceed it.
    #[must_use]
    pub const fn added_since(self, baseline: Self) -> Option<u64> {
        if self.count > baseline.count {
            Some(self.count - baseline.count)
        } else {
            None
        }
    }
}

/// The backend's immediate reply to a collection request.
///
/// Only says the request was accepted for asynchronous processing. It
/// carries no guarantee that the job will succeed or insert anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAcknowledgement {
    /// Human-readable status reported by the backend.
    pub status_message: String,
}

impl TriggerAcknowledgement {
    /// Wraps a backend status, falling back to [`DEFAULT_ACKNOWLEDGEMENT`]
    /// when the backend sent nothing usable.
    #[must_use]
    pub fn from_status(status: Option<String>) -> Self {
        let status_message = status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ACKNOWLEDGEMENT.to_string());
        Self { status_message }
    }
}

/// Terminal result of one trigger workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// The record count rose by `added` (always > 0) within the
    /// observation window.
    Succeeded {
        /// Records added since the baseline.
        added: u64,
    },
    /// No increase was observed before the poll budget ran out. The job
    /// may still be running or may have found nothing new.
    NoChangeDetected,
    /// The workflow could not complete.
    Failed {
        /// User-facing explanation.
        reason: String,
    },
}

impl WorkflowOutcome {
    /// Builds the outcome for a confirmed delta (`0` means no change).
    #[must_use]
    pub const fn from_delta(added: u64) -> Self {
        if added > 0 {
            Self::Succeeded { added }
        } else {
            Self::NoChangeDetected
        }
    }

    /// Shorthand for [`Self::Failed`].
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether this outcome is a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl std::fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded { added: 1 } => write!(f, "Done: 1 solar flare added."),
            Self::Succeeded { added } => write!(f, "Done: {added} solar flares added."),
            Self::NoChangeDetected => write!(f, "Triggered, but no new records detected yet."),
            Self::Failed { reason } => write!(f, "Failed: {reason}"),
        }
    }
}

/// State of the trigger workflow as seen by observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    /// Nothing has been submitted yet.
    #[default]
    Idle,
    /// Baseline read and trigger request in progress.
    Submitting,
    /// Trigger accepted; waiting for the record count to move.
    Confirming {
        /// Status text from the backend's acknowledgement.
        acknowledgement: String,
        /// Poll attempts completed so far.
        attempts: u32,
        /// Poll budget.
        max_attempts: u32,
    },
    /// The workflow finished.
    Resolved(WorkflowOutcome),
}

impl WorkflowState {
    /// Whether a workflow is currently in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::Confirming { .. })
    }

    /// The terminal outcome, if resolved.
    #[must_use]
    pub const fn outcome(&self) -> Option<&WorkflowOutcome> {
        match self {
            Self::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Submitting => write!(f, "Requesting data collection..."),
            Self::Confirming {
                acknowledgement,
                attempts,
                max_attempts,
            } => write!(
                f,
                "{acknowledgement}, checking store ({attempts}/{max_attempts})..."
            ),
            Self::Resolved(outcome) => write!(f, "{outcome}"),
        }
    }
}

/// Which records a snapshot counts.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SnapshotScope {
    /// Count the whole store. Catches records the job files outside the
    /// requested window.
    #[default]
    All,
    /// Count only records inside the submitted range.
    Range,
}

/// Bounds on the confirmation poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of snapshot reads after the trigger.
    pub max_attempts: u32,
    /// Delay before each read.
    pub interval: Duration,
    /// Longest a single read may take before it counts as failed.
    pub read_timeout: Duration,
    /// Wall-clock ceiling, checked after each failed read. `None` uses
    /// [`Self::effective_max_wait`]'s derived default.
    pub max_wait: Option<Duration>,
}

impl PollPolicy {
    /// Default poll budget.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
    /// Default delay between reads.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
    /// Default per-read allowance, matching the HTTP request timeout.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a policy with the default read timeout and a derived
    /// wall-clock ceiling.
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            max_wait: None,
        }
    }

    /// Sets the per-read allowance.
    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets an explicit wall-clock ceiling.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Shortest time `max_attempts` reads can take: the sleeps alone.
    #[must_use]
    pub fn nominal_duration(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }

    /// The ceiling actually enforced: the explicit value, or
    /// `max_attempts * (interval + read_timeout)`, which a loop of
    /// answered reads can never exceed.
    #[must_use]
    pub fn effective_max_wait(&self) -> Duration {
        self.max_wait.unwrap_or_else(|| {
            self.interval
                .saturating_add(self.read_timeout)
                .saturating_mul(self.max_attempts)
        })
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}
