//! The submit → trigger → confirm → resolve workflow.
//!
//! Each submission runs as its own tokio task and reports progress through
//! a [`watch`] channel of [`WorkflowState`]. Only the most recent
//! submission may publish: starting a new one cancels the previous task
//! and bumps a generation counter that every publication is checked
//! against.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, TimeZone};
use futures::FutureExt as _;
use solar_flares_flare_models::DateRange;
use solar_flares_ingestion_models::{
    PollPolicy, SnapshotScope, TriggerAcknowledgement, WorkflowOutcome, WorkflowState,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::poller;
use crate::range::{self, RangeError};
use crate::snapshot::SnapshotReader;
use crate::trigger::IngestionTrigger;

/// Drives data collection requests against a reader and a trigger.
///
/// Cheap to clone; clones share state and observers.
pub struct TriggerWorkflow<R, T> {
    inner: Arc<Inner<R, T>>,
}

impl<R, T> Clone for TriggerWorkflow<R, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<R, T> {
    reader: R,
    trigger: T,
    policy: PollPolicy,
    scope: SnapshotScope,
    state: watch::Sender<WorkflowState>,
    current: Mutex<Invocation>,
}

/// Bookkeeping for the invocation allowed to publish.
#[derive(Default)]
struct Invocation {
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// A running (or finished) submission.
#[derive(Debug)]
pub struct WorkflowHandle {
    generation: u64,
    range: DateRange,
    task: JoinHandle<Option<WorkflowOutcome>>,
}

impl WorkflowHandle {
    /// Sequence number of this submission, starting at 1.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The normalized range that was submitted.
    #[must_use]
    pub const fn range(&self) -> &DateRange {
        &self.range
    }

    /// Waits for this submission to finish.
    ///
    /// Returns `None` if a newer submission superseded it before it could
    /// resolve.
    pub async fn outcome(self) -> Option<WorkflowOutcome> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Workflow #{} task failed: {e}", self.generation);
                None
            }
        }
    }
}

impl<R, T> TriggerWorkflow<R, T>
where
    R: SnapshotReader + 'static,
    T: IngestionTrigger + 'static,
{
    /// Creates an idle workflow.
    pub fn new(reader: R, trigger: T, policy: PollPolicy, scope: SnapshotScope) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            inner: Arc::new(Inner {
                reader,
                trigger,
                policy,
                scope,
                state,
                current: Mutex::new(Invocation::default()),
            }),
        }
    }

    /// Observes state changes. The receiver starts at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.inner.state.subscribe()
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.inner.state.borrow().clone()
    }

    /// The poll bounds in use.
    #[must_use]
    pub fn policy(&self) -> &PollPolicy {
        &self.inner.policy
    }

    /// Normalizes raw input in the local zone and starts a workflow.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_in`].
    pub fn submit(&self, raw_start: &str, raw_end: &str) -> Result<WorkflowHandle, RangeError> {
        self.submit_in(raw_start, raw_end, &Local)
    }

    /// Normalizes raw input in `tz` and starts a workflow.
    ///
    /// Invalid input never starts anything. If nothing is in flight the
    /// failure is also published as `Resolved(Failed)`; if a workflow is
    /// running it is left alone and only the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the [`RangeError`] from normalization.
    pub fn submit_in<Tz: TimeZone>(
        &self,
        raw_start: &str,
        raw_end: &str,
        tz: &Tz,
    ) -> Result<WorkflowHandle, RangeError> {
        match range::normalize_in(raw_start, raw_end, tz) {
            Ok(range) => Ok(self.submit_range(range)),
            Err(e) => {
                log::warn!("Rejected collection request: {e}");
                self.inner.state.send_if_modified(|state| {
                    if state.is_busy() {
                        false
                    } else {
                        *state = WorkflowState::Resolved(WorkflowOutcome::failed(e.to_string()));
                        true
                    }
                });
                Err(e)
            }
        }
    }

    /// Starts a workflow for an already validated range, superseding any
    /// workflow still in flight.
    pub fn submit_range(&self, range: DateRange) -> WorkflowHandle {
        let cancel = CancellationToken::new();
        let generation = {
            let mut current = self.inner.lock_current();
            if let Some(previous) = current.cancel.replace(cancel.clone()) {
                previous.cancel();
                log::info!("Workflow #{} superseded", current.generation);
            }
            current.generation += 1;
            self.inner.state.send_replace(WorkflowState::Submitting);
            current.generation
        };
        log::info!("Workflow #{generation}: collecting {range}");

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let run = AssertUnwindSafe(inner.execute(generation, range)).catch_unwind();
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    log::debug!("Workflow #{generation} cancelled");
                    return None;
                }
                result = run => result.unwrap_or_else(|_| {
                    log::error!("Workflow #{generation} panicked");
                    WorkflowOutcome::failed("internal error while confirming collection")
                }),
            };
            log::info!("Workflow #{generation}: {outcome}");
            inner
                .resolve(generation, WorkflowState::Resolved(outcome.clone()))
                .then_some(outcome)
        });

        WorkflowHandle {
            generation,
            range,
            task,
        }
    }

    /// Submits in the local zone and waits for the outcome.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_in`].
    pub async fn run(
        &self,
        raw_start: &str,
        raw_end: &str,
    ) -> Result<Option<WorkflowOutcome>, RangeError> {
        Ok(self.submit(raw_start, raw_end)?.outcome().await)
    }

    /// Submits in `tz` and waits for the outcome.
    ///
    /// # Errors
    ///
    /// See [`Self::submit_in`].
    pub async fn run_in<Tz: TimeZone>(
        &self,
        raw_start: &str,
        raw_end: &str,
        tz: &Tz,
    ) -> Result<Option<WorkflowOutcome>, RangeError> {
        let handle = self.submit_in(raw_start, raw_end, tz)?;
        Ok(handle.outcome().await)
    }
}

impl<R: SnapshotReader, T: IngestionTrigger> Inner<R, T> {
    async fn execute(&self, generation: u64, range: DateRange) -> WorkflowOutcome {
        let scoped = match self.scope {
            SnapshotScope::All => None,
            SnapshotScope::Range => Some(&range),
        };

        let baseline = match self.reader.read_snapshot(scoped).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Workflow #{generation}: baseline read failed: {e}");
                return WorkflowOutcome::failed(format!(
                    "could not read the current record count: {e}"
                ));
            }
        };
        log::debug!("Workflow #{generation}: baseline {}", baseline.count);

        let acknowledgement = match self.trigger.trigger(&range).await {
            Ok(acknowledgement) => acknowledgement,
            Err(e) => {
                log::error!("Workflow #{generation}: {e}");
                return WorkflowOutcome::failed(e.to_string());
            }
        };
        log::info!(
            "Workflow #{generation}: {}",
            acknowledgement.status_message
        );

        let max_attempts = self.policy.max_attempts;
        self.publish(generation, confirming(&acknowledgement, 0, max_attempts));

        let added = poller::confirm(
            &self.reader,
            baseline,
            scoped,
            &self.policy,
            |attempts, max_attempts| {
                self.publish(
                    generation,
                    confirming(&acknowledgement, attempts, max_attempts),
                );
            },
        )
        .await;

        WorkflowOutcome::from_delta(added)
    }

    /// Publishes `state` if `generation` is still the latest submission.
    fn publish(&self, generation: u64, state: WorkflowState) -> bool {
        let current = self.lock_current();
        if current.generation != generation {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    /// Publishes a terminal state and releases the cancellation slot.
    fn resolve(&self, generation: u64, state: WorkflowState) -> bool {
        let mut current = self.lock_current();
        if current.generation != generation {
            log::debug!("Workflow #{generation} resolved after being superseded");
            return false;
        }
        current.cancel = None;
        self.state.send_replace(state);
        true
    }

    fn lock_current(&self) -> MutexGuard<'_, Invocation> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn confirming(
    acknowledgement: &TriggerAcknowledgement,
    attempts: u32,
    max_attempts: u32,
) -> WorkflowState {
    WorkflowState::Confirming {
        acknowledgement: acknowledgement.status_message.clone(),
        attempts,
        max_attempts,
    }
}
