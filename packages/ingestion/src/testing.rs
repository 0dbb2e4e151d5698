//! In-memory readers and triggers for workflow tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use solar_flares_flare_models::DateRange;
use solar_flares_ingestion_models::{Snapshot, TriggerAcknowledgement};

use crate::snapshot::{SnapshotError, SnapshotReader};
use crate::trigger::{IngestionTrigger, TriggerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read(Option<DateRange>),
    Trigger(DateRange),
}

/// Shared, ordered record of every call made against the doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Read(_)))
            .count()
    }

    pub fn triggers(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Trigger(_)))
            .count()
    }
}

pub fn transient() -> Result<u64, SnapshotError> {
    Err(SnapshotError::TransientReadFailure {
        message: "connection reset".to_string(),
    })
}

/// Answers reads from a script; once the script runs out it keeps
/// returning the last successful count.
pub struct ScriptedReader {
    steps: Mutex<VecDeque<Result<u64, SnapshotError>>>,
    settled: AtomicU64,
    latency: Duration,
    log: CallLog,
}

impl ScriptedReader {
    pub fn new(log: &CallLog, steps: Vec<Result<u64, SnapshotError>>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            settled: AtomicU64::new(0),
            latency: Duration::ZERO,
            log: log.clone(),
        }
    }

    pub fn counts(log: &CallLog, counts: &[u64]) -> Self {
        Self::new(log, counts.iter().copied().map(Ok).collect())
    }

    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl SnapshotReader for ScriptedReader {
    async fn read_snapshot(&self, range: Option<&DateRange>) -> Result<Snapshot, SnapshotError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.log.push(Call::Read(range.copied()));

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Ok(count)) => {
                self.settled.store(count, Ordering::SeqCst);
                Ok(Snapshot::new(count))
            }
            Some(Err(e)) => Err(e),
            None => Ok(Snapshot::new(self.settled.load(Ordering::SeqCst))),
        }
    }
}

/// A store whose count the test moves by hand.
#[derive(Debug)]
pub struct LiveStore {
    count: AtomicU64,
    log: CallLog,
}

impl LiveStore {
    pub fn new(log: &CallLog, count: u64) -> Arc<Self> {
        Arc::new(Self {
            count: AtomicU64::new(count),
            log: log.clone(),
        })
    }

    pub fn set(&self, count: u64) {
        self.count.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotReader for LiveStore {
    async fn read_snapshot(&self, range: Option<&DateRange>) -> Result<Snapshot, SnapshotError> {
        self.log.push(Call::Read(range.copied()));
        Ok(Snapshot::new(self.count.load(Ordering::SeqCst)))
    }
}

/// Never answers.
pub struct StalledReader;

#[async_trait]
impl SnapshotReader for StalledReader {
    async fn read_snapshot(&self, _range: Option<&DateRange>) -> Result<Snapshot, SnapshotError> {
        std::future::pending().await
    }
}

/// Records each trigger and answers with a fixed result.
pub struct RecordingTrigger {
    result: Result<TriggerAcknowledgement, TriggerError>,
    log: CallLog,
}

impl RecordingTrigger {
    pub fn accepting(log: &CallLog) -> Self {
        Self {
            result: Ok(TriggerAcknowledgement::from_status(Some(
                "Data collection started".to_string(),
            ))),
            log: log.clone(),
        }
    }

    pub fn failing(log: &CallLog, error: TriggerError) -> Self {
        Self {
            result: Err(error),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl IngestionTrigger for RecordingTrigger {
    async fn trigger(&self, range: &DateRange) -> Result<TriggerAcknowledgement, TriggerError> {
        self.log.push(Call::Trigger(*range));
        self.result.clone()
    }
}
