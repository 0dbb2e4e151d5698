//! Confirms that a triggered collection job actually added records.
//!
//! The backend reports nothing when a job finishes, so the only signal is
//! the record count moving past the baseline taken before the trigger.

use solar_flares_flare_models::DateRange;
use solar_flares_ingestion_models::{PollPolicy, Snapshot};
use tokio::time::Instant;

use crate::snapshot::SnapshotReader;

/// Polls `reader` until the count exceeds `baseline`.
///
/// Each attempt sleeps [`PollPolicy::interval`] and then reads, giving the
/// read at most [`PollPolicy::read_timeout`]. The first read above the
/// baseline returns the positive delta. Failed or timed-out reads use up an
/// attempt. Running out of attempts returns `0`; that is a timeout and not
/// an error, since the job may simply still be running.
///
/// [`PollPolicy::effective_max_wait`] is only consulted after a failed
/// read: answered reads always run the full budget, however slow they are.
///
/// `on_attempt(attempt, max_attempts)` is called after each attempt.
pub async fn confirm<R, F>(
    reader: &R,
    baseline: Snapshot,
    range: Option<&DateRange>,
    policy: &PollPolicy,
    mut on_attempt: F,
) -> u64
where
    R: SnapshotReader + ?Sized,
    F: FnMut(u32, u32),
{
    let max_attempts = policy.max_attempts;
    let ceiling = policy.effective_max_wait();
    let started = Instant::now();

    for attempt in 1..=max_attempts {
        tokio::time::sleep(policy.interval).await;
        let read = tokio::time::timeout(policy.read_timeout, reader.read_snapshot(range)).await;

        on_attempt(attempt, max_attempts);

        match read {
            Ok(Ok(snapshot)) => {
                if let Some(added) = snapshot.added_since(baseline) {
                    log::info!(
                        "Count rose from {} to {} on attempt {attempt}/{max_attempts}",
                        baseline.count,
                        snapshot.count
                    );
                    return added;
                }
                log::debug!(
                    "Attempt {attempt}/{max_attempts}: count {} (baseline {})",
                    snapshot.count,
                    baseline.count
                );
                continue;
            }
            Ok(Err(e)) => {
                log::warn!("Attempt {attempt}/{max_attempts} skipped: {e}");
            }
            Err(_) => {
                log::warn!(
                    "Attempt {attempt}/{max_attempts} skipped: no answer within {:?}",
                    policy.read_timeout
                );
            }
        }

        if attempt < max_attempts && started.elapsed() >= ceiling {
            log::warn!(
                "Giving up after attempt {attempt}/{max_attempts}: failed reads ran past the {ceiling:?} ceiling"
            );
            return 0;
        }
    }

    log::info!(
        "No increase over baseline {} after {max_attempts} attempts",
        baseline.count
    );
    0
}
