#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the solar flares tools.
//!
//! Provides an `indicatif` display for a running collection workflow
//! ([`WorkflowSpinner`]), plus [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while progress bars redraw.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use solar_flares_ingestion_models::WorkflowState;
use tokio::sync::watch;

pub use indicatif::MultiProgress;

/// Renders [`WorkflowState`] changes as a single progress line.
///
/// Starts as a spinner while the request is being submitted and turns into
/// an attempts bar once confirmation polling begins.
pub struct WorkflowSpinner {
    bar: ProgressBar,
    /// Style to switch to once the poll budget is known.
    bar_style: ProgressStyle,
}

impl WorkflowSpinner {
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, bar_style }
    }

    /// Shows `state`.
    pub fn render(&self, state: &WorkflowState) {
        match state {
            WorkflowState::Confirming {
                attempts,
                max_attempts,
                ..
            } => {
                let total = u64::from(*max_attempts);
                if self.bar.length() != Some(total) {
                    self.bar.set_length(total);
                    self.bar.set_style(self.bar_style.clone());
                }
                self.bar.set_position(u64::from(*attempts));
                self.bar.set_message(state_message(state));
            }
            WorkflowState::Resolved(_) => self.bar.finish_with_message(state_message(state)),
            WorkflowState::Idle | WorkflowState::Submitting => {
                self.bar.set_message(state_message(state));
            }
        }
    }

    /// Renders every state published on `rx` until the workflow resolves,
    /// and returns the terminal state.
    ///
    /// Subscribe after submitting; a receiver created earlier may still
    /// hold the previous run's `Resolved` state. If the sender goes away
    /// first, the last state seen is returned.
    pub async fn follow(&self, mut rx: watch::Receiver<WorkflowState>) -> WorkflowState {
        loop {
            let state = rx.borrow_and_update().clone();
            self.render(&state);
            if matches!(state, WorkflowState::Resolved(_)) {
                return state;
            }
            if rx.changed().await.is_err() {
                log::warn!("Workflow stopped reporting before it resolved");
                self.bar.abandon();
                return state;
            }
        }
    }
}

/// Text shown next to the spinner or bar for `state`.
///
/// While confirming, the bar itself carries the attempt count, so only the
/// backend's acknowledgement is shown.
#[must_use]
pub fn state_message(state: &WorkflowState) -> String {
    match state {
        WorkflowState::Confirming {
            acknowledgement, ..
        } => format!("{acknowledgement}, checking for new records"),
        other => other.to_string(),
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    // Build the pretty-env-logger logger manually so we can wrap it.
    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;
    use solar_flares_ingestion_models::WorkflowOutcome;

    use super::*;

    fn hidden() -> WorkflowSpinner {
        WorkflowSpinner::with_bar(ProgressBar::with_draw_target(
            None,
            ProgressDrawTarget::hidden(),
        ))
    }

    fn confirming(attempts: u32) -> WorkflowState {
        WorkflowState::Confirming {
            acknowledgement: "Data collection started".to_string(),
            attempts,
            max_attempts: 20,
        }
    }

    #[test]
    fn confirming_message_leaves_count_to_the_bar() {
        assert_eq!(
            state_message(&confirming(3)),
            "Data collection started, checking for new records"
        );
        assert_eq!(
            state_message(&WorkflowState::Resolved(WorkflowOutcome::Succeeded {
                added: 2
            })),
            "Done: 2 solar flares added."
        );
    }

    #[test]
    fn confirming_switches_to_attempt_bar() {
        let spinner = hidden();
        spinner.render(&WorkflowState::Submitting);
        assert_eq!(spinner.bar.length(), None);

        spinner.render(&confirming(4));
        assert_eq!(spinner.bar.length(), Some(20));
        assert_eq!(spinner.bar.position(), 4);
    }

    #[tokio::test]
    async fn follow_returns_terminal_state() {
        let (tx, rx) = watch::channel(WorkflowState::Submitting);
        let spinner = hidden();

        let follower = spinner.follow(rx);
        let publisher = async {
            tx.send_replace(confirming(1));
            tokio::task::yield_now().await;
            tx.send_replace(WorkflowState::Resolved(WorkflowOutcome::NoChangeDetected));
        };
        let (state, ()) = tokio::join!(follower, publisher);

        assert_eq!(
            state,
            WorkflowState::Resolved(WorkflowOutcome::NoChangeDetected)
        );
        assert!(spinner.bar.is_finished());
    }

    #[tokio::test]
    async fn follow_gives_up_when_sender_drops() {
        let (tx, rx) = watch::channel(WorkflowState::Submitting);
        drop(tx);
        let spinner = hidden();

        assert_eq!(spinner.follow(rx).await, WorkflowState::Submitting);
    }
}
