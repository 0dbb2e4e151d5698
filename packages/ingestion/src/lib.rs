#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trigger-and-confirm workflow for solar flare data collection.
//!
//! The collection backend accepts a date range and starts a job in the
//! background, reporting nothing when the job finishes. This crate wraps
//! that in a workflow that:
//!
//! 1. normalizes user input into a UTC date range ([`range`])
//! 2. records a baseline count ([`snapshot`])
//! 3. fires the job exactly once ([`trigger`])
//! 4. polls until the count rises or the budget runs out ([`poller`])
//!
//! [`workflow::TriggerWorkflow`] ties the steps together and publishes
//! progress as a stream of
//! [`WorkflowState`](solar_flares_ingestion_models::WorkflowState)s.

pub mod config;
pub mod poller;
pub mod range;
pub mod snapshot;
pub mod trigger;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, DashboardConfig};
pub use range::RangeError;
pub use snapshot::{SnapshotError, SnapshotReader};
pub use trigger::{IngestionTrigger, TriggerError};
pub use workflow::{TriggerWorkflow, WorkflowHandle};
