//! `verdant-scheduler` — cron-driven job execution with hot-reloaded config.
//!
//! # Overview
//!
//! The [`Scheduler`] polls once per second. Each tick it re-checks the jobs
//! file (cheap no-op unless its mtime advanced), computes a single "now",
//! and runs every due job in configuration order. Results land in the shared
//! last-values map — a job later in the file sees values produced by earlier
//! jobs in the same tick — and are handed to the [`TickSink`] for storage.
//!
//! A failing job is logged and its `next_run` still advances; one misbehaving
//! sensor never stalls the others.

pub mod error;
pub mod registry;
pub mod schedule;
pub mod scheduler;

pub use error::{ConfigError, Result};
pub use registry::{JobRegistry, JobSpec};
pub use scheduler::{Scheduler, TickSink};
