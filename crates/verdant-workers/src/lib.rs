//! `verdant-workers` — the worker capability and the class-name registry.
//!
//! A [`Worker`] is the uniform interface every sensor/actuator driver
//! implements: scoped acquire/release around one unit of work, plus a single
//! `do_work` call that sees the shared last-values map and may produce a
//! reading. Drivers are selected by class name from a [`WorkerRegistry`]
//! built at startup, so a typo in the jobs file fails config validation
//! instead of the first scheduled run.

pub mod builtin;
pub mod error;
pub mod registry;

pub use error::{Result, WorkerError};
pub use registry::{Params, Worker, WorkerRegistry};
