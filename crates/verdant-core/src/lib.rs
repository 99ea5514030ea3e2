//! `verdant-core` — shared config and data model for the verdant daemon.
//!
//! Holds the [`Record`] produced by every job run, the [`LastValues`] map the
//! scheduler shares across jobs, and the figment-backed [`VerdantConfig`].

pub mod config;
pub mod error;
pub mod record;

pub use config::VerdantConfig;
pub use error::{RecordError, Result};
pub use record::{table_name, FlatRecord, LastValues, Reading, Record};
