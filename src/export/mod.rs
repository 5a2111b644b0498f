//! Snapshot export: store facts -> register table
//!
//! [`Exporter`] builds one complete [`ExportTable`] per refresh and publishes
//! it with an atomic pointer swap, so readers always see either the previous
//! table or the new one. [`RefreshScheduler`] drives refreshes on a fixed
//! period and records their outcome in [`RefreshState`].

mod error;
mod exporter;
mod scheduler;
mod table;

pub use error::ExportError;
pub use exporter::{ExportSettings, Exporter};
pub use scheduler::{RefreshPhase, RefreshScheduler, RefreshState, TickOutcome};
pub use table::ExportTable;
