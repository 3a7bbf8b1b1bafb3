//! Follow-up scheduler — timer-driven sweeps over stale open tickets.

pub mod registry;
pub mod sweep;

pub use registry::FollowUpScheduler;
pub use sweep::{SweepReport, run_sweep};
