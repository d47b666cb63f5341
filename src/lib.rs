//! Store-visit monitoring: keeps the visit form state on disk and writes the
//! selected outlets into a monthly Excel template.

pub mod config;
pub mod export;
pub mod period;
pub mod sheet;
pub mod state;
mod test;

pub use config::Config;
pub use export::{ExportError, VisitExport, export_visits};
pub use period::{Month, Period};
pub use state::{Operator, SessionState, StateStore};
