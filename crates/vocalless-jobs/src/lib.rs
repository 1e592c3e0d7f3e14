//! Process-wide job registry.
//!
//! Jobs live in memory for the lifetime of the process. The registry is the
//! only state shared between API handlers and pipeline tasks.

pub mod error;
pub mod registry;

pub use error::{JobsError, JobsResult};
pub use registry::{CancelSignal, JobRegistry};
