//! Build pipeline
//!
//! Ties detection, version resolution, caching and the selected strategy
//! together for one application directory.

pub mod orchestrator;
pub mod report;

pub use orchestrator::{BuildOrchestrator, BuildRequest};
pub use report::{BuildReport, RubySummary};
