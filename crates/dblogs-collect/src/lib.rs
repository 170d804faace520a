//! Log collection for dblogs
//!
//! This crate resolves a workload to its namespace, enumerates the pods to
//! export, prepares the output tree and streams every container log to disk
//! with one concurrent worker per pod.

mod collector;
mod copier;
mod error;
mod output;
mod report;
mod resolve;
mod scheduler;

#[cfg(test)]
mod testing;

pub use collector::{CollectOptions, Collector};
pub use copier::StreamCopier;
pub use error::{CollectError, ResolveError};
pub use output::{ensure_pod_subdir, prepare};
pub use report::{EXIT_PARTIAL, EXIT_SUCCESS, exit_code, log_report, render_text};
pub use resolve::{WorkloadCatalog, WorkloadChooser, resolve_namespace};
pub use scheduler::Scheduler;

// Re-export types used in our public API
pub use dblogs_types::{
    CollectionReport, CollectionSummary, LogTask, PodDescriptor, PodReport, StreamError,
    StreamResult, WorkloadInfo,
};
