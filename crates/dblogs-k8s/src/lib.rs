//! Kubernetes client for dblogs
//!
//! This crate defines the control-plane interfaces the log collector
//! consumes (pod listing, log streams, workload metadata) and implements
//! them on top of the Kubernetes API.

mod client;
mod source;

pub use client::{KubeClient, PodLogs, log_params, pod_descriptor};
pub use source::{LogReader, LogSource, PodSource, WorkloadSource};

// Re-export types that are used in our public API
pub use dblogs_types::{ContainerRef, PodDescriptor, WorkloadInfo};
