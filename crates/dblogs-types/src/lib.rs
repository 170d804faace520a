//! Shared types for dblogs
//!
//! This crate contains the data structures passed between the Kubernetes
//! collaborator, the log collector and the CLI.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Workload / Pod Types
// ============================================================================

/// A database workload and the namespace its pods run in
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkloadInfo {
    pub name: String,
    pub namespace: String,
}

impl WorkloadInfo {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Reference to a container inside a pod.
///
/// The empty name selects the pod's default container and is what a
/// single-container pod is streamed with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ContainerRef {
    pub name: String,
}

impl ContainerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The unnamed reference ("the pod's only container")
    pub fn default_container() -> Self {
        Self::default()
    }

    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }
}

/// A pod and its containers, as enumerated from the control plane
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PodDescriptor {
    pub name: String,
    pub containers: Vec<ContainerRef>,
    pub init_containers: Vec<ContainerRef>,
}

impl PodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: Vec::new(),
            init_containers: Vec::new(),
        }
    }

    pub fn with_containers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.containers = names.into_iter().map(ContainerRef::new).collect();
        self
    }

    pub fn with_init_containers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.init_containers = names.into_iter().map(ContainerRef::new).collect();
        self
    }

    /// Exactly one regular container: logged straight to `<root>/<pod>.log`
    pub fn is_single_container(&self) -> bool {
        self.containers.len() == 1
    }
}

// ============================================================================
// Task Types
// ============================================================================

/// One pod's unit of work for the scheduler
#[derive(Clone, Debug)]
pub struct LogTask {
    pub pod: PodDescriptor,
    pub destination_root: PathBuf,
}

/// A single container log to fetch and where it lands on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamTarget {
    /// Container requested from the log API
    pub container: ContainerRef,

    /// Container name used in reports and log lines
    pub label: String,

    /// Destination file
    pub path: PathBuf,
}

impl LogTask {
    pub fn new(pod: PodDescriptor, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            pod,
            destination_root: destination_root.into(),
        }
    }

    /// Subdirectory holding this pod's logs, if it needs one
    pub fn pod_dir(&self) -> Option<PathBuf> {
        if self.pod.is_single_container() {
            return None;
        }
        if self.pod.containers.is_empty() && self.pod.init_containers.is_empty() {
            return None;
        }
        Some(self.destination_root.join(&self.pod.name))
    }

    /// Streams for this pod in fetch order: regular containers, then init containers
    pub fn streams(&self) -> Vec<StreamTarget> {
        if self.pod.is_single_container() {
            return vec![StreamTarget {
                container: ContainerRef::default_container(),
                label: self.pod.containers[0].name.clone(),
                path: self
                    .destination_root
                    .join(format!("{}.log", self.pod.name)),
            }];
        }

        let Some(dir) = self.pod_dir() else {
            return Vec::new();
        };

        self.pod
            .containers
            .iter()
            .chain(self.pod.init_containers.iter())
            .map(|c| StreamTarget {
                container: c.clone(),
                label: c.name.clone(),
                path: dir.join(format!("{}.log", c.name)),
            })
            .collect()
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Why a single container log could not be collected
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("could not open log stream: {0:#}")]
    Open(anyhow::Error),

    #[error("could not create log file: {0}")]
    FileCreate(#[source] std::io::Error),

    #[error("could not write log to file: {0}")]
    Copy(#[source] std::io::Error),

    #[error("log stream made no progress for {0:?}")]
    Timeout(Duration),

    #[error("log worker panicked: {0}")]
    Panicked(String),
}

/// Outcome of streaming one container log to disk
#[derive(Debug)]
pub struct StreamResult {
    pub pod: String,
    pub container: String,
    pub path: PathBuf,
    pub bytes_written: u64,
    pub error: Option<StreamError>,
}

impl StreamResult {
    pub fn success(target: &StreamTarget, pod: &str, bytes_written: u64) -> Self {
        Self {
            pod: pod.to_string(),
            container: target.label.clone(),
            path: target.path.clone(),
            bytes_written,
            error: None,
        }
    }

    pub fn failure(
        target: &StreamTarget,
        pod: &str,
        bytes_written: u64,
        error: StreamError,
    ) -> Self {
        Self {
            pod: pod.to_string(),
            container: target.label.clone(),
            path: target.path.clone(),
            bytes_written,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything one pod worker produced
#[derive(Debug)]
pub struct PodReport {
    pub pod: String,
    pub results: Vec<StreamResult>,

    /// Set when the worker panicked or its task was lost
    pub panic: Option<String>,
}

impl PodReport {
    pub fn new(pod: impl Into<String>, results: Vec<StreamResult>) -> Self {
        Self {
            pod: pod.into(),
            results,
            panic: None,
        }
    }

    pub fn panicked(pod: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            results: Vec::new(),
            panic: Some(message.into()),
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.results.iter().map(|r| r.bytes_written).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StreamResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }

    pub fn is_ok(&self) -> bool {
        self.panic.is_none() && self.results.iter().all(StreamResult::is_ok)
    }
}

/// The result of a whole collection run
#[derive(Debug)]
pub struct CollectionReport {
    pub namespace: String,
    pub selector: String,
    pub root: PathBuf,

    /// Number of pod tasks handed to the scheduler
    pub dispatched: usize,

    pub pods: Vec<PodReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CollectionReport {
    pub fn total_bytes(&self) -> u64 {
        self.pods.iter().map(PodReport::bytes_written).sum()
    }

    pub fn stream_count(&self) -> usize {
        self.pods.iter().map(|p| p.results.len()).sum()
    }

    pub fn failed_streams(&self) -> usize {
        self.pods.iter().map(|p| p.failures().count()).sum()
    }

    pub fn failed_pods(&self) -> usize {
        self.pods.iter().filter(|p| !p.is_ok()).count()
    }

    pub fn is_success(&self) -> bool {
        self.pods.iter().all(PodReport::is_ok)
    }
}

// ============================================================================
// Summary Types (serializable view of a report)
// ============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct StreamSummary {
    pub container: String,
    pub path: PathBuf,
    pub bytes_written: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PodSummary {
    pub pod: String,
    pub bytes_written: u64,
    pub streams: Vec<StreamSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panic: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CollectionSummary {
    pub namespace: String,
    pub selector: String,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub pods: Vec<PodSummary>,
    pub total_bytes: u64,
    pub failed_streams: usize,
    pub success: bool,
}

impl From<&CollectionReport> for CollectionSummary {
    fn from(report: &CollectionReport) -> Self {
        let pods = report
            .pods
            .iter()
            .map(|p| PodSummary {
                pod: p.pod.clone(),
                bytes_written: p.bytes_written(),
                streams: p
                    .results
                    .iter()
                    .map(|r| StreamSummary {
                        container: r.container.clone(),
                        path: r.path.clone(),
                        bytes_written: r.bytes_written,
                        error: r.error.as_ref().map(|e| e.to_string()),
                    })
                    .collect(),
                panic: p.panic.clone(),
            })
            .collect();

        Self {
            namespace: report.namespace.clone(),
            selector: report.selector.clone(),
            root: report.root.clone(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            elapsed_ms: (report.finished_at - report.started_at).num_milliseconds(),
            pods,
            total_bytes: report.total_bytes(),
            failed_streams: report.failed_streams(),
            success: report.is_success(),
        }
    }
}

impl CollectionSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
