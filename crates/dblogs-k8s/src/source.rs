//! Control-plane interfaces consumed by the collector

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncRead;

use dblogs_types::{ContainerRef, PodDescriptor, WorkloadInfo};

/// Readable log content for one container, positioned at its start
pub type LogReader = Pin<Box<dyn AsyncRead + Send>>;

/// Lists the pods of a namespace
#[async_trait]
pub trait PodSource: Send + Sync {
    /// List pods in `namespace` matching `selector` (empty selects every pod)
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodDescriptor>>;
}

/// Opens container log streams within one namespace
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Open the currently available log of `container` in `pod`.
    /// The default container reference selects the pod's only container.
    async fn open_log(&self, pod: &str, container: &ContainerRef) -> Result<LogReader>;
}

/// Provides the known workloads a name can resolve against
#[async_trait]
pub trait WorkloadSource: Send + Sync {
    async fn workloads(&self) -> Result<Vec<WorkloadInfo>>;
}
