use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::copier::StreamCopier;
use crate::error::CollectError;
use crate::output;
use crate::report;
use crate::scheduler::Scheduler;
use dblogs_k8s::{LogSource, PodSource};
use dblogs_types::{CollectionReport, LogTask};

/// Tuning for a collection run
#[derive(Clone, Debug, Default)]
pub struct CollectOptions {
    /// Longest silence tolerated on a container stream; `None` waits forever
    pub idle_timeout: Option<Duration>,

    /// Cap on concurrently streaming pods; `None` runs every pod at once
    pub max_concurrency: Option<usize>,
}

/// Exports the logs of every pod matching a selector into a directory tree
pub struct Collector {
    pods: Arc<dyn PodSource>,
    scheduler: Scheduler,
}

impl Collector {
    pub fn new(
        pods: Arc<dyn PodSource>,
        logs: Arc<dyn LogSource>,
        options: CollectOptions,
    ) -> Self {
        let copier = Arc::new(StreamCopier::new(logs, options.idle_timeout));
        let scheduler = Scheduler::new(copier).with_max_concurrency(options.max_concurrency);
        Self { pods, scheduler }
    }

    /// Enumerate pods, rebuild `root` and stream every container log into it.
    ///
    /// Discovery and directory failures abort before anything is written;
    /// per-container failures only show up in the returned report.
    pub async fn collect(
        &self,
        namespace: &str,
        selector: &str,
        root: &Path,
    ) -> Result<CollectionReport, CollectError> {
        let started_at = Utc::now();

        let discovery_error = |cause| CollectError::Discovery {
            namespace: namespace.to_string(),
            cause,
        };
        if namespace.is_empty() {
            return Err(discovery_error(anyhow::anyhow!("namespace must not be empty")));
        }

        let pods = self
            .pods
            .list_pods(namespace, selector)
            .await
            .map_err(discovery_error)?;
        info!(namespace, selector, pods = pods.len(), "discovered pods");

        output::prepare(root).await?;

        let tasks: Vec<LogTask> = pods.into_iter().map(|pod| LogTask::new(pod, root)).collect();
        let dispatched = tasks.len();
        let pods = self.scheduler.run(tasks).await;

        let report = CollectionReport {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            root: root.to_path_buf(),
            dispatched,
            pods,
            started_at,
            finished_at: Utc::now(),
        };
        report::log_report(&report);

        Ok(report)
    }
}
