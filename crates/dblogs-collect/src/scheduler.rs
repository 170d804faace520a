//! Bounded fan-out of pod log workers
//!
//! Every pod gets exactly one worker task. Workers pass through a counting
//! semaphore (one permit per pod unless capped) and the dispatcher waits on
//! the join set until every worker is accounted for. Within a worker the
//! pod's containers are streamed one after another.

use std::any::Any;
use std::collections::HashSet;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::copier::StreamCopier;
use crate::output;
use dblogs_types::{LogTask, PodReport, StreamError, StreamResult};

/// Drives one worker per pod
pub struct Scheduler {
    copier: Arc<StreamCopier>,

    /// Extra cap on concurrently running workers
    max_concurrency: Option<usize>,
}

impl Scheduler {
    pub fn new(copier: Arc<StreamCopier>) -> Self {
        Self {
            copier,
            max_concurrency: None,
        }
    }

    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Number of permits for `pods` workers
    fn permits(&self, pods: usize) -> usize {
        match self.max_concurrency {
            Some(max) => max.clamp(1, pods.max(1)),
            None => pods.max(1),
        }
    }

    /// Run every task and return one report per task, in completion order.
    pub async fn run(&self, tasks: Vec<LogTask>) -> Vec<PodReport> {
        let dispatched = tasks.len();
        let semaphore = Arc::new(Semaphore::new(self.permits(dispatched)));
        let mut pending: HashSet<String> = HashSet::with_capacity(dispatched);
        let mut workers = JoinSet::new();

        for task in tasks {
            pending.insert(task.pod.name.clone());
            let copier = Arc::clone(&self.copier);
            let semaphore = Arc::clone(&semaphore);

            workers.spawn(async move {
                let pod = task.pod.name.clone();
                let work = async {
                    let _permit = semaphore.acquire().await;
                    run_pod(&copier, &task).await
                };

                match AssertUnwindSafe(work).catch_unwind().await {
                    Ok(report) => report,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!(pod = %pod, panic = %message, "log worker panicked");
                        PodReport::panicked(pod, message)
                    }
                }
            });
        }
        debug!(workers = dispatched, "dispatched log workers");

        let mut reports = Vec::with_capacity(dispatched);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(report) => {
                    pending.remove(&report.pod);
                    reports.push(report);
                }
                Err(e) => error!(error = %e, "log worker task failed"),
            }
        }

        account_lost(pending, &mut reports);
        reports
    }
}

/// Workers whose task was lost still count as dispatched pods
fn account_lost(pending: HashSet<String>, reports: &mut Vec<PodReport>) {
    for pod in pending {
        reports.push(PodReport::panicked(pod, "worker task did not complete"));
    }
}

/// Stream every container of one pod, in enumeration order
async fn run_pod(copier: &StreamCopier, task: &LogTask) -> PodReport {
    let pod = task.pod.name.as_str();
    let streams = task.streams();

    if task.pod_dir().is_some() {
        if let Err(e) = output::ensure_pod_subdir(&task.destination_root, pod).await {
            error!(pod, error = %e, "could not make pod directory");
            let results = streams
                .iter()
                .map(|target| {
                    let cause = io::Error::new(e.kind(), e.to_string());
                    StreamResult::failure(target, pod, 0, StreamError::FileCreate(cause))
                })
                .collect();
            return PodReport::new(pod, results);
        }
    }

    let mut results = Vec::with_capacity(streams.len());
    for target in &streams {
        results.push(copier.copy(pod, target).await);
    }

    PodReport::new(pod, results)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
