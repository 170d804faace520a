//! Kubernetes client for dblogs

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::Api;
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use tokio_util::compat::FuturesAsyncReadCompatExt;
use tracing::debug;

use crate::source::{LogReader, LogSource, PodSource, WorkloadSource};
use dblogs_types::{ContainerRef, PodDescriptor, WorkloadInfo};

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct KubeClient {
    client: kube::Client,
    context: Option<String>,

    /// Label selector narrowing which namespaces count as workloads
    namespace_selector: Option<String>,
}

impl KubeClient {
    /// Connect using the kubeconfig, optionally overriding its current context.
    /// Falls back to the in-cluster service account when no kubeconfig exists
    /// and no context was asked for.
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let (config, context) = match Kubeconfig::read() {
            Ok(kubeconfig) => {
                let context_name = context
                    .map(str::to_string)
                    .or_else(|| kubeconfig.current_context.clone());

                let config = kube::Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: context_name.clone(),
                        ..Default::default()
                    },
                )
                .await
                .context(format!(
                    "Failed to create config for context: {}",
                    context_name.as_deref().unwrap_or("<current>")
                ))?;

                (config, context_name)
            }
            Err(e) if context.is_none() => {
                debug!(error = %e, "no usable kubeconfig, trying in-cluster config");
                let config = kube::Config::incluster()
                    .context("Failed to read kubeconfig. Is kubectl configured?")?;
                (config, None)
            }
            Err(e) => {
                return Err(e).context("Failed to read kubeconfig. Is kubectl configured?");
            }
        };

        let client = kube::Client::try_from(config).context(format!(
            "Failed to create client for context: {}",
            context.as_deref().unwrap_or("<in-cluster>")
        ))?;

        Ok(Self {
            client,
            context,
            namespace_selector: None,
        })
    }

    /// Only treat namespaces matching `selector` as workloads
    pub fn with_namespace_selector(mut self, selector: Option<String>) -> Self {
        self.namespace_selector = selector.filter(|s| !s.is_empty());
        self
    }

    /// Get the context name the client was built for
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Log access for pods of one namespace
    pub fn pod_logs(&self, namespace: &str) -> PodLogs {
        PodLogs {
            api: Api::namespaced(self.client.clone(), namespace),
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl PodSource for KubeClient {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<PodDescriptor>> {
        anyhow::ensure!(!namespace.is_empty(), "namespace must not be empty");

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(selector);
        }

        let list = pods.list(&params).await.context(format!(
            "Failed to list pods in {} with selector '{}'",
            namespace, selector
        ))?;

        debug!(namespace, selector, count = list.items.len(), "listed pods");
        Ok(list.items.iter().map(pod_descriptor).collect())
    }
}

#[async_trait]
impl WorkloadSource for KubeClient {
    async fn workloads(&self) -> Result<Vec<WorkloadInfo>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let mut params = ListParams::default();
        if let Some(selector) = &self.namespace_selector {
            params = params.labels(selector);
        }

        let list = namespaces
            .list(&params)
            .await
            .context("Failed to list namespaces")?;

        Ok(list
            .items
            .into_iter()
            .filter(|ns| {
                ns.status.as_ref().and_then(|s| s.phase.as_deref()) != Some("Terminating")
            })
            .filter_map(|ns| ns.metadata.name)
            .map(|name| WorkloadInfo::new(name.clone(), name))
            .collect())
    }
}

/// Pod log access bound to a namespace
#[derive(Clone)]
pub struct PodLogs {
    api: Api<Pod>,
    namespace: String,
}

#[async_trait]
impl LogSource for PodLogs {
    async fn open_log(&self, pod: &str, container: &ContainerRef) -> Result<LogReader> {
        let stream = self
            .api
            .log_stream(pod, &log_params(container))
            .await
            .context(format!(
                "Failed to get log for {}/{} in namespace {}",
                pod, container.name, self.namespace
            ))?;

        Ok(Box::pin(stream.compat()))
    }
}

/// One-shot (non-following) log request for a container
pub fn log_params(container: &ContainerRef) -> LogParams {
    LogParams {
        follow: false,
        container: (!container.is_default()).then(|| container.name.clone()),
        ..Default::default()
    }
}

/// Convert a k8s Pod to a PodDescriptor, keeping declaration order
pub fn pod_descriptor(pod: &Pod) -> PodDescriptor {
    let name = pod.metadata.name.clone().unwrap_or_default();
    let descriptor = PodDescriptor::new(name);

    let Some(spec) = &pod.spec else {
        return descriptor;
    };

    descriptor
        .with_containers(spec.containers.iter().map(|c| c.name.clone()))
        .with_init_containers(
            spec.init_containers
                .iter()
                .flatten()
                .map(|c| c.name.clone()),
        )
}
