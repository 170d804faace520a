//! Workload name -> namespace resolution

use tracing::{debug, warn};

use crate::error::ResolveError;
use dblogs_k8s::WorkloadSource;
use dblogs_types::WorkloadInfo;

/// Interactive fallback used when no usable name was supplied
pub trait WorkloadChooser {
    /// Pick one of `workloads`, returning its index
    fn choose(&self, workloads: &[WorkloadInfo]) -> anyhow::Result<usize>;
}

/// Known workloads, fetched once per run
#[derive(Clone, Debug, Default)]
pub struct WorkloadCatalog {
    entries: Vec<WorkloadInfo>,
}

impl WorkloadCatalog {
    pub fn new(entries: Vec<WorkloadInfo>) -> Self {
        let mut catalog = Self::default();
        catalog.extend(entries);
        catalog
    }

    /// Build the catalog from static entries plus whatever `source` reports.
    /// Static entries win when both name the same workload.
    pub async fn load(
        static_entries: Vec<WorkloadInfo>,
        source: Option<&dyn WorkloadSource>,
    ) -> Result<Self, ResolveError> {
        let mut catalog = Self::new(static_entries);
        if let Some(source) = source {
            let discovered = source.workloads().await.map_err(ResolveError::Catalog)?;
            debug!(count = discovered.len(), "discovered workloads");
            catalog.extend(discovered);
        }
        Ok(catalog)
    }

    /// Add entries whose names are not already known
    pub fn extend(&mut self, entries: impl IntoIterator<Item = WorkloadInfo>) {
        for entry in entries {
            if self.find(&entry.name).is_none() {
                self.entries.push(entry);
            }
        }
    }

    pub fn find(&self, name: &str) -> Option<&WorkloadInfo> {
        self.entries.iter().find(|w| w.name == name)
    }

    pub fn entries(&self) -> &[WorkloadInfo] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a user supplied workload name to the namespace holding its pods.
///
/// An empty or unknown name falls back to `chooser`; without one the lookup fails.
pub fn resolve_namespace(
    name: Option<&str>,
    catalog: &WorkloadCatalog,
    chooser: Option<&dyn WorkloadChooser>,
) -> Result<String, ResolveError> {
    let name = name.map(str::trim).filter(|n| !n.is_empty());

    if let Some(name) = name {
        if let Some(workload) = catalog.find(name) {
            return Ok(workload.namespace.clone());
        }
        if chooser.is_none() {
            return Err(ResolveError::NotFound(name.to_string()));
        }
        warn!(name, "no database matched given name, prompting");
    }

    let Some(chooser) = chooser else {
        return Err(ResolveError::NoName);
    };
    if catalog.is_empty() {
        return Err(ResolveError::NoWorkloads);
    }

    let index = chooser
        .choose(catalog.entries())
        .map_err(ResolveError::Prompt)?;
    let workload = catalog.entries().get(index).ok_or_else(|| {
        ResolveError::Prompt(anyhow::anyhow!("selection {} is out of range", index + 1))
    })?;

    Ok(workload.namespace.clone())
}
