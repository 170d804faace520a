//! Error types for log collection.

use std::path::PathBuf;

use thiserror::Error;

/// The workload to collect from could not be determined.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no database matched given name: '{0}'")]
    NotFound(String),

    #[error("no database name given and no interactive prompt is available")]
    NoName,

    #[error("no databases found to choose from")]
    NoWorkloads,

    #[error("could not get list of databases: {0:#}")]
    Catalog(anyhow::Error),

    #[error("could not prompt for a database name: {0:#}")]
    Prompt(anyhow::Error),
}

/// Fatal errors: the run stops before any log is streamed.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    #[error("could not list pods in namespace '{namespace}': {cause:#}")]
    Discovery {
        namespace: String,
        cause: anyhow::Error,
    },

    #[error("could not prepare output directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
