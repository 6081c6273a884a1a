use std::time::Duration;

use thiserror::Error;

/// Fatal outcomes of a connectivity test run. Individual probe failures are
/// recorded as failed results, never raised through this type.
#[derive(Debug, Error)]
pub enum NettestError {
    /// Namespace or pod creation failed for a reason other than
    /// "already exists". Aborts before any probe runs.
    #[error("failed to set up diagnostic workloads: {source}")]
    Setup {
        #[source]
        source: kube::Error,
    },

    /// A provisioned pod never became ready within the bound. A single
    /// unready pod invalidates the run's target completeness.
    #[error("pod {pod} failed to become ready within {timeout:?}")]
    ReadinessTimeout { pod: String, timeout: Duration },

    #[error("no ready nodes found in cluster")]
    NoReadyNodes,

    #[error("network test cancelled")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] kube::Error),
}

/// Cluster DNS endpoint discovery failure. The orchestrator downgrades this
/// to a warning and runs with an empty cluster-DNS target set.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no cluster DNS endpoints found")]
    NoEndpoints,

    #[error(transparent)]
    Api(#[from] kube::Error),
}
