//! Cluster network connectivity test orchestrator.
//!
//! Provisions one diagnostic pod per ready node, waits for all of them to
//! become ready, runs a concurrent matrix of reachability probes (cluster
//! DNS, external DNS, external TCP egress, kubelet ports, pod-to-pod), and
//! tears down everything it created on every exit path.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use k8s_nettest_kubeapi::ClusterApi;
use k8s_nettest_report::Report;

mod cleanup;
mod config;
mod error;
mod listener;
mod probes;
mod provision;
mod readiness;
mod topology;

pub use config::{NettestConfig, APP_NAME, COMPONENT, NAMESPACE_PREFIX, POD_PREFIX};
pub use error::{DiscoveryError, NettestError};
pub use provision::WorkloadPod;
pub use topology::ClusterNode;

#[derive(Debug)]
pub struct NetworkTest<A> {
    api: Arc<A>,
    config: NettestConfig,
}

impl<A: ClusterApi + 'static> NetworkTest<A> {
    pub fn new(api: A) -> Self {
        Self::with_config(api, NettestConfig::default())
    }

    pub fn with_config(api: A, config: NettestConfig) -> Self {
        Self {
            api: Arc::new(api),
            config,
        }
    }

    pub fn config(&self) -> &NettestConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run the full suite and produce a report.
    ///
    /// The token cancels in-flight polling and remote-exec calls. Teardown is
    /// unconditional: whatever the inner pipeline returns, and whether or not
    /// the token fired, the diagnostic namespace is reclaimed under its own
    /// deadline before this returns.
    pub async fn run(&self, token: &CancellationToken) -> Result<Report, NettestError> {
        let result = self.run_inner(token).await;
        cleanup::reclaim(&*self.api, &self.config).await;
        result
    }

    async fn run_inner(&self, token: &CancellationToken) -> Result<Report, NettestError> {
        let api = &*self.api;
        let config = &self.config;

        provision::pre_clean_namespace(api, config).await;
        provision::ensure_namespace(api, config).await?;

        tracing::info!("listing nodes");
        let nodes = api.list_nodes().await?;
        let ready = topology::ready_nodes(&nodes);
        if ready.is_empty() {
            return Err(NettestError::NoReadyNodes);
        }
        tracing::info!(count = ready.len(), "found ready nodes");

        let mut pods = provision::create_workload_pods(api, config, &ready).await?;
        readiness::wait_for_pods_ready(api, config, &mut pods, token).await?;

        let (dns_ips, dns_warning) = match topology::discover_dns_endpoints(api).await {
            Ok(ips) => (ips, None),
            Err(err) => {
                tracing::warn!(%err, "cluster DNS discovery failed, skipping coredns probes");
                (Vec::new(), Some(err.to_string()))
            }
        };
        let node_ips = topology::node_internal_ips(&ready);

        listener::start_listeners(api, config, &pods).await;

        tracing::info!("running probe matrix");
        let results = probes::run_all(&self.api, config, &pods, &dns_ips, &node_ips, token).await;
        if token.is_cancelled() {
            return Err(NettestError::Cancelled);
        }

        let mut report = Report::new(ready.len(), pods.len(), results);
        if let Some(warning) = dns_warning {
            report.warnings.push(warning);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod testutil;
