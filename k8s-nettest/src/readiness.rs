use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use k8s_nettest_ext::PodExt as _;
use k8s_nettest_kubeapi::ClusterApi;

use crate::config::NettestConfig;
use crate::error::NettestError;
use crate::provision::WorkloadPod;

/// Poll each pod in turn until running and fully ready, recording its
/// assigned IP. One shared deadline covers all pods; a single pod that never
/// becomes ready fails the whole run. Deliberately sequential: one pod's
/// readiness is attributable, and control-plane load stays bounded.
pub(crate) async fn wait_for_pods_ready<A: ClusterApi>(
    api: &A,
    config: &NettestConfig,
    pods: &mut [WorkloadPod],
    token: &CancellationToken,
) -> Result<(), NettestError> {
    let deadline = Instant::now() + config.readiness_timeout;
    for pod in &mut *pods {
        loop {
            if token.is_cancelled() {
                return Err(NettestError::Cancelled);
            }
            if Instant::now() >= deadline {
                return Err(NettestError::ReadinessTimeout {
                    pod: pod.name.clone(),
                    timeout: config.readiness_timeout,
                });
            }
            // Lookup errors are tolerated; the deadline bounds retries.
            match api.get_pod(&config.namespace, &pod.name).await {
                Ok(fetched) if fetched.is_ready() => {
                    pod.pod_ip = fetched.pod_ip().unwrap_or_default().to_string();
                    tracing::debug!(pod = pod.name, ip = pod.pod_ip, "pod ready");
                    break;
                }
                Ok(_) | Err(_) => {}
            }
            tokio::select! {
                () = token.cancelled() => return Err(NettestError::Cancelled),
                () = tokio::time::sleep(config.readiness_poll_interval) => {}
            }
        }
    }
    Ok(())
}
