use k8s_nettest_kubeapi::{is_not_found, ClusterApi};

use crate::config::NettestConfig;

/// Tear down everything the run provisioned: delete the namespace with
/// foreground propagation and poll until it is confirmed absent.
///
/// Runs under its own bounded deadline, never the run's cancellation token,
/// so a cancelled or timed-out run still completes teardown. Errors are
/// logged and swallowed; this is cleanup, not a correctness-critical path.
pub(crate) async fn reclaim<A: ClusterApi>(api: &A, config: &NettestConfig) {
    let teardown = async {
        match api.delete_namespace(&config.namespace).await {
            Ok(()) => {}
            Err(err) if is_not_found(&err) => return,
            Err(err) => {
                tracing::warn!(namespace = config.namespace, ?err, "namespace delete failed");
                return;
            }
        }
        wait_namespace_absent(api, config).await;
        tracing::debug!(namespace = config.namespace, "namespace deleted");
    };
    if tokio::time::timeout(config.cleanup_timeout, teardown)
        .await
        .is_err()
    {
        tracing::warn!(
            namespace = config.namespace,
            "timed out waiting for namespace deletion"
        );
    }
}

/// Poll until the namespace object is gone. Unbounded; callers wrap it in a
/// timeout. Lookup errors are swallowed.
pub(crate) async fn wait_namespace_absent<A: ClusterApi>(api: &A, config: &NettestConfig) {
    loop {
        match api.get_namespace(&config.namespace).await {
            Ok(None) => return,
            Ok(Some(_)) | Err(_) => {}
        }
        tokio::time::sleep(config.cleanup_poll_interval).await;
    }
}
