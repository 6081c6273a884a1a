use k8s_nettest_kubeapi::ClusterApi;

use crate::config::NettestConfig;
use crate::provision::WorkloadPod;

/// Start a background listener in every pod for the pod-to-pod probes.
///
/// The bootstrap script backgrounds a respawning `nc` listener loop, then
/// polls a local connect until it succeeds and prints `LISTENING`, so the
/// probes only start once the socket is actually bound. Best-effort: a pod
/// that never acknowledges gets a warning, not a failed run.
pub(crate) async fn start_listeners<A: ClusterApi>(
    api: &A,
    config: &NettestConfig,
    pods: &[WorkloadPod],
) {
    for pod in pods {
        let command = listener_command(config.listen_port);
        match api.exec(&config.namespace, &pod.name, &command).await {
            Ok(output) if output.stdout.contains("LISTENING") => {
                tracing::debug!(pod = pod.name, port = config.listen_port, "listener bound");
            }
            Ok(output) => {
                tracing::warn!(
                    pod = pod.name,
                    stdout = output.stdout,
                    "listener did not acknowledge binding"
                );
            }
            Err(err) => {
                tracing::warn!(pod = pod.name, ?err, "failed to start listener");
            }
        }
    }
}

fn listener_command(port: u16) -> Vec<String> {
    // busybox nc has no standalone persistent-listen flag, so a shell loop
    // respawns the listener after every accepted connection.
    let script = format!(
        "while true; do nc -l -p {port}; done >/dev/null 2>&1 & \
         for i in 1 2 3 4 5 6 7 8 9 10; do \
         if nc -z 127.0.0.1 {port}; then echo LISTENING; exit 0; fi; \
         sleep 0.2; done; echo TIMEOUT"
    );
    vec!["sh".to_string(), "-c".to_string(), script]
}
