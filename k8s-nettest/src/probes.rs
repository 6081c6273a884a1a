use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use k8s_nettest_kubeapi::{ClusterApi, ExecOutput};
use k8s_nettest_report::{ProbeKind, ProbeResult};

use crate::config::{NettestConfig, DNS_PORT, EXTERNAL_TCP_PORT, KUBELET_PORT};
use crate::provision::WorkloadPod;

/// Run the full probe matrix: one concurrent task per source pod, bounded
/// only by the ready-node count. Each task sends its completed batch over a
/// channel; this collector owns the result vector exclusively, so no lock
/// guards the results.
pub(crate) async fn run_all<A: ClusterApi + 'static>(
    api: &Arc<A>,
    config: &NettestConfig,
    pods: &[WorkloadPod],
    dns_ips: &[String],
    node_ips: &[(String, String)],
    token: &CancellationToken,
) -> Vec<ProbeResult> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut tasks = JoinSet::new();

    for pod in pods {
        let api = Arc::clone(api);
        let config = config.clone();
        let pod = pod.clone();
        let dns_ips = dns_ips.to_vec();
        let node_ips = node_ips.to_vec();
        let peers = pods.to_vec();
        let token = token.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            tracing::debug!(node = pod.node_name, "running probes");
            let batch = run_pod_probes(&*api, &config, &pod, &dns_ips, &node_ips, &peers, &token)
                .await;
            let _ = tx.send(batch);
        });
    }
    drop(tx);

    let mut results = Vec::new();
    while let Some(batch) = rx.recv().await {
        results.extend(batch);
    }
    while tasks.join_next().await.is_some() {}
    results
}

/// The fixed suite from one source pod, strictly in order: cluster DNS,
/// external DNS, external TCP, kubelet, pod-to-pod. A failed connection is
/// data, never an error; cancellation returns whatever completed so far.
async fn run_pod_probes<A: ClusterApi>(
    api: &A,
    config: &NettestConfig,
    pod: &WorkloadPod,
    dns_ips: &[String],
    node_ips: &[(String, String)],
    peers: &[WorkloadPod],
    token: &CancellationToken,
) -> Vec<ProbeResult> {
    let mut results = Vec::new();

    for ip in dns_ips {
        let probe = Probe {
            kind: ProbeKind::Coredns,
            target: format!("{ip}:{DNS_PORT}"),
            command: connect_command(ip, DNS_PORT, config.connect_timeout_secs),
        };
        let Some(result) = attempt(api, config, pod, probe, token).await else {
            return results;
        };
        results.push(result);
    }

    let probe = Probe {
        kind: ProbeKind::Dns,
        target: config.external_host.clone(),
        command: vec!["nslookup".to_string(), config.external_host.clone()],
    };
    let Some(result) = attempt(api, config, pod, probe, token).await else {
        return results;
    };
    results.push(result);

    let probe = Probe {
        kind: ProbeKind::ExternalTcp,
        target: format!("{}:{EXTERNAL_TCP_PORT}", config.external_host),
        command: connect_command(
            &config.external_host,
            EXTERNAL_TCP_PORT,
            config.external_connect_timeout_secs,
        ),
    };
    let Some(result) = attempt(api, config, pod, probe, token).await else {
        return results;
    };
    results.push(result);

    // Self-exclusion: never probe the kubelet on the source pod's own node.
    for (node_name, node_ip) in node_ips {
        if *node_name == pod.node_name {
            continue;
        }
        let probe = Probe {
            kind: ProbeKind::Kubelet,
            target: format!("{node_ip}:{KUBELET_PORT} ({node_name})"),
            command: connect_command(node_ip, KUBELET_PORT, config.connect_timeout_secs),
        };
        let Some(result) = attempt(api, config, pod, probe, token).await else {
            return results;
        };
        results.push(result);
    }

    // Self-exclusion: never probe the source pod's own listener.
    for peer in peers {
        if peer.name == pod.name {
            continue;
        }
        let probe = Probe {
            kind: ProbeKind::PodToPod,
            target: format!(
                "{}:{} ({})",
                peer.pod_ip, config.listen_port, peer.node_name
            ),
            command: connect_command(&peer.pod_ip, config.listen_port, config.connect_timeout_secs),
        };
        let Some(result) = attempt(api, config, pod, probe, token).await else {
            return results;
        };
        results.push(result);
    }

    results
}

struct Probe {
    kind: ProbeKind,
    target: String,
    command: Vec<String>,
}

/// One bounded-timeout connection attempt from inside `pod`. Returns `None`
/// only on cancellation; failures come back as failed results.
async fn attempt<A: ClusterApi>(
    api: &A,
    config: &NettestConfig,
    pod: &WorkloadPod,
    probe: Probe,
    token: &CancellationToken,
) -> Option<ProbeResult> {
    let outcome = tokio::select! {
        () = token.cancelled() => return None,
        outcome = api.exec(&config.namespace, &pod.name, &probe.command) => outcome,
    };
    let (success, error) = match outcome {
        Ok(output) if output.success => (true, None),
        Ok(output) => (false, Some(failure_text(&output))),
        Err(err) => (false, Some(err.to_string())),
    };
    tracing::debug!(
        node = pod.node_name,
        kind = %probe.kind,
        target = probe.target,
        success,
        "probe finished"
    );
    Some(ProbeResult {
        source_node: pod.node_name.clone(),
        source_pod: pod.name.clone(),
        kind: probe.kind,
        target: probe.target,
        success,
        error,
    })
}

/// The invoked command enforces the connection timeout, not the transport.
fn connect_command(host: &str, port: u16, timeout_secs: u32) -> Vec<String> {
    vec![
        "nc".to_string(),
        "-z".to_string(),
        "-w".to_string(),
        timeout_secs.to_string(),
        host.to_string(),
        port.to_string(),
    ]
}

fn failure_text(output: &ExecOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        "connection attempt failed".to_string()
    } else {
        stderr.to_string()
    }
}
