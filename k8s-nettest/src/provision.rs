use k8s_nettest_ext as k8s;
use k8s_nettest_kubeapi::{is_already_exists, is_not_found, ClusterApi};

use k8s::corev1;
use k8s::default;
use k8s::metav1;
use k8s::ObjectMetaExt as _;

use crate::cleanup;
use crate::config::{NettestConfig, APP_NAME, COMPONENT, POD_PREFIX};
use crate::error::NettestError;
use crate::topology::ClusterNode;

const MAX_SANITIZED_LEN: usize = 50;

/// One diagnostic pod, pinned to one ready node. `pod_ip` stays empty until
/// the readiness synchronizer records it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadPod {
    pub name: String,
    pub node_name: String,
    pub pod_ip: String,
}

/// Best-effort removal of a namespace left over from a previous aborted run
/// with the same name, waiting for full deletion so stale pods cannot leak
/// into this run's target set. Errors are logged and swallowed.
pub(crate) async fn pre_clean_namespace<A: ClusterApi>(api: &A, config: &NettestConfig) {
    match api.get_namespace(&config.namespace).await {
        Ok(None) => return,
        Ok(Some(_)) => {}
        Err(err) => {
            tracing::warn!(namespace = config.namespace, ?err, "pre-cleanup lookup failed");
            return;
        }
    }
    tracing::info!(
        namespace = config.namespace,
        "removing leftover namespace from a previous run"
    );
    match api.delete_namespace(&config.namespace).await {
        Ok(()) => {}
        Err(err) if is_not_found(&err) => return,
        Err(err) => {
            tracing::warn!(namespace = config.namespace, ?err, "pre-cleanup delete failed");
            return;
        }
    }
    if tokio::time::timeout(
        config.cleanup_timeout,
        cleanup::wait_namespace_absent(api, config),
    )
    .await
    .is_err()
    {
        tracing::warn!(
            namespace = config.namespace,
            "timed out waiting for leftover namespace deletion"
        );
    }
}

/// Create the diagnostic namespace; "already exists" is success.
pub(crate) async fn ensure_namespace<A: ClusterApi>(
    api: &A,
    config: &NettestConfig,
) -> Result<(), NettestError> {
    let namespace = corev1::Namespace {
        metadata: metav1::ObjectMeta::new(&config.namespace).labeled(workload_labels()),
        ..default()
    };
    match api.create_namespace(&namespace).await {
        Ok(()) => Ok(()),
        Err(err) if is_already_exists(&err) => Ok(()),
        Err(source) => Err(NettestError::Setup { source }),
    }
}

/// Create one workload pod per ready node, sequentially. "Already exists" is
/// reuse; any other creation error aborts the run.
pub(crate) async fn create_workload_pods<A: ClusterApi>(
    api: &A,
    config: &NettestConfig,
    nodes: &[ClusterNode],
) -> Result<Vec<WorkloadPod>, NettestError> {
    let mut pods = Vec::with_capacity(nodes.len());
    for node in nodes {
        let name = pod_name_for_node(&node.name);
        tracing::debug!(node = node.name, pod = name, "creating workload pod");
        let pod = workload_pod_spec(config, &name, &node.name);
        match api.create_pod(&config.namespace, &pod).await {
            Ok(()) => {}
            Err(err) if is_already_exists(&err) => {
                tracing::debug!(pod = name, "pod already exists, reusing");
            }
            Err(source) => return Err(NettestError::Setup { source }),
        }
        pods.push(WorkloadPod {
            name,
            node_name: node.name.clone(),
            pod_ip: String::new(),
        });
    }
    Ok(pods)
}

/// Deterministic pod name derived from the node name.
pub(crate) fn pod_name_for_node(node_name: &str) -> String {
    format!("{POD_PREFIX}{}", sanitize_node_name(node_name))
}

/// Lowercase, `[a-z0-9-]` only, bounded length. Guarantees a valid pod name
/// and a unique derivation per node.
fn sanitize_node_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '-',
        })
        .collect();
    sanitized.truncate(MAX_SANITIZED_LEN);
    sanitized
}

fn workload_pod_spec(config: &NettestConfig, name: &str, node_name: &str) -> corev1::Pod {
    let mut labels: Vec<(String, String)> = workload_labels();
    labels.push((format!("{APP_NAME}/node"), node_name.to_string()));
    corev1::Pod {
        metadata: metav1::ObjectMeta::with_namespace(name, &config.namespace).labeled(labels),
        spec: Some(corev1::PodSpec {
            // Pinned to the node; tolerates all taints so cordoned or tainted
            // nodes are still tested.
            node_name: Some(node_name.to_string()),
            restart_policy: Some("Never".to_string()),
            containers: vec![corev1::Container {
                name: "nettest".to_string(),
                image: Some(config.image.clone()),
                command: Some(vec!["sleep".to_string(), "3600".to_string()]),
                ..default()
            }],
            tolerations: Some(vec![corev1::Toleration {
                operator: Some("Exists".to_string()),
                ..default()
            }]),
            ..default()
        }),
        ..default()
    }
}

fn workload_labels() -> Vec<(String, String)> {
    vec![
        ("app.kubernetes.io/name".to_string(), APP_NAME.to_string()),
        (
            "app.kubernetes.io/component".to_string(),
            COMPONENT.to_string(),
        ),
    ]
}
