use k8s_nettest_ext as k8s;
use k8s_nettest_kubeapi::{ClusterApi, SYSTEM_NAMESPACE};

use k8s::corev1;
use k8s::NodeExt as _;
use k8s::PodExt as _;

use crate::error::DiscoveryError;

/// Known cluster-DNS service names, tried in priority order against the
/// system namespace's Endpoints objects.
const DNS_SERVICE_NAMES: [&str; 3] = ["kube-dns", "coredns", "rke2-coredns-rke2-coredns"];

/// A ready cluster node, sourced fresh each run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterNode {
    pub name: String,
    pub internal_ip: Option<String>,
}

/// Nodes whose Ready condition is explicitly `True`. Everything else is
/// excluded from the entire run, not merely from some probes.
pub(crate) fn ready_nodes(nodes: &[corev1::Node]) -> Vec<ClusterNode> {
    nodes
        .iter()
        .filter(|node| node.is_ready())
        .map(|node| ClusterNode {
            name: node.metadata.name.clone().unwrap_or_default(),
            internal_ip: node.internal_ip().map(str::to_string),
        })
        .collect()
}

/// Kubelet probe targets: (node name, internal IP). Nodes without an
/// internal IP are silently excluded.
pub(crate) fn node_internal_ips(nodes: &[ClusterNode]) -> Vec<(String, String)> {
    nodes
        .iter()
        .filter_map(|node| {
            node.internal_ip
                .as_ref()
                .map(|ip| (node.name.clone(), ip.clone()))
        })
        .collect()
}

/// Discover cluster-DNS endpoint addresses.
///
/// First strategy: the known service names in priority order; the first
/// Endpoints object with at least one address wins. Fallback: running system
/// pods with a DNS-component name and an assigned pod IP. Errors only when
/// both strategies find zero addresses.
pub(crate) async fn discover_dns_endpoints<A: ClusterApi>(
    api: &A,
) -> Result<Vec<String>, DiscoveryError> {
    for name in DNS_SERVICE_NAMES {
        let endpoints = match api.get_endpoints(SYSTEM_NAMESPACE, name).await {
            Ok(Some(endpoints)) => endpoints,
            Ok(None) | Err(_) => continue,
        };
        let ips = endpoint_addresses(&endpoints);
        if !ips.is_empty() {
            tracing::debug!(service = name, count = ips.len(), "found cluster DNS endpoints");
            return Ok(ips);
        }
    }

    let pods = api.list_system_pods().await?;
    let ips: Vec<String> = pods
        .iter()
        .filter(|pod| {
            pod.metadata
                .name
                .as_deref()
                .is_some_and(has_dns_component)
                && pod.is_running()
        })
        .filter_map(|pod| pod.pod_ip().map(str::to_string))
        .collect();

    if ips.is_empty() {
        return Err(DiscoveryError::NoEndpoints);
    }
    tracing::debug!(count = ips.len(), "found cluster DNS pods by name pattern");
    Ok(ips)
}

fn endpoint_addresses(endpoints: &corev1::Endpoints) -> Vec<String> {
    endpoints
        .subsets
        .iter()
        .flatten()
        .filter_map(|subset| subset.addresses.as_ref())
        .flatten()
        .map(|addr| addr.ip.clone())
        .collect()
}

fn has_dns_component(name: &str) -> bool {
    name.contains("coredns") || name.contains("kube-dns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s::default;

    fn node(name: &str, ready: bool, internal_ip: Option<&str>) -> corev1::Node {
        corev1::Node {
            metadata: k8s::metav1::ObjectMeta {
                name: Some(name.to_string()),
                ..default()
            },
            status: Some(corev1::NodeStatus {
                conditions: Some(vec![corev1::NodeCondition {
                    type_: "Ready".to_string(),
                    status: if ready { "True" } else { "False" }.to_string(),
                    ..default()
                }]),
                addresses: internal_ip.map(|ip| {
                    vec![corev1::NodeAddress {
                        type_: "InternalIP".to_string(),
                        address: ip.to_string(),
                    }]
                }),
                ..default()
            }),
            ..default()
        }
    }

    #[test]
    fn not_ready_nodes_are_excluded_entirely() {
        let nodes = vec![
            node("node-a", true, Some("10.0.0.1")),
            node("node-b", false, Some("10.0.0.2")),
            node("node-c", true, None),
        ];
        let ready = ready_nodes(&nodes);
        let names: Vec<_> = ready.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["node-a", "node-c"]);
    }

    #[test]
    fn nodes_without_internal_ip_are_not_kubelet_targets() {
        let ready = ready_nodes(&[
            node("node-a", true, Some("10.0.0.1")),
            node("node-c", true, None),
        ]);
        let targets = node_internal_ips(&ready);
        assert_eq!(
            targets,
            [("node-a".to_string(), "10.0.0.1".to_string())]
        );
    }

    #[test]
    fn dns_component_names() {
        assert!(has_dns_component("coredns-5d78c9869d-abcde"));
        assert!(has_dns_component("kube-dns-autoscaler-xyz"));
        assert!(!has_dns_component("etcd-control-plane"));
    }

    #[test]
    fn endpoint_addresses_flatten_all_subsets() {
        let endpoints = corev1::Endpoints {
            subsets: Some(vec![
                corev1::EndpointSubset {
                    addresses: Some(vec![
                        corev1::EndpointAddress {
                            ip: "10.42.0.10".to_string(),
                            ..default()
                        },
                        corev1::EndpointAddress {
                            ip: "10.42.0.11".to_string(),
                            ..default()
                        },
                    ]),
                    ..default()
                },
                corev1::EndpointSubset {
                    addresses: None,
                    ..default()
                },
            ]),
            ..default()
        };
        assert_eq!(endpoint_addresses(&endpoints), ["10.42.0.10", "10.42.0.11"]);
    }
}
