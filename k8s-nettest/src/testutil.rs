//! In-memory `ClusterApi` fake backing the orchestrator tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use kube::core::response::StatusSummary;
use kube::core::Status;

use k8s_nettest_ext as k8s;
use k8s_nettest_kubeapi::{ClusterApi, ExecOutput};

use k8s::corev1;
use k8s::default;
use k8s::metav1;

#[derive(Clone, Debug)]
pub(crate) struct ExecCall {
    pub(crate) pod: String,
    pub(crate) command: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<corev1::Node>,
    namespaces: HashSet<String>,
    pods: BTreeMap<String, FakePod>,
    endpoints: BTreeMap<String, Vec<String>>,
    system_pods: Vec<corev1::Pod>,
    execs: Vec<ExecCall>,
    never_ready: HashSet<String>,
    fail_pod_create: HashSet<String>,
    fail_exec_containing: Vec<String>,
    pod_creates: Vec<String>,
    next_pod_ip: u8,
}

#[derive(Debug)]
struct FakePod {
    node: String,
    ip: String,
}

#[derive(Debug, Default)]
pub(crate) struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&self, name: &str, ready: bool, internal_ip: Option<&str>) {
        let node = corev1::Node {
            metadata: metav1::ObjectMeta {
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
        };
        self.state.lock().unwrap().nodes.push(node);
    }

    pub(crate) fn set_endpoints(&self, service: &str, ips: &[&str]) {
        self.state.lock().unwrap().endpoints.insert(
            service.to_string(),
            ips.iter().map(|ip| ip.to_string()).collect(),
        );
    }

    pub(crate) fn add_system_pod(&self, name: &str, running: bool, ip: Option<&str>) {
        let pod = corev1::Pod {
            metadata: metav1::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("kube-system".to_string()),
                ..default()
            },
            status: Some(corev1::PodStatus {
                phase: Some(if running { "Running" } else { "Pending" }.to_string()),
                pod_ip: ip.map(str::to_string),
                ..default()
            }),
            ..default()
        };
        self.state.lock().unwrap().system_pods.push(pod);
    }

    pub(crate) fn mark_never_ready(&self, pod_name: &str) {
        self.state
            .lock()
            .unwrap()
            .never_ready
            .insert(pod_name.to_string());
    }

    pub(crate) fn fail_pod_create(&self, pod_name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_pod_create
            .insert(pod_name.to_string());
    }

    /// Any exec whose joined argv contains `pattern` reports failure.
    pub(crate) fn fail_exec_containing(&self, pattern: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_exec_containing
            .push(pattern.to_string());
    }

    /// Plant a leftover namespace with a stale pod, as an aborted previous
    /// run would leave behind.
    pub(crate) fn seed_stale_namespace(&self, namespace: &str, pod_name: &str) {
        let mut state = self.state.lock().unwrap();
        state.namespaces.insert(namespace.to_string());
        state.pods.insert(
            pod_key(namespace, pod_name),
            FakePod {
                node: "node-stale".to_string(),
                ip: "10.42.0.250".to_string(),
            },
        );
    }

    pub(crate) fn namespace_exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().namespaces.contains(name)
    }

    pub(crate) fn pod_names(&self, namespace: &str) -> Vec<String> {
        let prefix = format!("{namespace}/");
        self.state
            .lock()
            .unwrap()
            .pods
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub(crate) fn pod_create_attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().pod_creates.clone()
    }

    pub(crate) fn exec_calls(&self) -> Vec<ExecCall> {
        self.state.lock().unwrap().execs.clone()
    }
}

fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(Box::new(Status {
        status: Some(StatusSummary::Failure),
        message: format!("{reason} (fake)"),
        reason: reason.to_string(),
        code,
        metadata: None,
        details: None,
    }))
}

fn pod_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_nodes(&self) -> kube::Result<Vec<corev1::Node>> {
        Ok(self.state.lock().unwrap().nodes.clone())
    }

    async fn create_namespace(&self, namespace: &corev1::Namespace) -> kube::Result<()> {
        let name = namespace.metadata.name.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.insert(name) {
            return Err(api_error(409, "AlreadyExists"));
        }
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> kube::Result<Option<corev1::Namespace>> {
        let state = self.state.lock().unwrap();
        Ok(state.namespaces.contains(name).then(|| corev1::Namespace {
            metadata: metav1::ObjectMeta {
                name: Some(name.to_string()),
                ..default()
            },
            ..default()
        }))
    }

    async fn delete_namespace(&self, name: &str) -> kube::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.remove(name) {
            return Err(api_error(404, "NotFound"));
        }
        // Cascading delete, instantaneous in the fake.
        let prefix = format!("{name}/");
        state.pods.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn create_pod(&self, namespace: &str, pod: &corev1::Pod) -> kube::Result<()> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        let node = pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.clone())
            .unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        state.pod_creates.push(name.clone());
        if state.fail_pod_create.contains(&name) {
            return Err(api_error(500, "InternalError"));
        }
        let key = pod_key(namespace, &name);
        if state.pods.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.next_pod_ip += 1;
        let ip = format!("10.42.0.{}", state.next_pod_ip);
        state.pods.insert(key, FakePod { node, ip });
        Ok(())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> kube::Result<corev1::Pod> {
        let state = self.state.lock().unwrap();
        let Some(pod) = state.pods.get(&pod_key(namespace, name)) else {
            return Err(api_error(404, "NotFound"));
        };
        let ready = !state.never_ready.contains(name);
        Ok(corev1::Pod {
            metadata: metav1::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..default()
            },
            spec: Some(corev1::PodSpec {
                node_name: Some(pod.node.clone()),
                ..default()
            }),
            status: Some(corev1::PodStatus {
                phase: Some(if ready { "Running" } else { "Pending" }.to_string()),
                pod_ip: ready.then(|| pod.ip.clone()),
                container_statuses: Some(vec![corev1::ContainerStatus {
                    ready,
                    ..default()
                }]),
                ..default()
            }),
            ..default()
        })
    }

    async fn get_endpoints(
        &self,
        _namespace: &str,
        name: &str,
    ) -> kube::Result<Option<corev1::Endpoints>> {
        let state = self.state.lock().unwrap();
        Ok(state.endpoints.get(name).map(|ips| corev1::Endpoints {
            subsets: Some(vec![corev1::EndpointSubset {
                addresses: Some(
                    ips.iter()
                        .map(|ip| corev1::EndpointAddress {
                            ip: ip.clone(),
                            ..default()
                        })
                        .collect(),
                ),
                ..default()
            }]),
            ..default()
        }))
    }

    async fn list_system_pods(&self) -> kube::Result<Vec<corev1::Pod>> {
        Ok(self.state.lock().unwrap().system_pods.clone())
    }

    async fn exec(
        &self,
        _namespace: &str,
        pod: &str,
        command: &[String],
    ) -> kube::Result<ExecOutput> {
        let mut state = self.state.lock().unwrap();
        state.execs.push(ExecCall {
            pod: pod.to_string(),
            command: command.to_vec(),
        });
        let joined = command.join(" ");
        let success = !state
            .fail_exec_containing
            .iter()
            .any(|pattern| joined.contains(pattern));
        Ok(ExecOutput {
            // Listener bootstraps self-identify by their acknowledgment
            // loop, not by whatever nc flags they happen to pass.
            stdout: if joined.contains("echo LISTENING") {
                "LISTENING\n".to_string()
            } else {
                String::new()
            },
            stderr: if success {
                String::new()
            } else {
                "nc: connection refused".to_string()
            },
            success,
        })
    }
}
