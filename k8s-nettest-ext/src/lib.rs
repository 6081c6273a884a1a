pub use k8s_openapi as openapi;
pub use k8s_openapi::api::core::v1 as corev1;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;

pub trait NodeExt {
    /// A node qualifies only if its Ready condition is explicitly `True`.
    /// Nodes with no Ready condition reported do not qualify.
    fn is_ready(&self) -> bool;

    /// First address of type `InternalIP`, if the node reports one.
    fn internal_ip(&self) -> Option<&str>;
}

impl NodeExt for corev1::Node {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .is_some_and(|conditions| {
                conditions
                    .iter()
                    .any(|cond| cond.type_ == "Ready" && cond.status == "True")
            })
    }

    fn internal_ip(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.addresses.as_ref())
            .and_then(|addresses| {
                addresses
                    .iter()
                    .find(|addr| addr.type_ == "InternalIP")
                    .map(|addr| addr.address.as_str())
            })
    }
}

pub trait PodExt {
    /// Running phase and every container status ready.
    fn is_ready(&self) -> bool;

    fn is_running(&self) -> bool;

    fn pod_ip(&self) -> Option<&str>;
}

impl PodExt for corev1::Pod {
    fn is_ready(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status
            .as_ref()
            .and_then(|status| status.container_statuses.as_ref())
            .is_none_or(|statuses| statuses.iter().all(|cs| cs.ready))
    }

    fn is_running(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            .is_some_and(|phase| phase == "Running")
    }

    fn pod_ip(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.pod_ip.as_deref())
            .filter(|ip| !ip.is_empty())
    }
}

pub trait ObjectMetaExt {
    fn new(name: impl ToString) -> Self;
    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self;
    fn labeled(self, labels: impl IntoIterator<Item = (String, String)>) -> Self;
}

impl ObjectMetaExt for metav1::ObjectMeta {
    fn new(name: impl ToString) -> Self {
        let name = Some(name.to_string());
        Self { name, ..default() }
    }

    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Self::new(name)
        }
    }

    fn labeled(self, labels: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            labels: Some(labels.into_iter().collect()),
            ..self
        }
    }
}

pub fn default<T: Default>() -> T {
    T::default()
}
