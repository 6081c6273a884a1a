use std::fmt::Debug;

use async_trait::async_trait;
use k8s_nettest_ext as k8s;
use kube::api;
use tokio::io::AsyncReadExt as _;

use k8s::corev1;

/// Captured output of a command executed inside a pod.
///
/// `success` reflects the remote command's exit status as reported on the
/// Kubernetes exec status channel. Connection timeouts are enforced by the
/// invoked command itself, never by this transport.
#[derive(Clone, Debug, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// The control-plane operations the diagnostic core needs.
///
/// `KubeApi` implements this against a live cluster; tests implement it
/// against an in-memory fake.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_nodes(&self) -> kube::Result<Vec<corev1::Node>>;

    /// Create a namespace. "Already exists" is surfaced as the underlying
    /// API error so callers can treat it as success.
    async fn create_namespace(&self, namespace: &corev1::Namespace) -> kube::Result<()>;

    async fn get_namespace(&self, name: &str) -> kube::Result<Option<corev1::Namespace>>;

    /// Delete a namespace with foreground (cascading) propagation.
    async fn delete_namespace(&self, name: &str) -> kube::Result<()>;

    async fn create_pod(&self, namespace: &str, pod: &corev1::Pod) -> kube::Result<()>;

    async fn get_pod(&self, namespace: &str, name: &str) -> kube::Result<corev1::Pod>;

    async fn get_endpoints(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<Option<corev1::Endpoints>>;

    /// List pods in the system namespace (`kube-system`).
    async fn list_system_pods(&self) -> kube::Result<Vec<corev1::Pod>>;

    /// Run `command` inside `pod` and capture its output and exit status.
    async fn exec(&self, namespace: &str, pod: &str, command: &[String])
        -> kube::Result<ExecOutput>;
}

/// True when `err` is a 409 Conflict / AlreadyExists API response.
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409)
}

/// True when `err` is a 404 NotFound API response.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

pub const SYSTEM_NAMESPACE: &str = "kube-system";

pub struct KubeApi {
    post_params: api::PostParams,
    list_params: api::ListParams,
    client: kube::Client,
}

impl KubeApi {
    /// Create a KubeApi configured with a default Kubernetes client.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn run() -> Result<(), kube::Error> {
    /// let api = k8s_nettest_kubeapi::KubeApi::new().await?;
    /// // use `api`...
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new() -> kube::Result<Self> {
        kube::Client::try_default().await.map(Self::with_client)
    }

    pub fn with_client(client: kube::Client) -> Self {
        Self {
            post_params: api::PostParams::default(),
            list_params: api::ListParams::default(),
            client,
        }
    }

    fn nodes(&self) -> api::Api<corev1::Node> {
        api::Api::all(self.client.clone())
    }

    fn namespaces(&self) -> api::Api<corev1::Namespace> {
        api::Api::all(self.client.clone())
    }

    fn pods(&self, namespace: &str) -> api::Api<corev1::Pod> {
        api::Api::namespaced(self.client.clone(), namespace)
    }

    fn endpoints(&self, namespace: &str) -> api::Api<corev1::Endpoints> {
        api::Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterApi for KubeApi {
    async fn list_nodes(&self) -> kube::Result<Vec<corev1::Node>> {
        self.nodes()
            .list(&self.list_params)
            .await
            .map(|list| list.items)
    }

    async fn create_namespace(&self, namespace: &corev1::Namespace) -> kube::Result<()> {
        self.namespaces()
            .create(&self.post_params, namespace)
            .await
            .map(|_| ())
    }

    async fn get_namespace(&self, name: &str) -> kube::Result<Option<corev1::Namespace>> {
        self.namespaces().get_opt(name).await
    }

    async fn delete_namespace(&self, name: &str) -> kube::Result<()> {
        let dp = api::DeleteParams::foreground();
        self.namespaces().delete(name, &dp).await.map(|_| ())
    }

    async fn create_pod(&self, namespace: &str, pod: &corev1::Pod) -> kube::Result<()> {
        self.pods(namespace)
            .create(&self.post_params, pod)
            .await
            .map(|_| ())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> kube::Result<corev1::Pod> {
        self.pods(namespace).get(name).await
    }

    async fn get_endpoints(
        &self,
        namespace: &str,
        name: &str,
    ) -> kube::Result<Option<corev1::Endpoints>> {
        self.endpoints(namespace).get_opt(name).await
    }

    async fn list_system_pods(&self) -> kube::Result<Vec<corev1::Pod>> {
        self.pods(SYSTEM_NAMESPACE)
            .list(&self.list_params)
            .await
            .map(|list| list.items)
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        command: &[String],
    ) -> kube::Result<ExecOutput> {
        let ap = api::AttachParams {
            stdin: false,
            stdout: true,
            stderr: true,
            tty: false,
            ..Default::default()
        };

        let mut attached = self.pods(namespace).exec(pod, command.to_vec(), &ap).await?;

        let mut stdout = Vec::new();
        if let Some(mut reader) = attached.stdout() {
            let _ = reader.read_to_end(&mut stdout).await;
        }
        let mut stderr = Vec::new();
        if let Some(mut reader) = attached.stderr() {
            let _ = reader.read_to_end(&mut stderr).await;
        }

        // The status channel resolves once the remote command exits; absence
        // of a status object means the server never reported a failure.
        let success = match attached.take_status() {
            Some(status) => status
                .await
                .is_none_or(|status| status.status.as_deref() == Some("Success")),
            None => true,
        };
        attached.join().await.ok();

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            success,
        })
    }
}

impl Debug for KubeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeApi")
            .field("post_params", &self.post_params)
            .field("list_params", &self.list_params)
            .field("client", &"<kube::Client>")
            .finish()
    }
}
