use std::time::Duration;

use constcat::concat;
use time::OffsetDateTime;

pub const APP_NAME: &str = "k8s-nettest";
pub const COMPONENT: &str = "network-test";

/// Workload pod names are this prefix plus the sanitized node name.
pub const POD_PREFIX: &str = "nettest-";

/// Generated namespace names are this prefix plus a per-run suffix.
pub const NAMESPACE_PREFIX: &str = concat!(APP_NAME, "-");

pub(crate) const KUBELET_PORT: u16 = 10250;
pub(crate) const DNS_PORT: u16 = 53;
pub(crate) const EXTERNAL_TCP_PORT: u16 = 443;

/// Per-run settings for the connectivity test suite.
///
/// The namespace is injected per run and generated uniquely by default, so
/// concurrent invocations against the same cluster cannot collide. Passing a
/// fixed name is still supported; the provisioner pre-cleans any namespace
/// left over from a previous aborted run before reusing the name.
#[derive(Clone, Debug)]
pub struct NettestConfig {
    pub namespace: String,
    pub image: String,
    pub listen_port: u16,
    pub external_host: String,
    pub readiness_timeout: Duration,
    pub readiness_poll_interval: Duration,
    pub cleanup_timeout: Duration,
    pub cleanup_poll_interval: Duration,
    /// Passed to `nc -w` for in-cluster connection attempts; the remote
    /// command enforces the timeout, not the exec transport.
    pub connect_timeout_secs: u32,
    pub external_connect_timeout_secs: u32,
}

impl Default for NettestConfig {
    fn default() -> Self {
        Self {
            namespace: generated_namespace(),
            image: "busybox:1.36".to_string(),
            listen_port: 8080,
            external_host: "github.com".to_string(),
            readiness_timeout: Duration::from_secs(90),
            readiness_poll_interval: Duration::from_secs(2),
            cleanup_timeout: Duration::from_secs(30),
            cleanup_poll_interval: Duration::from_secs(1),
            connect_timeout_secs: 3,
            external_connect_timeout_secs: 5,
        }
    }
}

impl NettestConfig {
    pub fn with_namespace(namespace: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Self::default()
        }
    }
}

fn generated_namespace() -> String {
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    let pid = std::process::id();
    format!("{NAMESPACE_PREFIX}{ts:x}-{pid:x}")
}
