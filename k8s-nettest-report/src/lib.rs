use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

mod aggregate;

pub use aggregate::{group_by_kind, summarize, KindTally};

/// The fixed set of connectivity probes, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    Coredns,
    Dns,
    ExternalTcp,
    Kubelet,
    PodToPod,
}

impl ProbeKind {
    pub const ORDER: [Self; 5] = [
        Self::Coredns,
        Self::Dns,
        Self::ExternalTcp,
        Self::Kubelet,
        Self::PodToPod,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coredns => "coredns",
            Self::Dns => "dns",
            Self::ExternalTcp => "external-tcp",
            Self::Kubelet => "kubelet",
            Self::PodToPod => "pod-to-pod",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Coredns => "CoreDNS Connectivity",
            Self::Dns => "DNS Resolution",
            Self::ExternalTcp => "External TCP Connectivity",
            Self::Kubelet => "Kubelet Connectivity",
            Self::PodToPod => "Pod-to-Pod Connectivity",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown probe kind: {0:?}")]
pub struct ParseProbeKindError(String);

impl FromStr for ProbeKind {
    type Err = ParseProbeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseProbeKindError(s.to_string()))
    }
}

/// Outcome of one connectivity attempt. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub source_node: String,
    pub source_pod: String,
    pub kind: ProbeKind,
    pub target: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// One run's worth of results, handed to the report renderer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub node_count: usize,
    pub pod_count: usize,
    pub results: Vec<ProbeResult>,
    pub summary: TestSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Report {
    pub fn new(node_count: usize, pod_count: usize, results: Vec<ProbeResult>) -> Self {
        let summary = summarize(&results);
        Self {
            timestamp: OffsetDateTime::now_utc(),
            node_count,
            pod_count,
            results,
            summary,
            warnings: Vec::new(),
        }
    }
}
