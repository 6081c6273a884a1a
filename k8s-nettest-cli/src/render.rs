use std::fmt::Write as _;

use k8s_nettest_report::{group_by_kind, Report};

pub(crate) fn json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

pub(crate) fn text(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Cluster Network Test");
    let _ = writeln!(
        out,
        "Nodes: {}  Pods: {}",
        report.node_count, report.pod_count
    );
    for warning in &report.warnings {
        let _ = writeln!(out, "Warning: {warning}");
    }
    let _ = writeln!(out);

    for (kind, tally) in group_by_kind(&report.results) {
        let _ = writeln!(
            out,
            "{}: {}/{} passed",
            kind.display_name(),
            tally.passed,
            tally.total()
        );
        for result in report.results.iter().filter(|r| r.kind == kind && !r.success) {
            let _ = writeln!(
                out,
                "  FAIL {} ({}) -> {}: {}",
                result.source_node,
                result.source_pod,
                result.target,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let _ = writeln!(out);
    let _ = write!(
        out,
        "Total: {}  Passed: {}  Failed: {}",
        report.summary.total, report.summary.passed, report.summary.failed
    );
    out
}
