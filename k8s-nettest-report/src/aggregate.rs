use crate::{ProbeKind, ProbeResult, TestSummary};

/// Per-kind pass/fail tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindTally {
    pub passed: usize,
    pub failed: usize,
}

impl KindTally {
    pub fn total(self) -> usize {
        self.passed + self.failed
    }
}

/// Group results by probe kind in the fixed display order. Kinds with no
/// results are omitted, so an empty cluster-DNS target set produces no
/// coredns row at all.
pub fn group_by_kind(results: &[ProbeResult]) -> Vec<(ProbeKind, KindTally)> {
    ProbeKind::ORDER
        .into_iter()
        .filter_map(|kind| {
            let mut tally = KindTally::default();
            for result in results.iter().filter(|r| r.kind == kind) {
                if result.success {
                    tally.passed += 1;
                } else {
                    tally.failed += 1;
                }
            }
            (tally.total() > 0).then_some((kind, tally))
        })
        .collect()
}

pub fn summarize(results: &[ProbeResult]) -> TestSummary {
    let passed = results.iter().filter(|r| r.success).count();
    TestSummary {
        total: results.len(),
        passed,
        failed: results.len() - passed,
    }
}
