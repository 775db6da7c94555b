//! Run results and their TAP rendering.

use std::fmt::Write as _;

use serde::Serialize;

use crate::assert::AssertionRecord;
use crate::sink::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

/// Result of one registered scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub index: usize,
    pub description: String,
    pub outcome: Outcome,
    pub assertions: Vec<AssertionRecord>,
    /// Handler errors, panics, timeouts and rejections from spawned tasks
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl ScenarioReport {
    pub(crate) fn skipped(index: usize, description: impl Into<String>) -> Self {
        Self {
            index,
            description: description.into(),
            outcome: Outcome::Skipped,
            assertions: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Settle the outcome from the collected assertions and errors.
    pub(crate) fn finish(&mut self) {
        if self.outcome == Outcome::Skipped {
            return;
        }
        self.outcome = if self.errors.is_empty() && self.assertions.iter().all(|a| a.ok) {
            Outcome::Passed
        } else {
            Outcome::Failed
        };
    }

    pub fn failed_assertions(&self) -> usize {
        self.assertions.iter().filter(|a| !a.ok).count()
    }
}

/// Assertion tallies over a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub tests: usize,
    pub pass: usize,
    pub fail: usize,
    pub skipped: usize,
}

/// Everything one `run()` produced, in registration order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub scenarios: Vec<ScenarioReport>,
    /// Errors reported to the sink that no scenario could be blamed for
    pub unattributed: Vec<Rejection>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.unattributed.is_empty()
            && self.scenarios.iter().all(|s| s.outcome != Outcome::Failed)
    }

    /// 0 when everything passed, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// Each assertion and each error is one TAP test point.
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for scenario in &self.scenarios {
            if scenario.outcome == Outcome::Skipped {
                counts.tests += 1;
                counts.skipped += 1;
                continue;
            }
            let failed = scenario.failed_assertions() + scenario.errors.len();
            counts.tests += scenario.assertions.len() + scenario.errors.len();
            counts.fail += failed;
            counts.pass += scenario.assertions.len() - scenario.failed_assertions();
        }
        counts.tests += self.unattributed.len();
        counts.fail += self.unattributed.len();
        counts
    }

    pub fn scenario(&self, description: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.description == description)
    }

    /// One line per scenario, e.g. `PASS description of example test (2 assertions, 12ms)`
    pub fn summary_lines(&self) -> Vec<String> {
        self.scenarios
            .iter()
            .map(|s| {
                let tag = match s.outcome {
                    Outcome::Passed => "PASS",
                    Outcome::Failed => "FAIL",
                    Outcome::Skipped => "SKIP",
                };
                format!(
                    "{} {} ({} assertions, {}ms)",
                    tag,
                    s.description,
                    s.assertions.len(),
                    s.duration_ms
                )
            })
            .collect()
    }

    /// Render as TAP version 13.
    pub fn to_tap(&self) -> String {
        let mut out = String::from("TAP version 13\n");
        let mut n = 0usize;

        for scenario in &self.scenarios {
            let _ = writeln!(out, "# {}", scenario.description);

            if scenario.outcome == Outcome::Skipped {
                n += 1;
                let _ = writeln!(out, "ok {} - {} # SKIP", n, scenario.description);
                continue;
            }

            for assertion in &scenario.assertions {
                n += 1;
                if assertion.ok {
                    let _ = writeln!(out, "ok {} - {}", n, assertion.message);
                } else {
                    let _ = writeln!(out, "not ok {} - {}", n, assertion.message);
                    write_diagnostic(&mut out, assertion);
                }
            }

            for error in &scenario.errors {
                n += 1;
                let _ = writeln!(out, "not ok {} - {}", n, error);
                let _ = writeln!(out, "  ---");
                let _ = writeln!(out, "    operator: error");
                let _ = writeln!(out, "  ...");
            }
        }

        for rejection in &self.unattributed {
            n += 1;
            let _ = writeln!(out, "not ok {} - unhandled rejection: {}", n, rejection.error);
        }

        let counts = self.counts();
        let _ = writeln!(out);
        let _ = writeln!(out, "1..{}", n);
        let _ = writeln!(out, "# tests {}", counts.tests);
        let _ = writeln!(out, "# pass  {}", counts.pass);
        if counts.skipped > 0 {
            let _ = writeln!(out, "# skip  {}", counts.skipped);
        }
        if counts.fail > 0 {
            let _ = writeln!(out, "# fail  {}", counts.fail);
        } else {
            let _ = writeln!(out);
            let _ = writeln!(out, "# ok");
        }
        out
    }
}

fn write_diagnostic(out: &mut String, assertion: &AssertionRecord) {
    let _ = writeln!(out, "  ---");
    let _ = writeln!(out, "    operator: {}", assertion.operator);
    if let Some(expected) = &assertion.expected {
        let _ = writeln!(out, "    expected: {}", expected);
    }
    if let Some(actual) = &assertion.actual {
        let _ = writeln!(out, "    actual:   {}", actual);
    }
    let _ = writeln!(out, "  ...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(ok: bool, message: &str) -> AssertionRecord {
        AssertionRecord {
            ok,
            operator: "deepEqual",
            message: message.into(),
            actual: (!ok).then(|| json!({"Ok": 1})),
            expected: (!ok).then(|| json!({"Ok": 2})),
        }
    }

    fn scenario(index: usize, description: &str, assertions: Vec<AssertionRecord>, errors: Vec<&str>) -> ScenarioReport {
        let mut report = ScenarioReport {
            index,
            description: description.into(),
            outcome: Outcome::Passed,
            assertions,
            errors: errors.into_iter().map(String::from).collect(),
            duration_ms: 1,
        };
        report.finish();
        report
    }

    #[test]
    fn test_all_passing() {
        let report = RunReport {
            run_id: "r".into(),
            scenarios: vec![
                scenario(0, "first", vec![record(true, "a"), record(true, "b")], vec![]),
                scenario(1, "second", vec![record(true, "c")], vec![]),
            ],
            unattributed: vec![],
        };

        assert!(report.success());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            report.counts(),
            Counts {
                tests: 3,
                pass: 3,
                fail: 0,
                skipped: 0
            }
        );

        let tap = report.to_tap();
        assert!(tap.starts_with("TAP version 13\n# first\nok 1 - a\nok 2 - b\n# second\nok 3 - c\n"));
        assert!(tap.contains("1..3"));
        assert!(tap.trim_end().ends_with("# ok"));
    }

    #[test]
    fn test_failed_assertion_has_diagnostic() {
        let report = RunReport {
            run_id: "r".into(),
            scenarios: vec![scenario(0, "only", vec![record(true, "a"), record(false, "b")], vec![])],
            unattributed: vec![],
        };

        assert_eq!(report.scenarios[0].outcome, Outcome::Failed);
        assert_eq!(report.exit_code(), 1);

        let tap = report.to_tap();
        assert!(tap.contains("not ok 2 - b\n  ---\n    operator: deepEqual\n"));
        assert!(tap.contains(r#"expected: {"Ok":2}"#));
        assert!(tap.contains("# fail  1"));
    }

    #[test]
    fn test_error_without_assertions_fails() {
        let report = RunReport {
            run_id: "r".into(),
            scenarios: vec![scenario(0, "boom", vec![], vec!["handler failed"])],
            unattributed: vec![],
        };
        assert_eq!(report.scenarios[0].outcome, Outcome::Failed);
        assert_eq!(report.counts().fail, 1);
        assert_eq!(report.summary_lines(), vec!["FAIL boom (0 assertions, 1ms)"]);
    }

    #[test]
    fn test_skipped_and_unattributed() {
        let report = RunReport {
            run_id: "r".into(),
            scenarios: vec![
                scenario(0, "run", vec![record(true, "a")], vec![]),
                ScenarioReport::skipped(1, "not focused"),
            ],
            unattributed: vec![Rejection {
                scenario: None,
                description: None,
                error: "stray".into(),
            }],
        };

        assert!(!report.success());
        let tap = report.to_tap();
        assert!(tap.contains("ok 2 - not focused # SKIP"));
        assert!(tap.contains("not ok 3 - unhandled rejection: stray"));
        assert!(tap.contains("# skip  1"));
    }
}
