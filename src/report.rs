//! Inspect report: each live call next to what earlier attempts recorded.

use serde_json::Value;

use crate::cassette::format::{ApiCallRecord, TestApiRecordData, TestState};

const PASSED_MARK: &str = "✅";
const FAILED_MARK: &str = "🚨";

/// Rendered comparison of a test's calls against its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    /// Tab separated, one line per call or historical attempt.
    pub text: String,
    /// Whether any listed historical attempt failed.
    pub has_failures: bool,
}

/// Build the report.
///
/// For every current call `k`, lists the call itself and then call `k` of
/// every historical attempt that made at least `k + 1` calls, most recent
/// first. Attempts that did not pass are marked and set `has_failures`.
#[must_use]
pub fn build(history: &[TestApiRecordData], current: &[ApiCallRecord]) -> InspectReport {
    let mut lines = vec!["API call comparisons".to_string()];
    let mut has_failures = false;

    for (k, call) in current.iter().enumerate() {
        lines.push(format!("API call {} {} {}", k + 1, call.method, call.url));
        lines.push(line(FAILED_MARK, call));

        for attempt in history.iter().rev() {
            let Some(previous) = attempt.api_calls_in_this_test.get(k) else {
                continue;
            };
            let passed = attempt.test_state == Some(TestState::Passed);
            has_failures |= !passed;
            lines.push(line(if passed { PASSED_MARK } else { FAILED_MARK }, previous));
        }
    }

    InspectReport { text: lines.join("\n"), has_failures }
}

fn line(mark: &str, call: &ApiCallRecord) -> String {
    format!(
        "{mark}\trequest\t{}\tresponse\t{}",
        body(call.request.as_ref()),
        body(call.response.as_ref())
    )
}

fn body(value: Option<&Value>) -> String {
    value.map_or_else(|| "undefined".to_string(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::TestIdentity;
    use serde_json::json;

    fn call(url: &str, response: Value) -> ApiCallRecord {
        ApiCallRecord {
            method: "GET".into(),
            url: url.into(),
            request: None,
            response: Some(response),
            duration: 10,
        }
    }

    fn attempt(state: TestState, calls: Vec<ApiCallRecord>) -> TestApiRecordData {
        TestApiRecordData::new(&TestIdentity::new("e2e/a.cy.js", ["lists"]), calls, Some(state))
    }

    #[test]
    fn lists_history_most_recent_first() {
        let history = vec![
            attempt(TestState::Passed, vec![call("/todos", json!([]))]),
            attempt(TestState::Passed, vec![call("/todos", json!([1]))]),
        ];
        let report = build(&history, &[call("/todos", json!([1, 2]))]);

        assert!(!report.has_failures);
        assert_eq!(
            report.text,
            "API call comparisons\n\
             API call 1 GET /todos\n\
             🚨\trequest\tundefined\tresponse\t[1,2]\n\
             ✅\trequest\tundefined\tresponse\t[1]\n\
             ✅\trequest\tundefined\tresponse\t[]"
        );
    }

    #[test]
    fn failed_attempts_flag_the_report() {
        let history = vec![attempt(TestState::Failed, vec![call("/todos", json!([]))])];
        let report = build(&history, &[call("/todos", json!([]))]);
        assert!(report.has_failures);
        assert!(report.text.ends_with("🚨\trequest\tundefined\tresponse\t[]"));
    }

    #[test]
    fn attempts_without_the_call_are_skipped() {
        let history = vec![attempt(TestState::Failed, vec![call("/a", json!(1))])];
        let current = [call("/a", json!(1)), call("/b", json!(2))];
        let report = build(&history, &current);

        assert_eq!(report.text.lines().count(), 1 + 3 + 2);
        assert!(report.text.contains("API call 2 GET /b"));
    }

    #[test]
    fn no_calls_no_failures() {
        let history = vec![attempt(TestState::Failed, vec![call("/a", json!(1))])];
        let report = build(&history, &[]);
        assert_eq!(report.text, "API call comparisons");
        assert!(!report.has_failures);
    }
}
