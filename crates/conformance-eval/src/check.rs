use conformance_core::ConformanceError;
use serde::{Deserialize, Serialize};

use crate::expectation::{Expectation, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    /// Transport or timeout problems; never matched against a predicted failure.
    Infrastructure,
}

/// Result of checking one outcome against its expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub verdict: Verdict,
    /// Expected and actual, for anything but a pass.
    pub reasoning: Option<String>,
}

impl CheckResult {
    pub fn pass() -> Self {
        Self {
            verdict: Verdict::Pass,
            reasoning: None,
        }
    }

    pub fn fail(reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Fail,
            reasoning: Some(reasoning.into()),
        }
    }

    pub fn infrastructure(reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Infrastructure,
            reasoning: Some(reasoning.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Compares an actual outcome with the predicted one.
///
/// A predicted failure matches when the error code equals the expected code and
/// the rendered message is a substring of the actual message.
pub fn check(actual: &Result<Response, ConformanceError>, expected: &Expectation) -> CheckResult {
    if let Err(err) = actual {
        if err.is_infrastructure() {
            return CheckResult::infrastructure(err.to_string());
        }
    }
    match (expected, actual) {
        (Expectation::Success { predicates }, Ok(response)) => {
            for predicate in predicates {
                if let Err(detail) = predicate.evaluate(response) {
                    return CheckResult::fail(format!("{}: {detail}", predicate.name()));
                }
            }
            CheckResult::pass()
        }
        (Expectation::Success { .. }, Err(err)) => {
            CheckResult::fail(format!("expected success, got {err}"))
        }
        (Expectation::Failure(failure), Ok(response)) => CheckResult::fail(format!(
            "expected {} (code {}) containing {:?}, got a successful {} response",
            failure.kind,
            failure.code,
            failure.message,
            response.variant()
        )),
        (Expectation::Failure(failure), Err(err)) => match err.as_service() {
            Some((code, message)) if code == failure.code && message.contains(&failure.message) => {
                CheckResult::pass()
            }
            Some((code, message)) => CheckResult::fail(format!(
                "expected {} (code {}) containing {:?}, got code {code}: {message:?}",
                failure.kind, failure.code, failure.message
            )),
            None => CheckResult::fail(format!(
                "expected {} (code {}), got non-service error: {err}",
                failure.kind, failure.code
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::StatePredicate;
    use conformance_core::ErrorTemplate;

    fn not_found() -> ErrorTemplate {
        ErrorTemplate::CollectionNotFound {
            database: "default".into(),
            collection: "c1".into(),
        }
    }

    #[test]
    fn failure_matches_code_and_substring() {
        let expected = Expectation::failure(not_found());
        let actual = Err(ConformanceError::service(
            100,
            "collection not found[database=default][collection=c1]: extra context",
        ));
        assert!(check(&actual, &expected).passed());
    }

    #[test]
    fn wrong_code_is_reported_with_both_sides() {
        let expected = Expectation::failure(not_found());
        let actual = Err(ConformanceError::service(
            1,
            "collection not found[database=default][collection=c1]",
        ));
        let result = check(&actual, &expected);
        assert_eq!(result.verdict, Verdict::Fail);
        let reasoning = result.reasoning.unwrap();
        assert!(reasoning.contains("code 100"));
        assert!(reasoning.contains("got code 1"));
    }

    #[test]
    fn timeout_is_infrastructure_even_when_failure_expected() {
        let expected = Expectation::failure(not_found());
        let actual = Err(ConformanceError::Timeout("describe_collection".into()));
        assert_eq!(check(&actual, &expected).verdict, Verdict::Infrastructure);
    }

    #[test]
    fn unexpected_success_fails() {
        let expected = Expectation::failure(not_found());
        let result = check(&Ok(Response::Unit), &expected);
        assert_eq!(result.verdict, Verdict::Fail);
    }

    #[test]
    fn predicates_are_checked_in_order() {
        let expected = Expectation::success()
            .and(StatePredicate::Contains {
                names: vec!["a".into()],
            })
            .and(StatePredicate::Excludes {
                names: vec!["b".into()],
            });
        let ok = Ok(Response::Names(vec!["a".into()]));
        assert!(check(&ok, &expected).passed());
        let bad = Ok(Response::Names(vec!["a".into(), "b".into()]));
        let result = check(&bad, &expected);
        assert!(result.reasoning.unwrap().starts_with("excludes"));
    }
}
