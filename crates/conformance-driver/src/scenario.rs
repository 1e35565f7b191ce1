use conformance_catalog::Action;
use conformance_core::{ConformanceError, ErrorKind, Registry};
use conformance_eval::{check, CaseOutcome, CheckResult, Expectation, StatePredicate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DriverConfig;
use crate::names::NameGen;
use crate::session::Session;

/// What the scenario author states a step will do.
///
/// Checked against the oracle's prediction before the call is issued, so a
/// disagreement between author and oracle fails the step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "declared", content = "kind", rename_all = "snake_case")]
pub enum Declared {
    Success,
    Failure(ErrorKind),
}

impl Declared {
    fn agrees_with(&self, predicted: &Expectation) -> bool {
        match self {
            Declared::Success => predicted.is_success(),
            Declared::Failure(kind) => predicted.failure_kind() == Some(*kind),
        }
    }
}

/// One action record: the operation, the session issuing it and the declared outcome.
#[derive(Debug, Clone)]
pub struct Step {
    pub session: usize,
    pub action: Action,
    pub declared: Option<Declared>,
    /// Extra assertions appended to a predicted success.
    pub predicates: Vec<StatePredicate>,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            session: 0,
            action,
            declared: None,
            predicates: Vec::new(),
        }
    }

    /// Issues the step from another session.
    pub fn on(mut self, session: usize) -> Self {
        self.session = session;
        self
    }

    pub fn expect_success(mut self) -> Self {
        self.declared = Some(Declared::Success);
        self
    }

    pub fn expect_failure(mut self, kind: ErrorKind) -> Self {
        self.declared = Some(Declared::Failure(kind));
        self
    }

    pub fn declare(mut self, declared: Declared) -> Self {
        self.declared = Some(declared);
        self
    }

    pub fn with_predicate(mut self, predicate: StatePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

impl From<Action> for Step {
    fn from(action: Action) -> Self {
        Step::new(action)
    }
}

/// Diagnostic record of an executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub session: String,
    pub action: String,
    pub params: Value,
    pub expected: Expectation,
    /// `Ok(variant)` or the error's display form.
    pub actual: Result<String, String>,
    pub result: CheckResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub steps: Vec<StepRecord>,
    /// Index of the step that aborted the scenario.
    pub failed_step: Option<usize>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.failed_step.is_none()
    }

    pub fn failing_record(&self) -> Option<&StepRecord> {
        self.failed_step.and_then(|i| self.steps.get(i))
    }

    pub fn outcome(&self) -> CaseOutcome {
        let result = match self.failing_record() {
            None => CheckResult::pass(),
            Some(record) => CheckResult {
                verdict: record.result.verdict,
                reasoning: Some(format!(
                    "step {} ({} on {}): {}",
                    record.index,
                    record.action,
                    record.session,
                    record.result.reasoning.as_deref().unwrap_or("failed")
                )),
            },
        };
        CaseOutcome::new(&self.scenario, result)
    }

    /// Turns a failed report into [`ConformanceError::ScenarioFailed`].
    pub fn into_result(self) -> Result<(), ConformanceError> {
        match self.failing_record() {
            None => Ok(()),
            Some(record) => Err(ConformanceError::ScenarioFailed {
                scenario: self.scenario.clone(),
                step: record.index,
                detail: format!(
                    "{} {}: expected {}, {}",
                    record.action,
                    record.params,
                    serde_json::to_string(&record.expected).unwrap_or_default(),
                    record.result.reasoning.as_deref().unwrap_or("failed")
                ),
            }),
        }
    }
}

/// Everything a scenario threads through its steps: sessions, the mirror and settings.
#[derive(Debug)]
pub struct ScenarioContext {
    sessions: Vec<Session>,
    registry: Registry,
    config: DriverConfig,
    names: NameGen,
}

impl ScenarioContext {
    pub fn new(config: DriverConfig, session: Session) -> Self {
        let names = NameGen::new(config.name_prefix.clone());
        Self {
            sessions: vec![session],
            registry: Registry::new(),
            config,
            names,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn names(&self) -> &NameGen {
        &self.names
    }

    /// Predicts, invokes, checks and applies one step.
    pub async fn execute(&mut self, index: usize, step: &Step) -> StepRecord {
        let limits = &self.config.limits;
        let mut expected = step.action.predict(&self.registry, limits);
        for predicate in &step.predicates {
            expected = expected.and(predicate.clone());
        }

        let session_alias = self
            .sessions
            .get(step.session)
            .map(|s| s.alias().to_string())
            .unwrap_or_else(|| format!("#{}", step.session));
        let record = |actual, result| StepRecord {
            index,
            session: session_alias.clone(),
            action: step.action.name().to_string(),
            params: step.action.params_json(),
            expected: expected.clone(),
            actual,
            result,
        };

        if let Some(declared) = &step.declared {
            if !declared.agrees_with(&expected) {
                return record(
                    Err("not invoked".to_string()),
                    CheckResult::fail(format!(
                        "declared {declared:?} but the oracle predicts {}",
                        serde_json::to_string(&expected).unwrap_or_default()
                    )),
                );
            }
        }

        let Some(session) = self.sessions.get(step.session) else {
            let err = ConformanceError::Validation(format!("no session #{}", step.session));
            return record(Err(err.to_string()), CheckResult::fail(err.to_string()));
        };

        let actual = match tokio::time::timeout(
            self.config.call_timeout,
            step.action.invoke(session.service()),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ConformanceError::Timeout(format!(
                "{} exceeded {:?}",
                step.action.name(),
                self.config.call_timeout
            ))),
        };
        let result = check(&actual, &expected);

        if result.passed() && expected.is_success() {
            if let Ok(response) = &actual {
                step.action.apply(&mut self.registry, response, limits);
            }
        }

        let summary = match &actual {
            Ok(response) => Ok(response.variant().to_string()),
            Err(err) => Err(err.to_string()),
        };
        record(summary, result)
    }
}

/// An ordered list of steps run against one context.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Runs the steps strictly in order; the first failing step aborts the scenario.
    pub async fn run(&self, ctx: &mut ScenarioContext) -> ScenarioReport {
        let mut records = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let record = ctx.execute(index, step).await;
            tracing::debug!(
                scenario = %self.name,
                step = index,
                session = %record.session,
                action = %record.action,
                verdict = ?record.result.verdict,
                "step executed"
            );
            let passed = record.result.passed();
            if !passed {
                tracing::error!(
                    scenario = %self.name,
                    step = index,
                    action = %record.action,
                    params = %record.params,
                    reason = record.result.reasoning.as_deref().unwrap_or_default(),
                    "step failed"
                );
            }
            records.push(record);
            if !passed {
                return ScenarioReport {
                    scenario: self.name.clone(),
                    steps: records,
                    failed_step: Some(index),
                };
            }
        }
        tracing::info!(scenario = %self.name, steps = records.len(), "scenario passed");
        ScenarioReport {
            scenario: self.name.clone(),
            steps: records,
            failed_step: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_kind_must_match_prediction() {
        let predicted = Expectation::failure(conformance_core::ErrorTemplate::NameEmpty {
            name: String::new(),
        });
        assert!(Declared::Failure(ErrorKind::InvalidName).agrees_with(&predicted));
        assert!(!Declared::Failure(ErrorKind::NotFound).agrees_with(&predicted));
        assert!(!Declared::Success.agrees_with(&predicted));
        assert!(Declared::Success.agrees_with(&Expectation::success()));
    }

    #[test]
    fn outcome_names_the_failing_step() {
        let report = ScenarioReport {
            scenario: "drop twice".into(),
            steps: vec![StepRecord {
                index: 0,
                session: "default".into(),
                action: "drop_collection".into(),
                params: Value::Null,
                expected: Expectation::success(),
                actual: Err("boom".into()),
                result: CheckResult::fail("expected success, got boom"),
            }],
            failed_step: Some(0),
        };
        let outcome = report.outcome();
        assert!(!outcome.result.passed());
        assert!(outcome
            .result
            .reasoning
            .unwrap()
            .starts_with("step 0 (drop_collection on default)"));
        assert!(matches!(
            report.into_result(),
            Err(ConformanceError::ScenarioFailed { step: 0, .. })
        ));
    }
}
