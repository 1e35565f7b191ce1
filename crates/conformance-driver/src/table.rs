use conformance_eval::ConformanceReport;

use crate::scenario::{Declared, Scenario, ScenarioContext};

/// One row of a table-driven test.
#[derive(Debug, Clone)]
pub struct Case<P> {
    pub label: String,
    pub params: P,
    pub expected: Declared,
}

/// `(parameters, expected outcome)` rows consumed by a single scenario builder.
#[derive(Debug, Clone)]
pub struct CaseTable<P> {
    name: String,
    cases: Vec<Case<P>>,
}

impl<P> CaseTable<P> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(mut self, label: impl Into<String>, params: P, expected: Declared) -> Self {
        self.cases.push(Case {
            label: label.into(),
            params,
            expected,
        });
        self
    }

    /// Adds one case per parameter, all with the same expected outcome.
    pub fn cases(mut self, params: impl IntoIterator<Item = P>, expected: Declared) -> Self
    where
        P: std::fmt::Debug,
    {
        for p in params {
            let label = format!("{p:?}");
            self = self.case(label, p, expected.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Builds one scenario per case, named `<table>[<label>]`.
    pub fn scenarios<F>(&self, build: F) -> Vec<Scenario>
    where
        F: Fn(&Case<P>) -> Scenario,
    {
        self.cases
            .iter()
            .map(|case| {
                let mut scenario = build(case);
                scenario.name = format!("{}[{}]", self.name, case.label);
                scenario
            })
            .collect()
    }

    /// Builds and runs every case, each in a fresh context.
    pub async fn run<F, C>(&self, build: F, context: C) -> ConformanceReport
    where
        F: Fn(&Case<P>) -> Scenario,
        C: Fn() -> ScenarioContext,
    {
        let runs = self
            .scenarios(build)
            .into_iter()
            .map(|scenario| (scenario, context()))
            .collect();
        crate::runner::run_all(runs).await
    }
}
