use serde::{Deserialize, Serialize};

use crate::check::{CheckResult, Verdict};

/// One named case and how it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub name: String,
    pub result: CheckResult,
}

impl CaseOutcome {
    pub fn new(name: impl Into<String>, result: CheckResult) -> Self {
        Self {
            name: name.into(),
            result,
        }
    }
}

/// Aggregate over a batch of cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub infrastructure: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<CaseOutcome>,
}

impl ConformanceReport {
    pub fn from_outcomes(outcomes: Vec<CaseOutcome>) -> Self {
        let count = |v: Verdict| outcomes.iter().filter(|o| o.result.verdict == v).count();
        let total = outcomes.len();
        let passed = count(Verdict::Pass);
        let failed = count(Verdict::Fail);
        let infrastructure = count(Verdict::Infrastructure);
        let pass_rate = if total == 0 {
            0.0
        } else {
            passed as f32 / total as f32
        };
        Self {
            total,
            passed,
            failed,
            infrastructure,
            pass_rate,
            outcomes,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.result.passed())
    }
}
