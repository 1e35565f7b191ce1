//! Expectation engine for conformance scenarios.
//!
//! An [`Expectation`] is either a success contract made of [`StatePredicate`]s
//! or a failure contract (error kind, wire code, rendered message). [`check`]
//! compares it with what the service actually returned.

mod check;
mod expectation;
mod report;

pub use check::{check, CheckResult, Verdict};
pub use expectation::{same_stored_value, Expectation, ExpectedFailure, Response, StatePredicate};
pub use report::{CaseOutcome, ConformanceReport};
