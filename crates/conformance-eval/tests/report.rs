use conformance_eval::{CaseOutcome, CheckResult, ConformanceReport};

#[test]
fn computes_pass_rate() {
    let report = ConformanceReport::from_outcomes(vec![
        CaseOutcome::new("create", CheckResult::pass()),
        CaseOutcome::new("drop", CheckResult::fail("expected success")),
        CaseOutcome::new("load", CheckResult::pass()),
    ]);

    assert_eq!(report.total, 3);
    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 1);
    assert!((report.pass_rate - 0.666_666_7).abs() < 0.000_1);
    assert!(!report.all_passed());
    assert_eq!(report.failures().next().unwrap().name, "drop");
}

#[test]
fn infrastructure_is_counted_separately() {
    let report = ConformanceReport::from_outcomes(vec![
        CaseOutcome::new("search", CheckResult::infrastructure("timeout: search")),
        CaseOutcome::new("query", CheckResult::pass()),
    ]);
    assert_eq!(report.infrastructure, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.passed, 1);
}

#[test]
fn empty_report() {
    let report = ConformanceReport::from_outcomes(vec![]);
    assert_eq!(report.total, 0);
    assert_eq!(report.pass_rate, 0.0);
    assert!(report.all_passed());
}
