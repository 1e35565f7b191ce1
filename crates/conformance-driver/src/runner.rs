use conformance_eval::ConformanceReport;

use crate::scenario::{Scenario, ScenarioContext, ScenarioReport};

/// Runs independent scenarios concurrently, each against its own context.
///
/// Steps inside a scenario never overlap; only whole scenarios interleave.
pub async fn run_scenarios(runs: Vec<(Scenario, ScenarioContext)>) -> Vec<ScenarioReport> {
    let futures: Vec<_> = runs
        .into_iter()
        .map(|(scenario, mut ctx)| async move { scenario.run(&mut ctx).await })
        .collect();
    futures::future::join_all(futures).await
}

/// [`run_scenarios`] folded into a [`ConformanceReport`].
pub async fn run_all(runs: Vec<(Scenario, ScenarioContext)>) -> ConformanceReport {
    let reports = run_scenarios(runs).await;
    let report = ConformanceReport::from_outcomes(reports.iter().map(|r| r.outcome()).collect());
    tracing::info!(
        total = report.total,
        passed = report.passed,
        failed = report.failed,
        infrastructure = report.infrastructure,
        "conformance run finished"
    );
    report
}
