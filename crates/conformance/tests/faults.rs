mod common;

use std::time::Duration;

use conformance::catalog::Action;
use conformance::core::{ConformanceError, CreateCollection, MilvusService};
use conformance::driver::{run_all, DriverConfig, Scenario, ScenarioContext};
use conformance::eval::Verdict;

use common::{context, session, setup};

#[tokio::test]
async fn transport_errors_are_reported_as_infrastructure() {
    let (service, mut ctx) = setup();
    let name = ctx.names().unique("infra");
    service
        .inject_fault(
            "describe_collection",
            ConformanceError::Transport("connection reset by peer".into()),
        )
        .await;

    let report = Scenario::new("transport")
        .step(Action::create_collection(CreateCollection::fast(&name, 8)))
        .step(Action::describe_collection(&name))
        .run(&mut ctx)
        .await;

    assert_eq!(report.failed_step, Some(1));
    assert_eq!(report.outcome().result.verdict, Verdict::Infrastructure);
}

#[tokio::test]
async fn wrong_error_code_is_a_conformance_failure() {
    let (service, mut ctx) = setup();
    let name = ctx.names().unique("code");
    service
        .inject_fault(
            "load_collection",
            ConformanceError::service(
                1100,
                format!("collection not found[database=default][collection={name}]"),
            ),
        )
        .await;

    let report = Scenario::new("wrong code")
        .step(Action::load_collection(&name))
        .run(&mut ctx)
        .await;

    let record = report.failing_record().unwrap();
    assert_eq!(record.result.verdict, Verdict::Fail);
    assert!(record.result.reasoning.as_deref().unwrap().contains("100"));
}

#[tokio::test]
async fn timeouts_and_hidden_state_changes() {
    let (service, mut ctx) = setup();
    let name = ctx.names().unique("hidden");
    service
        .inject_fault("has_collection", ConformanceError::Timeout("slow".into()))
        .await;
    let report = Scenario::new("timeout reported by the service")
        .step(Action::has_collection(&name))
        .run(&mut ctx)
        .await;
    assert_eq!(report.outcome().result.verdict, Verdict::Infrastructure);

    // Created behind the mirror's back, so the predicted NotFound is wrong.
    service
        .create_collection(&CreateCollection::fast(&name, 8))
        .await
        .unwrap();
    let report = Scenario::new("hidden create")
        .step(Action::describe_collection(&name))
        .run(&mut ctx)
        .await;
    assert_eq!(report.outcome().result.verdict, Verdict::Fail);
}

#[tokio::test]
async fn report_counts_each_verdict() {
    let (service, _) = setup();
    service
        .inject_delay("list_collections", Duration::from_millis(300))
        .await;
    let slow = ScenarioContext::new(
        DriverConfig::default().with_call_timeout(Duration::from_millis(20)),
        session("slow", &service),
    );

    let report = run_all(vec![
        (
            Scenario::new("passes").step(Action::has_collection("nothing_here")),
            context(&service),
        ),
        (
            Scenario::new("times out").step(Action::ListCollections),
            slow,
        ),
        (
            Scenario::new("fails").step(
                conformance::driver::Step::new(Action::load_collection("nothing_here"))
                    .expect_success(),
            ),
            context(&service),
        ),
    ])
    .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.passed, 1);
    assert_eq!(report.infrastructure, 1);
    assert_eq!(report.failed, 1);
    assert!((report.pass_rate - 1.0 / 3.0).abs() < 1e-6);
}
