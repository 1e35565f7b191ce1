use std::sync::Arc;
use std::time::Duration;

use conformance_catalog::Action;
use conformance_core::{
    ConformanceError, CreateCollection, DeleteSelector, ErrorKind, MilvusService, SearchRequest,
};
use conformance_driver::data::{gen_rows, gen_vectors};
use conformance_driver::{
    run_all, CaseTable, Declared, DriverConfig, Scenario, ScenarioContext, Session, Step,
};
use conformance_eval::Verdict;
use conformance_milvus::InMemoryMilvus;

fn context(service: &InMemoryMilvus) -> ScenarioContext {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let service: Arc<dyn MilvusService> = Arc::new(service.clone());
    ScenarioContext::new(DriverConfig::default(), Session::new("default", service))
}

#[tokio::test]
async fn lifecycle_passes_and_updates_the_mirror() {
    let service = InMemoryMilvus::new();
    let mut ctx = context(&service);
    let name = ctx.names().unique("life");

    let report = Scenario::new("lifecycle")
        .step(Action::create_collection(CreateCollection::fast(&name, 8)))
        .step(Action::insert(&name, gen_rows(0..50, 8, 7)))
        .step(Action::load_collection(&name))
        .step(Action::delete(&name, DeleteSelector::Filter("id < 5".into())))
        .step(Action::search(&name, SearchRequest::new(gen_vectors(2, 8, 11), 100)))
        .step(Action::query(&name, "id >= 0"))
        .step(Action::drop_collection(&name))
        .step(Step::new(Action::has_collection(&name)).expect_success())
        .run(&mut ctx)
        .await;

    assert!(report.passed(), "{:?}", report.failing_record());
    assert_eq!(report.steps.len(), 8);
    assert!(!ctx.registry().exists(&name));
}

#[tokio::test]
async fn declared_outcome_must_agree_with_prediction() {
    let service = InMemoryMilvus::new();
    let mut ctx = context(&service);

    let report = Scenario::new("wrong declaration")
        .step(Step::new(Action::describe_collection("missing")).expect_success())
        .run(&mut ctx)
        .await;

    assert!(!report.passed());
    let record = report.failing_record().unwrap();
    assert_eq!(record.actual, Err("not invoked".to_string()));
    assert_eq!(record.result.verdict, Verdict::Fail);
}

#[tokio::test]
async fn failure_aborts_at_the_first_divergent_step() {
    let service = InMemoryMilvus::new();
    let mut ctx = context(&service);
    let name = ctx.names().unique("diverge");
    service
        .inject_fault(
            "load_collection",
            ConformanceError::service(65535, "something unexpected"),
        )
        .await;

    let report = Scenario::new("divergence")
        .step(Action::create_collection(CreateCollection::fast(&name, 4)))
        .step(Action::load_collection(&name))
        .step(Action::drop_collection(&name))
        .run(&mut ctx)
        .await;

    assert_eq!(report.failed_step, Some(1));
    assert_eq!(report.steps.len(), 2);
    let outcome = report.outcome();
    assert_eq!(outcome.result.verdict, Verdict::Fail);
    assert!(outcome
        .result
        .reasoning
        .unwrap()
        .starts_with("step 1 (load_collection on default)"));
    assert!(matches!(
        report.into_result(),
        Err(ConformanceError::ScenarioFailed { step: 1, .. })
    ));
}

#[tokio::test]
async fn slow_calls_time_out_as_infrastructure() {
    let service = InMemoryMilvus::new();
    let session: Arc<dyn MilvusService> = Arc::new(service.clone());
    let mut ctx = ScenarioContext::new(
        DriverConfig::default().with_call_timeout(Duration::from_millis(20)),
        Session::new("slow", session),
    );
    service
        .inject_delay("list_collections", Duration::from_millis(500))
        .await;

    let report = Scenario::new("timeout")
        .step(Action::ListCollections)
        .run(&mut ctx)
        .await;

    let record = report.failing_record().unwrap();
    assert_eq!(record.result.verdict, Verdict::Infrastructure);
    assert!(record.actual.as_ref().unwrap_err().starts_with("timeout"));
}

#[tokio::test]
async fn sessions_observe_each_others_writes() {
    let service = InMemoryMilvus::new();
    let second: Arc<dyn MilvusService> = Arc::new(service.clone());
    let mut ctx = context(&service).with_session(Session::new("second", second));
    let name = ctx.names().unique("shared");

    let report = Scenario::new("two sessions")
        .step(Action::create_collection(CreateCollection::fast(&name, 4)))
        .step(Step::new(Action::drop_collection(&name)).on(1))
        .step(Step::new(Action::describe_collection(&name)).expect_failure(ErrorKind::NotFound))
        .step(Step::new(Action::create_collection(CreateCollection::fast(&name, 16))).on(1))
        .run(&mut ctx)
        .await;

    assert!(report.passed(), "{:?}", report.failing_record());
    assert_eq!(report.steps[1].session, "second");
}

#[tokio::test]
async fn missing_session_fails_the_step() {
    let service = InMemoryMilvus::new();
    let mut ctx = context(&service);
    let report = Scenario::new("no such session")
        .step(Step::new(Action::ListCollections).on(3))
        .run(&mut ctx)
        .await;
    let record = report.failing_record().unwrap();
    assert_eq!(record.session, "#3");
    assert_eq!(record.result.verdict, Verdict::Fail);
}

#[tokio::test]
async fn case_table_runs_every_row() {
    let service = InMemoryMilvus::new();
    let table = CaseTable::new("dimensions")
        .cases([2_i64, 128, 32768], Declared::Success)
        .cases([1_i64, 32769], Declared::Failure(ErrorKind::InvalidDimension));
    assert_eq!(table.len(), 5);

    let report = table
        .run(
            |case| {
                let name = format!("dim_case_{}", case.params);
                Scenario::new("dim")
                    .step(
                        Step::new(Action::create_collection(CreateCollection::fast(
                            &name,
                            case.params,
                        )))
                        .declare(case.expected.clone()),
                    )
                    .step(Action::drop_collection(&name))
            },
            || context(&service),
        )
        .await;

    assert_eq!(report.total, 5);
    assert!(
        report.all_passed(),
        "{:?}",
        report.failures().collect::<Vec<_>>()
    );
    assert!(report
        .outcomes
        .iter()
        .any(|o| o.name == "dimensions[32769]"));
}

#[tokio::test]
async fn run_all_isolates_scenarios() {
    let service = InMemoryMilvus::new();
    let ok = Scenario::new("ok").step(Action::ListCollections);
    let bad = Scenario::new("bad")
        .step(Step::new(Action::load_collection("absent")).expect_success());
    let report = run_all(vec![(ok, context(&service)), (bad, context(&service))]).await;
    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures().next().map(|o| o.name.as_str()), Some("bad"));
}
