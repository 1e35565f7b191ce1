mod common;

use conformance::catalog::Action;
use conformance::core::{CreateCollection, ErrorKind, ErrorTemplate, ServiceLimits};
use conformance::driver::{CaseTable, Declared, Scenario, Step};
use conformance::eval::Expectation;

use common::{assert_passed, context, setup};

fn invalid_names() -> Vec<String> {
    vec![
        " ".to_string(),
        "12-s".to_string(),
        "12 s".to_string(),
        "(mn)".to_string(),
        "中文".to_string(),
        "%$#".to_string(),
        "a-b".to_string(),
        "a".repeat(256),
    ]
}

#[tokio::test]
async fn create_rejects_invalid_names() {
    let (service, _) = setup();
    let table = CaseTable::new("create_invalid_name")
        .cases(invalid_names(), Declared::Failure(ErrorKind::InvalidName));
    let report = table
        .run(
            |case| {
                Scenario::new("create").step(
                    Step::new(Action::create_collection(CreateCollection::fast(
                        &case.params,
                        128,
                    )))
                    .declare(case.expected.clone()),
                )
            },
            || context(&service),
        )
        .await;
    assert_eq!(report.total, invalid_names().len());
    assert!(
        report.all_passed(),
        "{:#?}",
        report.failures().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn lookups_reject_invalid_names() {
    let (service, _) = setup();
    let table = CaseTable::new("lookup_invalid_name")
        .cases(invalid_names(), Declared::Failure(ErrorKind::InvalidName));
    let report = table
        .run(
            |case| {
                let expected = case.expected.clone();
                Scenario::new("lookups")
                    .step(Step::new(Action::has_collection(&case.params)).declare(expected.clone()))
                    .step(
                        Step::new(Action::describe_collection(&case.params))
                            .declare(expected.clone()),
                    )
                    .step(Step::new(Action::load_collection(&case.params)).declare(expected))
            },
            || context(&service),
        )
        .await;
    assert!(
        report.all_passed(),
        "{:#?}",
        report.failures().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn valid_name_with_underscores_and_digits() {
    let (_, mut ctx) = setup();
    let name = format!("_{}_9", ctx.names().unique("ok"));
    let report = Scenario::new("valid name")
        .step(Step::new(Action::create_collection(CreateCollection::fast(&name, 8))).expect_success())
        .step(Action::has_collection(&name))
        .step(Action::drop_collection(&name))
        .run(&mut ctx)
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn messages_follow_the_templates() {
    let (_, mut ctx) = setup();
    let long = "a".repeat(256);
    let report = Scenario::new("name templates")
        .step(Action::create_collection(CreateCollection::fast("12-s", 8)))
        .step(Action::create_collection(CreateCollection::fast("a-b", 8)))
        .step(Action::create_collection(CreateCollection::fast(&long, 8)))
        .step(Action::drop_collection(""))
        .run(&mut ctx)
        .await;
    assert_passed(&report);

    let expected: Vec<Expectation> = report.steps.iter().map(|s| s.expected.clone()).collect();
    assert_eq!(
        expected,
        vec![
            Expectation::failure(ErrorTemplate::NameFirstChar {
                name: "12-s".into()
            }),
            Expectation::failure(ErrorTemplate::NameCharset { name: "a-b".into() }),
            Expectation::failure(ErrorTemplate::NameTooLong {
                name: long.clone(),
                max: 255
            }),
            Expectation::failure(ErrorTemplate::IllegalCollectionName {
                repr: String::new()
            }),
        ]
    );
}

#[tokio::test]
async fn custom_name_limit_is_respected() {
    let limits = ServiceLimits::default().with_max_name_length(16);
    let service = conformance::milvus::InMemoryMilvus::with_limits(limits.clone());
    let mut ctx = conformance::driver::ScenarioContext::new(
        conformance::driver::DriverConfig::default().with_limits(limits),
        common::session("default", &service),
    );
    let report = Scenario::new("short names")
        .step(
            Step::new(Action::create_collection(CreateCollection::fast(
                "a".repeat(16),
                8,
            )))
            .expect_failure(ErrorKind::InvalidName),
        )
        .step(
            Step::new(Action::create_collection(CreateCollection::fast(
                "a".repeat(15),
                8,
            )))
            .expect_success(),
        )
        .run(&mut ctx)
        .await;
    assert_passed(&report);
}
