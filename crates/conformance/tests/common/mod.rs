#![allow(dead_code)]

use std::sync::Arc;

use conformance::core::MilvusService;
use conformance::driver::{DriverConfig, ScenarioContext, ScenarioReport, Session};
use conformance::milvus::InMemoryMilvus;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn session(alias: &str, service: &InMemoryMilvus) -> Session {
    let service: Arc<dyn MilvusService> = Arc::new(service.clone());
    Session::new(alias, service)
}

/// A fresh service and a single-session context bound to it.
pub fn setup() -> (InMemoryMilvus, ScenarioContext) {
    init_tracing();
    let service = InMemoryMilvus::new();
    let ctx = ScenarioContext::new(DriverConfig::default(), session("default", &service));
    (service, ctx)
}

pub fn context(service: &InMemoryMilvus) -> ScenarioContext {
    init_tracing();
    ScenarioContext::new(DriverConfig::default(), session("default", service))
}

pub fn assert_passed(report: &ScenarioReport) {
    assert!(
        report.passed(),
        "scenario {} failed: {:#?}",
        report.scenario,
        report.failing_record()
    );
}
