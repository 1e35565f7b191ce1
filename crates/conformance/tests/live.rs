//! Runs a representative scenario against a real deployment named by `MILVUS_URI`.

use std::sync::Arc;

use conformance::catalog::Action;
use conformance::core::{CreateCollection, DeleteSelector, MilvusService, SearchRequest};
use conformance::driver::data::{gen_rows, gen_vectors};
use conformance::driver::{DriverConfig, Scenario, ScenarioContext, Session};
use conformance::milvus::MilvusRestClient;

#[tokio::test]
#[ignore = "requires a running Milvus instance"]
async fn lifecycle_against_live_milvus() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let client: Arc<dyn MilvusService> = Arc::new(MilvusRestClient::from_env().unwrap());
    let mut ctx = ScenarioContext::new(DriverConfig::default(), Session::new("live", client));
    let name = ctx.names().unique("live");

    let report = Scenario::new("live lifecycle")
        .step(Action::create_collection(CreateCollection::fast(&name, 32)))
        .step(Action::describe_collection(&name))
        .step(Action::insert(&name, gen_rows(0..100, 32, 1)))
        .step(Action::delete(&name, DeleteSelector::Filter("id < 3".into())))
        .step(Action::load_collection(&name))
        .step(Action::search(&name, SearchRequest::new(gen_vectors(2, 32, 2), 50)))
        .step(Action::drop_collection(&name))
        .run(&mut ctx)
        .await;

    assert!(report.passed(), "{:#?}", report.failing_record());
}
