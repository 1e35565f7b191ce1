use std::collections::BTreeMap;
use std::time::Duration;

use conformance_core::{
    CreateCollection, DataType, DeleteSelector, ErrorTemplate, FieldSchema, IndexSpec, LoadState,
    MilvusService, PrimaryKey, Row, SearchRequest,
};
use conformance_milvus::InMemoryMilvus;
use serde_json::json;

fn rows(range: std::ops::Range<i64>) -> Vec<Row> {
    range
        .map(|i| {
            json!({"id": i, "vector": [i as f32, 1.0, 0.5, 0.25]})
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

async fn loaded(service: &InMemoryMilvus, name: &str) {
    service
        .create_collection(&CreateCollection::fast(name, 4))
        .await
        .unwrap();
    service.insert(name, &rows(0..10)).await.unwrap();
    service.load_collection(name).await.unwrap();
}

#[tokio::test]
async fn duplicate_create_rules() {
    let service = InMemoryMilvus::new();
    let request = CreateCollection::fast("dup", 8);
    service.create_collection(&request).await.unwrap();
    service.create_collection(&request).await.unwrap();
    assert_eq!(service.list_collections().await.unwrap(), vec!["dup".to_string()]);

    let err = service
        .create_collection(&CreateCollection::fast("dup", 16))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ErrorTemplate::DuplicateDifferentParams {
            collection: "dup".into()
        }
        .to_error()
    );
}

#[tokio::test]
async fn delete_by_filter_and_ids() {
    let service = InMemoryMilvus::new();
    loaded(&service, "del").await;
    let deleted = service
        .delete("del", &DeleteSelector::Filter("id < 3".into()))
        .await
        .unwrap();
    assert_eq!(deleted, 3);
    let deleted = service
        .delete("del", &DeleteSelector::Ids(vec![PrimaryKey::Int(5), PrimaryKey::Int(99)]))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(service.query("del", "").await.unwrap().len(), 6);

    let err = service
        .delete("del", &DeleteSelector::Filter("id <<".into()))
        .await
        .unwrap_err();
    assert_eq!(err.as_service().map(|(code, _)| code), Some(1100));
}

#[tokio::test]
async fn rename_keeps_data_and_aliases() {
    let service = InMemoryMilvus::new();
    loaded(&service, "old").await;
    service.create_alias("old", "nick").await.unwrap();
    service.rename_collection("old", "new").await.unwrap();

    assert!(!service.has_collection("old").await.unwrap());
    let description = service.describe_collection("nick").await.unwrap();
    assert_eq!(description.collection_name, "new");
    assert_eq!(service.get_load_state("new").await.unwrap(), LoadState::Loaded);
    assert_eq!(service.query("new", "id >= 0").await.unwrap().len(), 10);

    let err = service.rename_collection("new", "new").await.unwrap_err();
    assert_eq!(err.as_service().map(|(code, _)| code), Some(65535));
}

#[tokio::test]
async fn partitions_load_independently() {
    let service = InMemoryMilvus::new();
    service
        .create_collection(&CreateCollection::fast("parts", 4))
        .await
        .unwrap();
    service.create_partition("parts", "p1").await.unwrap();
    service
        .load_partitions("parts", &["p1".to_string()])
        .await
        .unwrap();
    assert_eq!(
        service.get_load_state("parts").await.unwrap(),
        LoadState::PartiallyLoaded
    );
    let err = service
        .release_partitions("parts", &["p2".to_string()])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ErrorTemplate::PartitionNotFound {
            partition: "p2".into()
        }
        .to_error()
    );
}

#[tokio::test]
async fn index_lifecycle() {
    let service = InMemoryMilvus::new();
    loaded(&service, "idx").await;
    let err = service.drop_index("idx", "vector").await.unwrap_err();
    assert_eq!(err, ErrorTemplate::DropIndexWhileLoaded.to_error());

    service.release_collection("idx").await.unwrap();
    service.drop_index("idx", "vector").await.unwrap();
    assert!(service.list_indexes("idx").await.unwrap().is_empty());
    let err = service.load_collection("idx").await.unwrap_err();
    assert_eq!(err.as_service().map(|(code, _)| code), Some(700));

    service
        .create_index(
            "idx",
            &[IndexSpec::new("vector", "L2")
                .with_type("HNSW")
                .with_param("M", 16)
                .with_param("efConstruction", 200)],
        )
        .await
        .unwrap();
    let index = service.describe_index("idx", "vector").await.unwrap();
    assert_eq!(index.index_type, "HNSW");
    assert_eq!(index.params["M"], "16");
    service.load_collection("idx").await.unwrap();
}

#[tokio::test]
async fn properties_and_fields() {
    let service = InMemoryMilvus::new();
    service
        .create_collection(&CreateCollection::fast("props", 4))
        .await
        .unwrap();
    let properties = BTreeMap::from([("mmap.enabled".to_string(), json!(true))]);
    service
        .alter_collection_properties("props", &properties)
        .await
        .unwrap();
    let description = service.describe_collection("props").await.unwrap();
    assert_eq!(description.properties["mmap.enabled"], "true");

    let err = service
        .alter_collection_properties("props", &BTreeMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.as_service().map(|(code, _)| code), Some(1));

    service
        .add_collection_field(
            "props",
            &FieldSchema::new("score", DataType::Double).with_nullable(true),
        )
        .await
        .unwrap();
    let err = service
        .add_collection_field("props", &FieldSchema::new("pk2", DataType::Int64).primary())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ErrorTemplate::CannotAddPrimary {
            field: "pk2".into()
        }
        .to_error()
    );
}

#[tokio::test]
async fn search_returns_one_set_per_query() {
    let service = InMemoryMilvus::new();
    loaded(&service, "rank").await;
    let hits = service
        .search(
            "rank",
            &SearchRequest::new(vec![vec![9.0, 1.0, 0.5, 0.25], vec![0.0, 1.0, 0.5, 0.25]], 3),
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|set| set.len() == 3));
}

#[tokio::test]
async fn injected_delay_holds_the_call() {
    let service = InMemoryMilvus::new();
    service
        .inject_delay("has_collection", Duration::from_millis(50))
        .await;
    let started = std::time::Instant::now();
    assert!(!service.has_collection("slow").await.unwrap());
    assert!(started.elapsed() >= Duration::from_millis(50));
}
