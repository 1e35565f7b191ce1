use conformance_core::oracle::{validate_dimension, validate_name, validate_schema};
use conformance_core::{
    CollectionSchema, DataType, ErrorKind, ErrorTemplate, FieldSchema, SchemaErrorKind,
    ServiceLimits,
};

#[test]
fn every_invalid_name_is_reported_with_its_literal() {
    let limits = ServiceLimits::default();
    let long = "a".repeat(256);
    for name in ["12-s", "12 s", "(mn)", "中文", "%$#", long.as_str()] {
        let err = validate_name(name, &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert_eq!(err.code(), 1100);
        assert!(err.render().contains(name));
    }
}

#[test]
fn custom_name_limit() {
    let limits = ServiceLimits::default().with_max_name_length(8);
    assert!(validate_name("abcdefg", &limits).is_ok());
    assert!(matches!(
        validate_name("abcdefgh", &limits),
        Err(ErrorTemplate::NameTooLong { max: 8, .. })
    ));
}

#[test]
fn dimension_limits_follow_configuration() {
    let limits = ServiceLimits::default().with_dim_range(4, 64);
    assert!(validate_dimension(3, "v", true, &limits).is_err());
    assert!(validate_dimension(4, "v", true, &limits).is_ok());
    assert!(validate_dimension(64, "v", true, &limits).is_ok());
    let err = validate_dimension(65, "v", true, &limits).unwrap_err();
    assert_eq!(
        err.render(),
        "invalid dimension: 65 of field v. float vector dimension should be in range 4 ~ 64"
    );
}

#[test]
fn schema_with_bad_vector_dim_names_the_field() {
    let schema = CollectionSchema::new()
        .with_field(FieldSchema::new("id", DataType::Int64).primary())
        .with_field(FieldSchema::new("emb", DataType::FloatVector).with_dim(40000));
    let err = validate_schema("c", &schema, &ServiceLimits::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDimension);
    assert!(err.render().contains("of field emb"));
}

#[test]
fn valid_schema_passes() {
    let schema = CollectionSchema::new()
        .with_field(FieldSchema::new("id", DataType::VarChar).primary().with_max_length(64))
        .with_field(FieldSchema::new("emb", DataType::FloatVector).with_dim(8))
        .with_field(FieldSchema::new("sparse", DataType::SparseFloatVector));
    assert!(validate_schema("c", &schema, &ServiceLimits::default()).is_ok());
}

#[test]
fn multiple_primary_keys_take_precedence_over_duplicates() {
    let schema = CollectionSchema::new()
        .with_field(FieldSchema::new("a", DataType::Int64).primary())
        .with_field(FieldSchema::new("a", DataType::Int64).primary());
    let err = validate_schema("c", &schema, &ServiceLimits::default()).unwrap_err();
    assert_eq!(
        err.kind(),
        ErrorKind::SchemaError(SchemaErrorKind::MultiplePrimaryKeys)
    );
    assert_eq!(err.code(), 999);
}
