use std::collections::{BTreeMap, BTreeSet};

use conformance_core::{
    CollectionDescription, ErrorKind, ErrorTemplate, IndexDescription, InsertResult, LoadState,
    PrimaryKey, Row, SearchHit,
};
use serde::{Deserialize, Serialize};

/// A successful outcome of one remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", content = "value", rename_all = "snake_case")]
pub enum Response {
    Unit,
    Bool(bool),
    Names(Vec<String>),
    Description(CollectionDescription),
    Index(IndexDescription),
    Insert(InsertResult),
    Deleted(usize),
    Search(Vec<Vec<SearchHit>>),
    Query(Vec<Row>),
    LoadState(LoadState),
}

impl Response {
    pub fn variant(&self) -> &'static str {
        match self {
            Response::Unit => "unit",
            Response::Bool(_) => "bool",
            Response::Names(_) => "names",
            Response::Description(_) => "description",
            Response::Index(_) => "index",
            Response::Insert(_) => "insert",
            Response::Deleted(_) => "deleted",
            Response::Search(_) => "search",
            Response::Query(_) => "query",
            Response::LoadState(_) => "load_state",
        }
    }
}

/// The failure contract: an error kind, its wire code and the rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedFailure {
    pub kind: ErrorKind,
    pub code: i64,
    /// Must appear verbatim inside the actual message.
    pub message: String,
}

impl From<ErrorTemplate> for ExpectedFailure {
    fn from(template: ErrorTemplate) -> Self {
        Self::from(&template)
    }
}

impl From<&ErrorTemplate> for ExpectedFailure {
    fn from(template: &ErrorTemplate) -> Self {
        Self {
            kind: template.kind(),
            code: template.code(),
            message: template.render(),
        }
    }
}

/// A side-effect-free assertion over a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "predicate", rename_all = "snake_case")]
pub enum StatePredicate {
    /// The call returned no payload.
    Unit,
    Bool { value: bool },
    /// A listing contains every name.
    Contains { names: Vec<String> },
    /// A listing contains none of the names.
    Excludes { names: Vec<String> },
    /// A listing holds exactly these names, in any order.
    Exactly { names: Vec<String> },
    /// A name appears exactly `count` times in a listing.
    Occurrences { name: String, count: usize },
    Describes { expected: CollectionDescription },
    DescribesIndex { expected: IndexDescription },
    InsertCount { count: usize },
    /// Caller-supplied keys are echoed back in order.
    InsertedIds { ids: Vec<PrimaryKey> },
    /// Search results drawn from the surviving rows.
    ///
    /// Every result set holds at most `min(limit, alive)` distinct ids out of
    /// `alive`. With `ranked` present the set must be full and the ids must
    /// appear in exactly that order.
    SearchResults {
        nq: usize,
        limit: usize,
        alive: BTreeSet<PrimaryKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ranked: Option<Vec<Vec<PrimaryKey>>>,
    },
    /// Every search result set holds exactly `count` hits.
    SearchCount { count: usize },
    /// Query rows carry exactly these primary keys.
    QueryIds {
        pk_field: String,
        ids: BTreeSet<PrimaryKey>,
    },
    LoadState { state: LoadState },
}

impl StatePredicate {
    pub fn name(&self) -> &'static str {
        match self {
            StatePredicate::Unit => "unit",
            StatePredicate::Bool { .. } => "bool",
            StatePredicate::Contains { .. } => "contains",
            StatePredicate::Excludes { .. } => "excludes",
            StatePredicate::Exactly { .. } => "exactly",
            StatePredicate::Occurrences { .. } => "occurrences",
            StatePredicate::Describes { .. } => "describes",
            StatePredicate::DescribesIndex { .. } => "describes_index",
            StatePredicate::InsertCount { .. } => "insert_count",
            StatePredicate::InsertedIds { .. } => "inserted_ids",
            StatePredicate::SearchResults { .. } => "search_results",
            StatePredicate::SearchCount { .. } => "search_count",
            StatePredicate::QueryIds { .. } => "query_ids",
            StatePredicate::LoadState { .. } => "load_state",
        }
    }

    /// Evaluates the predicate, returning a human-readable mismatch on failure.
    pub fn evaluate(&self, response: &Response) -> Result<(), String> {
        match (self, response) {
            (StatePredicate::Unit, Response::Unit) => Ok(()),
            (StatePredicate::Bool { value }, Response::Bool(actual)) => {
                expect_eq("value", value, actual)
            }
            (StatePredicate::Contains { names }, Response::Names(actual)) => {
                match names.iter().find(|n| !actual.contains(n)) {
                    Some(missing) => Err(format!("{missing:?} missing from {actual:?}")),
                    None => Ok(()),
                }
            }
            (StatePredicate::Excludes { names }, Response::Names(actual)) => {
                match names.iter().find(|n| actual.contains(n)) {
                    Some(present) => Err(format!("{present:?} unexpectedly listed in {actual:?}")),
                    None => Ok(()),
                }
            }
            (StatePredicate::Exactly { names }, Response::Names(actual)) => {
                let expected: BTreeSet<&String> = names.iter().collect();
                let actual: BTreeSet<&String> = actual.iter().collect();
                expect_eq("names", &expected, &actual)
            }
            (StatePredicate::Occurrences { name, count }, Response::Names(actual)) => {
                let seen = actual.iter().filter(|n| *n == name).count();
                expect_eq(&format!("occurrences of {name:?}"), count, &seen)
            }
            (StatePredicate::Describes { expected }, Response::Description(actual)) => {
                describes(expected, actual)
            }
            (StatePredicate::DescribesIndex { expected }, Response::Index(actual)) => {
                describes_index(expected, actual)
            }
            (StatePredicate::InsertCount { count }, Response::Insert(actual)) => {
                expect_eq("insert_count", count, &actual.insert_count)
            }
            (StatePredicate::InsertedIds { ids }, Response::Insert(actual)) => {
                expect_eq("ids", ids, &actual.ids)
            }
            (
                StatePredicate::SearchResults {
                    nq,
                    limit,
                    alive,
                    ranked,
                },
                Response::Search(actual),
            ) => search_results(*nq, *limit, alive, ranked.as_deref(), actual),
            (StatePredicate::SearchCount { count }, Response::Search(actual)) => {
                for (i, hits) in actual.iter().enumerate() {
                    expect_eq(&format!("result set {i} length"), count, &hits.len())?;
                }
                Ok(())
            }
            (StatePredicate::QueryIds { pk_field, ids }, Response::Query(rows)) => {
                let actual: BTreeSet<PrimaryKey> = rows
                    .iter()
                    .filter_map(|row| row.get(pk_field).and_then(PrimaryKey::from_value))
                    .collect();
                if actual.len() != rows.len() {
                    return Err(format!(
                        "{} rows returned but {} distinct `{pk_field}` values",
                        rows.len(),
                        actual.len()
                    ));
                }
                expect_eq("query ids", ids, &actual)
            }
            (StatePredicate::LoadState { state }, Response::LoadState(actual)) => {
                expect_eq("load state", state, actual)
            }
            (predicate, response) => Err(format!(
                "predicate {} cannot be evaluated against a {} response",
                predicate.name(),
                response.variant()
            )),
        }
    }
}

fn expect_eq<T: PartialEq + std::fmt::Debug>(what: &str, expected: &T, actual: &T) -> Result<(), String> {
    if expected == actual {
        Ok(())
    } else {
        Err(format!("{what}: expected {expected:?}, got {actual:?}"))
    }
}

/// Stored values compare as strings; booleans ignore case (`True` == `true`).
pub fn same_stored_value(expected: &str, actual: &str) -> bool {
    let is_bool = |s: &str| s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false");
    if is_bool(expected) && is_bool(actual) {
        expected.eq_ignore_ascii_case(actual)
    } else {
        expected == actual
    }
}

fn same_stored_map(
    what: &str,
    expected: &BTreeMap<String, String>,
    actual: &BTreeMap<String, String>,
) -> Result<(), String> {
    let equal = expected.len() == actual.len()
        && expected
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| same_stored_value(v, a)));
    if equal {
        Ok(())
    } else {
        Err(format!("{what}: expected {expected:?}, got {actual:?}"))
    }
}

fn describes(expected: &CollectionDescription, actual: &CollectionDescription) -> Result<(), String> {
    expect_eq("collection_name", &expected.collection_name, &actual.collection_name)?;
    expect_eq("description", &expected.description, &actual.description)?;
    expect_eq("auto_id", &expected.auto_id, &actual.auto_id)?;
    expect_eq(
        "enable_dynamic_field",
        &expected.enable_dynamic_field,
        &actual.enable_dynamic_field,
    )?;
    expect_eq(
        "consistency_level",
        &expected.consistency_level,
        &actual.consistency_level,
    )?;
    expect_eq("num_partitions", &expected.num_partitions, &actual.num_partitions)?;

    // The dynamic `$meta` field is an implementation detail of the service.
    let names = |d: &CollectionDescription| -> Vec<String> {
        d.fields
            .iter()
            .filter(|f| !f.name.starts_with('$'))
            .map(|f| f.name.clone())
            .collect()
    };
    expect_eq("field names", &names(expected), &names(actual))?;
    for field in expected.fields.iter().filter(|f| !f.name.starts_with('$')) {
        let Some(other) = actual.field(&field.name) else {
            return Err(format!("field {} missing", field.name));
        };
        if !field.same_shape(other) {
            return Err(format!("field {}: expected {field:?}, got {other:?}", field.name));
        }
        expect_eq(
            &format!("field {} nullable", field.name),
            &field.nullable,
            &other.nullable,
        )?;
        expect_eq(
            &format!("field {} partition key", field.name),
            &field.is_partition_key,
            &other.is_partition_key,
        )?;
    }
    same_stored_map("properties", &expected.properties, &actual.properties)
}

fn describes_index(expected: &IndexDescription, actual: &IndexDescription) -> Result<(), String> {
    expect_eq("index_name", &expected.index_name, &actual.index_name)?;
    expect_eq("field_name", &expected.field_name, &actual.field_name)?;
    if !expected.index_type.eq_ignore_ascii_case(&actual.index_type) {
        return Err(format!(
            "index_type: expected {:?}, got {:?}",
            expected.index_type, actual.index_type
        ));
    }
    if expected.metric_type.is_some() {
        expect_eq("metric_type", &expected.metric_type, &actual.metric_type)?;
    }
    // Services may report extra build parameters; supplied ones must round-trip.
    for (key, value) in &expected.params {
        match actual.params.get(key) {
            Some(a) if same_stored_value(value, a) => {}
            other => {
                return Err(format!(
                    "index param {key}: expected {value:?}, got {other:?}"
                ))
            }
        }
    }
    Ok(())
}

fn search_results(
    nq: usize,
    limit: usize,
    alive: &BTreeSet<PrimaryKey>,
    ranked: Option<&[Vec<PrimaryKey>]>,
    actual: &[Vec<SearchHit>],
) -> Result<(), String> {
    expect_eq("result sets", &nq, &actual.len())?;
    let expected_len = limit.min(alive.len());
    for (i, hits) in actual.iter().enumerate() {
        // Approximate indexes may miss neighbours.
        if ranked.is_some() {
            expect_eq(&format!("result set {i} length"), &expected_len, &hits.len())?;
        } else if hits.len() > expected_len {
            return Err(format!(
                "result set {i} length: expected at most {expected_len}, got {}",
                hits.len()
            ));
        }
        let mut seen = BTreeSet::new();
        for hit in hits {
            if !alive.contains(&hit.id) {
                return Err(format!("result set {i}: id {} is not a surviving row", hit.id));
            }
            if !seen.insert(&hit.id) {
                return Err(format!("result set {i}: id {} returned twice", hit.id));
            }
        }
        if let Some(order) = ranked.and_then(|r| r.get(i)) {
            let ids: Vec<PrimaryKey> = hits.iter().map(|h| h.id.clone()).collect();
            expect_eq(&format!("result set {i} order"), order, &ids)?;
        }
    }
    Ok(())
}

/// What a step is predicted to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Expectation {
    Success { predicates: Vec<StatePredicate> },
    Failure(ExpectedFailure),
}

impl Expectation {
    /// Success with no state assertion.
    pub fn success() -> Self {
        Expectation::Success {
            predicates: Vec::new(),
        }
    }

    pub fn success_with(predicates: Vec<StatePredicate>) -> Self {
        Expectation::Success { predicates }
    }

    pub fn failure(template: impl Into<ExpectedFailure>) -> Self {
        Expectation::Failure(template.into())
    }

    /// Appends a predicate. Failure expectations are left as is.
    pub fn and(mut self, predicate: StatePredicate) -> Self {
        if let Expectation::Success { predicates } = &mut self {
            predicates.push(predicate);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Expectation::Success { .. })
    }

    /// Assertions on a predicted success; empty for a failure.
    pub fn predicates(&self) -> &[StatePredicate] {
        match self {
            Expectation::Success { predicates } => predicates,
            Expectation::Failure(_) => &[],
        }
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            Expectation::Failure(f) => Some(f.kind),
            Expectation::Success { .. } => None,
        }
    }
}

impl From<ErrorTemplate> for Expectation {
    fn from(template: ErrorTemplate) -> Self {
        Expectation::failure(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: i64) -> SearchHit {
        SearchHit {
            id: PrimaryKey::Int(id),
            distance: 0.0,
        }
    }

    #[test]
    fn bool_values_compare_case_insensitively() {
        assert!(same_stored_value("true", "True"));
        assert!(same_stored_value("FALSE", "false"));
        assert!(!same_stored_value("abc", "ABC"));
        assert!(!same_stored_value("true", "false"));
    }

    #[test]
    fn search_rejects_deleted_ids() {
        let alive: BTreeSet<PrimaryKey> = (3..10).map(PrimaryKey::Int).collect();
        let predicate = StatePredicate::SearchResults {
            nq: 1,
            limit: 2,
            alive,
            ranked: None,
        };
        assert!(predicate
            .evaluate(&Response::Search(vec![vec![hit(3), hit(4)]]))
            .is_ok());
        let err = predicate
            .evaluate(&Response::Search(vec![vec![hit(1), hit(4)]]))
            .unwrap_err();
        assert!(err.contains("id 1 is not a surviving row"));
    }

    #[test]
    fn search_checks_ranked_order() {
        let predicate = StatePredicate::SearchResults {
            nq: 1,
            limit: 2,
            alive: [1, 2].into_iter().map(PrimaryKey::Int).collect(),
            ranked: Some(vec![vec![PrimaryKey::Int(2), PrimaryKey::Int(1)]]),
        };
        assert!(predicate
            .evaluate(&Response::Search(vec![vec![hit(2), hit(1)]]))
            .is_ok());
        assert!(predicate
            .evaluate(&Response::Search(vec![vec![hit(1), hit(2)]]))
            .is_err());
    }

    #[test]
    fn approximate_search_may_return_fewer_hits() {
        let alive: BTreeSet<PrimaryKey> = (0..10).map(PrimaryKey::Int).collect();
        let approximate = StatePredicate::SearchResults {
            nq: 1,
            limit: 5,
            alive,
            ranked: None,
        };
        assert!(approximate
            .evaluate(&Response::Search(vec![vec![hit(0), hit(1), hit(2)]]))
            .is_ok());
        let err = approximate
            .evaluate(&Response::Search(vec![(0..6).map(hit).collect()]))
            .unwrap_err();
        assert!(err.contains("expected at most 5, got 6"));

        let exact = StatePredicate::SearchCount { count: 5 };
        assert!(exact
            .evaluate(&Response::Search(vec![vec![hit(0), hit(1), hit(2)]]))
            .unwrap_err()
            .contains("result set 0 length"));
    }

    #[test]
    fn mismatched_response_shape_fails() {
        let err = StatePredicate::Bool { value: true }
            .evaluate(&Response::Unit)
            .unwrap_err();
        assert!(err.contains("bool"));
    }

    #[test]
    fn and_leaves_failures_untouched() {
        let failure = Expectation::failure(ErrorTemplate::DropIndexWhileLoaded);
        assert_eq!(failure.clone().and(StatePredicate::Unit), failure);
        assert_eq!(failure.failure_kind(), Some(ErrorKind::InvalidArgument));
    }
}
