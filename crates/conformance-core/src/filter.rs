use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::schema::Row;
use crate::template::ErrorTemplate;

static COMPARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(<=|>=|==|!=|<|>)\s*(.+?)\s*$").unwrap()
});
static IN_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s+in\s+\[(.*)\]\s*$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
        }
    }
}

/// The boolean expression subset used by delete and query.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
}

impl Filter {
    pub fn parse(expr: &str) -> Result<Filter, ErrorTemplate> {
        let invalid = || ErrorTemplate::InvalidFilter {
            expr: expr.to_string(),
        };
        if expr.trim().is_empty() {
            return Ok(Filter::All);
        }
        if let Some(caps) = IN_LIST.captures(expr) {
            let values = caps[2]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_literal)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(invalid)?;
            return Ok(Filter::In {
                field: caps[1].to_string(),
                values,
            });
        }
        let caps = COMPARE.captures(expr).ok_or_else(invalid)?;
        let op = CompareOp::parse(&caps[2]).ok_or_else(invalid)?;
        let value = parse_literal(&caps[3]).ok_or_else(invalid)?;
        Ok(Filter::Compare {
            field: caps[1].to_string(),
            op,
            value,
        })
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::All => true,
            Filter::Compare { field, op, value } => row
                .get(field)
                .and_then(|actual| compare(actual, value))
                .is_some_and(|ord| op.holds(ord)),
            Filter::In { field, values } => row.get(field).is_some_and(|actual| {
                values
                    .iter()
                    .any(|v| compare(actual, v) == Some(Ordering::Equal))
            }),
        }
    }
}

fn parse_literal(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some(Value::from(&raw[1..raw.len() - 1]));
        }
    }
    match raw {
        "true" | "True" => return Some(Value::Bool(true)),
        "false" | "False" => return Some(Value::Bool(false)),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::from(i));
    }
    raw.parse::<f64>().ok().map(Value::from)
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn numeric_comparison() {
        let f = Filter::parse("id < 3").unwrap();
        assert!(f.matches(&row(json!({"id": 2}))));
        assert!(!f.matches(&row(json!({"id": 3}))));
        assert!(!f.matches(&row(json!({"other": 1}))));
    }

    #[test]
    fn in_list_and_strings() {
        let f = Filter::parse("varchar in [\"a\", 'b']").unwrap();
        assert!(f.matches(&row(json!({"varchar": "b"}))));
        assert!(!f.matches(&row(json!({"varchar": "c"}))));

        let ids = Filter::parse("id in [1, 2, 5]").unwrap();
        assert!(ids.matches(&row(json!({"id": 5}))));
        assert!(!ids.matches(&row(json!({"id": 4}))));
    }

    #[test]
    fn empty_filter_selects_all() {
        assert_eq!(Filter::parse("  ").unwrap(), Filter::All);
    }

    #[test]
    fn unparseable_filter() {
        let err = Filter::parse("id <<>> x").unwrap_err();
        assert!(err.render().contains("cannot parse expression: id <<>> x"));
    }
}
