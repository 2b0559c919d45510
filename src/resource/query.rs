use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Expected query constraints taken from a configured endpoint.
///
/// An endpoint without a query string places no constraint on the received
/// query. Keys follow the bracket convention used by most web stacks:
/// `a=1&a=2` is a list, `a[]=1` is a list, `a[b]=1` is a nested map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Query {
    expected: Option<Map<String, Value>>,
}

impl Query {
    /// Build from a full endpoint such as `/api/books?author=*`.
    pub fn from_endpoint(endpoint: &str) -> Self {
        match endpoint.split_once('?') {
            Some((_, qs)) if !qs.is_empty() => Query {
                expected: Some(parse_query(qs)),
            },
            _ => Query::default(),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.expected.is_none()
    }

    pub fn matches(&self, received: &Map<String, Value>) -> bool {
        match &self.expected {
            None => true,
            Some(expected) => expected
                .iter()
                .all(|(key, value)| value_matches(value, received.get(key))),
        }
    }
}

/// Parse a raw query string (without the leading `?`) into a nested map.
pub fn parse_query(qs: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in form_urlencoded::parse(qs.as_bytes()) {
        let segments = split_key(&key);
        insert(&mut out, &segments, value.into_owned());
    }
    out
}

fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if !key.ends_with(']') || open == 0 {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                segments.push(stripped[..close].to_string());
                rest = &stripped[close + 1..];
            }
            None => break,
        }
    }
    segments
}

fn insert(target: &mut Map<String, Value>, segments: &[String], value: String) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };

    if tail.is_empty() {
        match target.get_mut(head) {
            None => {
                target.insert(head.clone(), Value::String(value));
            }
            Some(slot) => push_value(slot, value),
        }
        return;
    }

    if tail[0].is_empty() {
        let slot = target
            .entry(head.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        push_value(slot, value);
        return;
    }

    let slot = target
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(nested) = slot {
        insert(nested, tail, value);
    }
}

// a scalar after a nested key is ambiguous; the nested form wins
fn push_value(slot: &mut Value, value: String) {
    if let Value::String(_) = slot {
        let previous = slot.take();
        *slot = Value::Array(vec![previous]);
    }
    if let Value::Array(items) = slot {
        items.push(Value::String(value));
    }
}

fn value_matches(expected: &Value, actual: Option<&Value>) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    if actual.is_null() {
        return false;
    }

    match expected {
        Value::String(s) if s == "*" => true,
        Value::Array(items) => {
            let received: Vec<&Value> = match actual {
                Value::Array(values) => values.iter().collect(),
                Value::Object(_) => return false,
                other => vec![other],
            };
            items
                .iter()
                .all(|item| received.iter().any(|r| value_matches(item, Some(r))))
        }
        Value::Object(fields) => match actual {
            Value::Object(received) => fields
                .iter()
                .all(|(key, value)| value_matches(value, received.get(key))),
            _ => false,
        },
        scalar => match actual {
            Value::Array(values) => values.iter().any(|r| scalar_eq(scalar, r)),
            Value::Object(_) => false,
            other => scalar_eq(scalar, other),
        },
    }
}

fn scalar_eq(expected: &Value, actual: &Value) -> bool {
    match (scalar_text(expected), scalar_text(actual)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
