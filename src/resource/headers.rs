use std::collections::{BTreeMap, HashMap};

use axum::http::HeaderMap;
use serde::Serialize;

/// Case-insensitive header map as declared in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Headers {
    inner: BTreeMap<String, String>,
}

impl Headers {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let inner = entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
            .collect();
        Headers { inner }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every configured header must be satisfied by the received ones.
    ///
    /// A configured value containing commas is a set of tokens which must
    /// all appear across the received values for that header. A plain value
    /// must equal a received value.
    pub fn matches(&self, received: &ReceivedHeaders) -> bool {
        self.inner.iter().all(|(key, expected)| {
            let Some(values) = received.get_all(key) else {
                return false;
            };

            if expected.contains(',') {
                let tokens: Vec<&str> = values
                    .iter()
                    .flat_map(|v| v.split(','))
                    .map(str::trim)
                    .collect();
                expected
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .all(|t| tokens.contains(&t))
            } else {
                values.iter().any(|v| v == expected)
            }
        })
    }
}

/// Headers of an incoming request, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct ReceivedHeaders {
    inner: HashMap<String, Vec<String>>,
}

impl ReceivedHeaders {
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.inner
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.inner
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

impl From<&HeaderMap> for ReceivedHeaders {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = ReceivedHeaders::default();
        for (name, value) in map {
            if let Ok(text) = value.to_str() {
                headers.insert(name.as_str(), text);
            }
        }
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ReceivedHeaders {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = ReceivedHeaders::default();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}
