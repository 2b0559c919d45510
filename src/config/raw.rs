use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// One item of the configuration file, as written by the user.
///
/// Everything is optional here so that a single missing field does not hide
/// the other problems in the same item; `validation` decides what is
/// actually required.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawConfigItem {
    pub name: Option<String>,
    #[serde(default)]
    pub serve_only: bool,
    pub request: Option<RawRequest>,
    pub response: Option<RawResponse>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum RawEndpoints {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum RawHeaderValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl fmt::Display for RawHeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawHeaderValue::Text(s) => f.write_str(s),
            RawHeaderValue::Number(n) => write!(f, "{n}"),
            RawHeaderValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

pub type RawHeaders = BTreeMap<String, RawHeaderValue>;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub method: Option<String>,
    pub endpoints: Option<RawEndpoints>,
    pub serve_endpoint: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub headers: Option<RawHeaders>,
    pub body: Option<Value>,
    pub body_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    pub code: Option<i64>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub headers: Option<RawHeaders>,
    pub body: Option<Value>,
    pub body_path: Option<String>,
    pub serve_body: Option<Value>,
    pub serve_body_path: Option<String>,
}
