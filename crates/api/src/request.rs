//! Request/response envelopes

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

use portgate_common::GateError;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
            Method::Other(m) => f.write_str(m),
        }
    }
}

/// One inbound request, already split by the transport layer.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub api_key: Option<String>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post<P: Into<String>, B: Into<String>>(path: P, body: B) -> Self {
        let mut req = Self::new(Method::Post, path);
        req.body = Some(body.into());
        req
    }

    fn new<P: Into<String>>(method: Method, path: P) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            api_key: None,
            body: None,
        }
    }

    #[must_use]
    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_api_key<K: Into<String>>(mut self, key: K) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// 200 with `payload` serialized.
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self {
                status: 500,
                body: json!({ "ok": false, "error": format!("failed to encode response: {e}") }),
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<GateError> for ApiResponse {
    fn from(err: GateError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "ok": false, "error": err.to_string() }),
        }
    }
}
