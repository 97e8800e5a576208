//! Response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A GraphQL response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The data. Null when the request failed or a null reached the root.
    pub data: Value,
    /// The errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl Response {
    /// Creates a response from data and collected field errors.
    pub fn new(data: Value, errors: Vec<FieldError>) -> Self {
        Self { data, errors }
    }

    /// Creates the response of a request that failed before execution.
    pub fn request_error(error: &impl fmt::Display) -> Self {
        Self {
            data: Value::Null,
            errors: vec![FieldError::new(error.to_string())],
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Serializes the response to JSON text.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// A field error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The error message.
    pub message: String,
    /// The path to the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Adds a path to the error.
    #[must_use]
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }
}

/// A path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Field(key.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_errors_omitted_when_empty() {
        let response = Response::new(json!({"film": {"title": "Prestige"}}), Vec::new());
        assert_eq!(
            response.to_json(false).unwrap(),
            r#"{"data":{"film":{"title":"Prestige"}}}"#
        );
    }

    #[test]
    fn test_request_error_has_null_data() {
        let response = Response::request_error(&"Must provide any operation");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"data": null, "errors": [{"message": "Must provide any operation"}]})
        );
    }

    #[test]
    fn test_error_path_segments() {
        let error = FieldError::new("boom").with_path(vec!["films".into(), 1.into(), "title".into()]);
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"message": "boom", "path": ["films", 1, "title"]})
        );
    }

    #[test]
    fn test_pretty_print() {
        let response = Response::new(json!({"a": 1}), Vec::new());
        assert!(response.to_json(true).unwrap().contains('\n'));
    }
}
