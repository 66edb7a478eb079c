//! Error types for the DX Suite client.
//!
//! # Design
//! Every non-200 response becomes `Remote`, whatever the status. The code
//! and message are lifted from the `{"errors":[{"errorCode","message"}]}`
//! body when the server sends one. Local failures (missing upload files, bad
//! arguments, unreadable credential files) get their own variants and are
//! always raised before any request goes out.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the client, the transport and the config loader.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status other than 200.
    #[error("HTTP status {status}{}", describe_remote(.code, .message))]
    Remote {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    /// An upload references a path that does not exist.
    #[error("file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential file is malformed or empty.
    #[error("invalid credential file: {0}")]
    Config(String),

    /// The request never produced a status line.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A 200 body did not match the expected record.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

fn describe_remote(code: &Option<String>, message: &Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!(", error code {code}: {message}"),
        (Some(code), None) => format!(", error code {code}"),
        (None, Some(message)) => format!(": {message}"),
        (None, None) => String::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEntry {
    error_code: Option<serde_json::Value>,
    message: Option<String>,
}

impl ApiError {
    /// Build a `Remote` error from a non-200 status and its raw body.
    ///
    /// Only the first entry of `errors` is used. Bodies that are not JSON or
    /// carry no entries leave `code` and `message` empty.
    pub fn from_remote(status: u16, body: &[u8]) -> Self {
        let first = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.errors.into_iter().next());

        let (code, message) = match first {
            Some(entry) => (entry.error_code.map(code_to_string), entry.message),
            None => (None, None),
        };
        ApiError::Remote {
            status,
            code,
            message,
        }
    }

    /// The HTTP status for `Remote` errors, `None` for local failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// errorCode shows up as both a string and a number depending on the endpoint.
fn code_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
