//! Client for the DX Suite document-OCR standard API (v2).
//!
//! # Overview
//! `DxSuiteClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network. `BlockingClient` pairs it with a
//! `Transport` (reqwest's blocking client by default) for
//! one-call-per-endpoint use.
//!
//! # Design
//! - The client holds only the base URL and the api key; the `Credential`
//!   is passed in by reference and never stored globally.
//! - Each endpoint is split into `build_*` and `parse_*`, so tests can run
//!   without a server and transports can be swapped.
//! - Any status other than 200 becomes `ApiError::Remote`. There are no
//!   retries.
//! - Response records are typed per endpoint and ignore unknown fields.

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod transport;
pub mod types;

pub use blocking::BlockingClient;
pub use client::DxSuiteClient;
pub use config::{load_credentials, select_credential, AccountId, Credential};
pub use error::ApiError;
pub use http::{Body, HttpMethod, HttpRequest, HttpResponse};
pub use multipart::FormPart;
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    RegisteredUnit, UnitRecord, UnitSearch, UnitUpload, WorkflowConfiguration, WorkflowRef,
    WorkflowSummary,
};
