//! Sans-IO request builder and response parser for the DX Suite API.
//!
//! # Design
//! `DxSuiteClient` holds the base URL and the api key and carries no mutable
//! state between calls. Each endpoint is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. A `Transport` (see `BlockingClient`) runs the round-trip.
//!
//! Any status other than 200 is a `Remote` error.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::config::Credential;
use crate::error::ApiError;
use crate::http::{Body, HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::FormPart;
use crate::types::{
    RegisteredUnit, UnitList, UnitRecord, UnitSearch, UnitUpload, WorkflowConfiguration,
    WorkflowList, WorkflowRef, WorkflowSummary,
};

const API_KEY_HEADER: &str = "apikey";

/// Stateless client for the DX Suite standard API (v2).
#[derive(Clone)]
pub struct DxSuiteClient {
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for DxSuiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DxSuiteClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl DxSuiteClient {
    /// Client for the credential's own tenant,
    /// `https://{domain}.dx-suite.com/wf/api/standard/v2`.
    pub fn new(credential: &Credential) -> Self {
        Self::with_base_url(credential, &credential.base_url())
    }

    /// Client against an arbitrary base URL (mock servers, proxies).
    pub fn with_base_url(credential: &Credential, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: credential.key.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_get_workflow_configuration(&self, workflow: &WorkflowRef) -> HttpRequest {
        self.get(format!(
            "{}/workflows/{}/revisions/{}/configuration",
            self.base_url,
            urlencoding::encode(workflow.workflow_id()),
            workflow.revision()
        ))
    }

    pub fn build_search_workflows(&self, folder_id: &str, name: &str) -> HttpRequest {
        let query = encode_query(&[("folderId", folder_id.to_string()), ("searchName", name.to_string())]);
        self.get(format!("{}/workflows{query}", self.base_url))
    }

    /// Build the multipart registration request.
    ///
    /// Every path is checked before any file is opened, so a missing file
    /// fails the whole call without reading anything. Each file becomes one
    /// `files` part named by its basename; metadata goes into
    /// `unitName[i]` / `departmentId[i]` when present.
    pub fn build_register_unit(
        &self,
        workflow_id: &str,
        uploads: &[UnitUpload],
    ) -> Result<HttpRequest, ApiError> {
        if uploads.is_empty() {
            return Err(ApiError::InvalidArgument(
                "unit registration needs at least one file".to_string(),
            ));
        }
        if let Some(missing) = uploads.iter().find(|u| !u.file.exists()) {
            return Err(ApiError::MissingFile(missing.file.clone()));
        }

        let mut parts = Vec::with_capacity(uploads.len() * 3);
        for (i, upload) in uploads.iter().enumerate() {
            let file_name = basename(&upload.file)?;
            let data = std::fs::read(&upload.file).map_err(|source| ApiError::Io {
                path: upload.file.clone(),
                source,
            })?;
            parts.push(FormPart::file("files", file_name, data));
            if let Some(name) = &upload.unit_name {
                parts.push(FormPart::text(format!("unitName[{i}]"), name.as_str()));
            }
            if let Some(department) = &upload.department_id {
                parts.push(FormPart::text(format!("departmentId[{i}]"), department.as_str()));
            }
        }

        // content-type (with its boundary) is set by the transport.
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!(
                "{}/workflows/{}/units",
                self.base_url,
                urlencoding::encode(workflow_id)
            ),
            headers: vec![(API_KEY_HEADER.to_string(), self.api_key.clone())],
            body: Some(Body::Multipart(parts)),
        })
    }

    pub fn build_search_units(&self, search: &UnitSearch) -> HttpRequest {
        let query = encode_query(&search.query_pairs());
        self.get(format!("{}/units{query}", self.base_url))
    }

    pub fn build_download_csv(&self, unit_id: &str) -> HttpRequest {
        self.get(format!(
            "{}/units/{}/csv",
            self.base_url,
            urlencoding::encode(unit_id)
        ))
    }

    pub fn parse_get_workflow_configuration(
        &self,
        response: HttpResponse,
    ) -> Result<WorkflowConfiguration, ApiError> {
        parse_json(&response)
    }

    pub fn parse_search_workflows(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<WorkflowSummary>, ApiError> {
        parse_json::<WorkflowList>(&response).map(|list| list.workflows)
    }

    pub fn parse_register_unit(&self, response: HttpResponse) -> Result<RegisteredUnit, ApiError> {
        parse_json(&response)
    }

    pub fn parse_search_units(&self, response: HttpResponse) -> Result<Vec<UnitRecord>, ApiError> {
        parse_json::<UnitList>(&response).map(|list| list.units)
    }

    /// The CSV comes back untouched; its encoding follows the workflow's
    /// output character code.
    pub fn parse_download_csv(&self, response: HttpResponse) -> Result<Vec<u8>, ApiError> {
        check_status(&response)?;
        Ok(response.body)
    }

    fn get(&self, url: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: vec![(API_KEY_HEADER.to_string(), self.api_key.clone())],
            body: None,
        }
    }
}

fn basename(path: &Path) -> Result<&str, ApiError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ApiError::InvalidArgument(format!("no usable file name in {}", path.display()))
        })
}

/// `?k=v&...` with URL-encoded values, or an empty string for no pairs.
fn encode_query(pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{joined}")
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(ApiError::from_remote(response.status, &response.body))
}

fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
