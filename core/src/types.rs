//! Typed records for the DX Suite endpoints.
//!
//! # Design
//! Each endpoint gets an explicit record. Unknown fields in responses are
//! ignored, and fields the service does not always send are `Option` so a
//! sparse body still parses. Field names follow the service's camelCase.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A workflow id plus a revision, which the service numbers from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRef {
    workflow_id: String,
    revision: u32,
}

impl WorkflowRef {
    pub fn new(workflow_id: impl Into<String>, revision: u32) -> Result<Self, ApiError> {
        if revision == 0 {
            return Err(ApiError::InvalidArgument(
                "workflow revision must be 1 or greater".to_string(),
            ));
        }
        Ok(Self {
            workflow_id: workflow_id.into(),
            revision,
        })
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }
}

/// Response of the workflow configuration endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfiguration {
    pub workflow_id: String,
    pub revision: u32,
    #[serde(default)]
    pub application_type: Option<i64>,
    #[serde(default)]
    pub ocr_kind_type: Option<i64>,
    #[serde(default)]
    pub atypical_model_name: Option<serde_json::Value>,
    #[serde(default)]
    pub data_check: Option<bool>,
    #[serde(default)]
    pub data_processing: Option<bool>,
    #[serde(default, alias = "outputcharCode")]
    pub output_char_code: Option<String>,
}

/// One hit of the workflow search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub workflow_id: String,
    pub folder_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowList {
    #[serde(default)]
    pub workflows: Vec<WorkflowSummary>,
}

/// A file to submit in a unit registration, with its optional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitUpload {
    pub file: PathBuf,
    pub unit_name: Option<String>,
    pub department_id: Option<String>,
}

impl UnitUpload {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            unit_name: None,
            department_id: None,
        }
    }

    pub fn unit_name(mut self, name: impl Into<String>) -> Self {
        self.unit_name = Some(name.into());
        self
    }

    pub fn department_id(mut self, id: impl Into<String>) -> Self {
        self.department_id = Some(id.into());
        self
    }
}

/// Acknowledgment returned by unit registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUnit {
    pub unit_id: String,
    #[serde(default)]
    pub unit_name: Option<String>,
}

/// Filters for the unit search endpoint. Every field is optional and absent
/// fields are left out of the query string; the server ANDs the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitSearch {
    pub folder_id: Option<String>,
    pub workflow_id: Option<String>,
    pub unit_id: Option<String>,
    pub unit_name: Option<String>,
    pub status: Option<i32>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

impl UnitSearch {
    /// Query pairs in the order the service documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.folder_id {
            pairs.push(("folderId", v.clone()));
        }
        if let Some(v) = &self.workflow_id {
            pairs.push(("workflowId", v.clone()));
        }
        if let Some(v) = &self.unit_id {
            pairs.push(("unitId", v.clone()));
        }
        if let Some(v) = &self.unit_name {
            pairs.push(("unitName", v.clone()));
        }
        if let Some(v) = self.status {
            pairs.push(("status", v.to_string()));
        }
        if let Some(v) = self.created_from {
            pairs.push(("createdFrom", v.format("%Y-%m-%d").to_string()));
        }
        if let Some(v) = self.created_to {
            pairs.push(("createdTo", v.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

/// Status record of one unit. The status codes are passed through as the
/// server reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub unit_id: String,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub data_processing_status: Option<i32>,
    #[serde(default, alias = "daatCheckStatus")]
    pub data_check_status: Option<i32>,
    #[serde(default)]
    pub data_compare_status: Option<i32>,
    #[serde(default)]
    pub csv_download_status: Option<i32>,
    #[serde(default)]
    pub csv_file_name: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnitList {
    #[serde(default)]
    pub units: Vec<UnitRecord>,
}
