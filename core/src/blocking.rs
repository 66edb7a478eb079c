//! One-call-per-endpoint facade over `DxSuiteClient` and a `Transport`.

use tracing::debug;

use crate::client::DxSuiteClient;
use crate::config::Credential;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    RegisteredUnit, UnitRecord, UnitSearch, UnitUpload, WorkflowConfiguration, WorkflowRef,
    WorkflowSummary,
};

/// Synchronous client: builds the request, runs it, parses the response.
/// One request is in flight at a time.
#[derive(Debug, Clone)]
pub struct BlockingClient<T = ReqwestTransport> {
    client: DxSuiteClient,
    transport: T,
}

impl BlockingClient<ReqwestTransport> {
    pub fn new(credential: &Credential) -> Result<Self, ApiError> {
        Ok(Self::with_transport(
            DxSuiteClient::new(credential),
            ReqwestTransport::new()?,
        ))
    }
}

impl<T: Transport> BlockingClient<T> {
    pub fn with_transport(client: DxSuiteClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &DxSuiteClient {
        &self.client
    }

    pub fn get_workflow_configuration(
        &self,
        workflow: &WorkflowRef,
    ) -> Result<WorkflowConfiguration, ApiError> {
        let response = self.send(self.client.build_get_workflow_configuration(workflow))?;
        self.client.parse_get_workflow_configuration(response)
    }

    pub fn search_workflows(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Vec<WorkflowSummary>, ApiError> {
        let response = self.send(self.client.build_search_workflows(folder_id, name))?;
        self.client.parse_search_workflows(response)
    }

    /// Local checks (missing files, empty list) fail before anything is sent.
    pub fn register_unit(
        &self,
        workflow_id: &str,
        uploads: &[UnitUpload],
    ) -> Result<RegisteredUnit, ApiError> {
        let request = self.client.build_register_unit(workflow_id, uploads)?;
        let response = self.send(request)?;
        self.client.parse_register_unit(response)
    }

    pub fn search_units(&self, search: &UnitSearch) -> Result<Vec<UnitRecord>, ApiError> {
        let response = self.send(self.client.build_search_units(search))?;
        self.client.parse_search_units(response)
    }

    pub fn download_csv(&self, unit_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.send(self.client.build_download_csv(unit_id))?;
        self.client.parse_download_csv(response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method.as_str();
        let url = request.url.clone();
        debug!(method, url = %url, "sending request");
        let response = self.transport.execute(request)?;
        debug!(
            method,
            url = %url,
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );
        Ok(response)
    }
}
