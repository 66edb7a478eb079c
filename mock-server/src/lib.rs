//! In-memory stand-in for the DX Suite standard API (v2).
//!
//! Serves the five client endpoints under `/wf/api/standard/v2`, checks the
//! `apikey` header, and answers failures with the service's
//! `{"errors":[{"errorCode","message"}]}` body. Units never finish on their
//! own: `POST /_mock/units/{unitId}/complete` marks one as processed so its
//! CSV becomes downloadable.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_PATH: &str = "/wf/api/standard/v2";
pub const DEFAULT_API_KEY: &str = "mock-api-key";

// Status codes reported for units. The real service uses its own table;
// these only need to differ between "in progress" and "done".
pub const STATUS_IN_PROGRESS: i32 = 1;
pub const STATUS_DONE: i32 = 2;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub workflow_id: String,
    pub folder_id: String,
    pub name: String,
    #[serde(skip)]
    pub latest_revision: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub unit_id: String,
    pub unit_name: String,
    pub status: i32,
    pub data_processing_status: i32,
    pub data_check_status: i32,
    pub data_compare_status: i32,
    pub csv_download_status: i32,
    pub csv_file_name: Option<String>,
    pub folder_id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub created_at: String,
    #[serde(skip)]
    pub files: Vec<String>,
    #[serde(skip)]
    pub department_ids: Vec<Option<String>>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub error_code: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub errors: Vec<ErrorEntry>,
}

type Failure = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, code: &str, message: impl Into<String>) -> Failure {
    (
        status,
        Json(ErrorBody {
            errors: vec![ErrorEntry {
                error_code: code.to_string(),
                message: message.into(),
            }],
        }),
    )
}

pub type Db = Arc<RwLock<HashMap<String, Unit>>>;

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    workflows: Arc<Vec<Workflow>>,
    units: Db,
}

/// Workflows every mock instance starts with.
pub fn seed_workflows() -> Vec<Workflow> {
    vec![
        Workflow {
            workflow_id: "b3cc8d27-6fdc-4509-944b-686bec461974".to_string(),
            folder_id: "folder-1".to_string(),
            name: "請求書".to_string(),
            latest_revision: 1,
        },
        Workflow {
            workflow_id: "5f0e6a52-2d7b-4c4e-9f57-0c1d2b8e7a10".to_string(),
            folder_id: "folder-1".to_string(),
            name: "receipts".to_string(),
            latest_revision: 3,
        },
        Workflow {
            workflow_id: "9a4c1e7d-8b3f-4d2a-a6e5-3f7b9c0d1e22".to_string(),
            folder_id: "folder-2".to_string(),
            name: "receipts".to_string(),
            latest_revision: 1,
        },
    ]
}

pub fn app() -> Router {
    app_with_key(DEFAULT_API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        workflows: Arc::new(seed_workflows()),
        units: Arc::new(RwLock::new(HashMap::new())),
    };
    let api = Router::new()
        .route(
            "/workflows/{workflow_id}/revisions/{revision}/configuration",
            get(get_configuration),
        )
        .route("/workflows", get(search_workflows))
        .route("/workflows/{workflow_id}/units", post(register_unit))
        .route("/units", get(search_units))
        .route("/units/{unit_id}/csv", get(download_csv));

    Router::new()
        .nest(API_PATH, api)
        .route("/_mock/units/{unit_id}/complete", post(complete_unit))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_key(listener, DEFAULT_API_KEY).await
}

pub async fn run_with_key(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_key(api_key)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let presented = headers.get("apikey").and_then(|v| v.to_str().ok());
    if presented == Some(&*state.api_key) {
        return Ok(());
    }
    Err(failure(
        StatusCode::UNAUTHORIZED,
        "E40100",
        "apikey is missing or invalid",
    ))
}

fn find_workflow<'a>(state: &'a AppState, workflow_id: &str) -> Result<&'a Workflow, Failure> {
    state
        .workflows
        .iter()
        .find(|w| w.workflow_id == workflow_id)
        .ok_or_else(|| {
            failure(
                StatusCode::NOT_FOUND,
                "E40400",
                format!("workflow {workflow_id} not found"),
            )
        })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Configuration {
    workflow_id: String,
    revision: u32,
    application_type: i64,
    ocr_kind_type: i64,
    atypical_model_name: Option<String>,
    data_check: bool,
    data_processing: bool,
    output_char_code: String,
}

async fn get_configuration(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((workflow_id, revision)): Path<(String, u32)>,
) -> Result<Json<Configuration>, Failure> {
    authorize(&state, &headers)?;
    let workflow = find_workflow(&state, &workflow_id)?;
    if revision == 0 || revision > workflow.latest_revision {
        return Err(failure(
            StatusCode::NOT_FOUND,
            "E40401",
            format!("revision {revision} not found"),
        ));
    }
    Ok(Json(Configuration {
        workflow_id: workflow.workflow_id.clone(),
        revision,
        application_type: 1,
        ocr_kind_type: 2,
        atypical_model_name: None,
        data_check: revision > 1,
        data_processing: true,
        output_char_code: "UTF-8".to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowQuery {
    folder_id: Option<String>,
    search_name: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct WorkflowList {
    pub workflows: Vec<Workflow>,
}

async fn search_workflows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WorkflowQuery>,
) -> Result<Json<WorkflowList>, Failure> {
    authorize(&state, &headers)?;
    let workflows = state
        .workflows
        .iter()
        .filter(|w| query.folder_id.as_ref().map_or(true, |f| &w.folder_id == f))
        .filter(|w| query.search_name.as_ref().map_or(true, |n| &w.name == n))
        .cloned()
        .collect();
    Ok(Json(WorkflowList { workflows }))
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub unit_id: String,
    pub unit_name: String,
}

/// Splits `unitName[3]` into `("unitName", 3)`.
fn indexed_field(name: &str) -> Option<(&str, usize)> {
    let (key, rest) = name.split_once('[')?;
    let index = rest.strip_suffix(']')?.parse().ok()?;
    Some((key, index))
}

async fn register_unit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workflow_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Registered>, Failure> {
    authorize(&state, &headers)?;
    let workflow = find_workflow(&state, &workflow_id)?.clone();

    let mut files = Vec::new();
    let mut unit_names: HashMap<usize, String> = HashMap::new();
    let mut department_ids: HashMap<usize, String> = HashMap::new();

    let bad_form = |e: axum::extract::multipart::MultipartError| {
        failure(StatusCode::BAD_REQUEST, "E40002", e.body_text())
    };
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "files" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(bad_form)?;
            if file_name.is_empty() || data.is_empty() {
                return Err(failure(
                    StatusCode::BAD_REQUEST,
                    "E40003",
                    "file part without a name or content",
                ));
            }
            files.push(file_name);
            continue;
        }
        let value = field.text().await.map_err(bad_form)?;
        match indexed_field(&name) {
            Some(("unitName", i)) => {
                unit_names.insert(i, value);
            }
            Some(("departmentId", i)) => {
                department_ids.insert(i, value);
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "E40001", "no files were sent"));
    }

    let unit_name = unit_names
        .get(&0)
        .cloned()
        .unwrap_or_else(|| files[0].clone());
    let unit = Unit {
        unit_id: Uuid::new_v4().to_string(),
        unit_name: unit_name.clone(),
        status: STATUS_IN_PROGRESS,
        data_processing_status: STATUS_IN_PROGRESS,
        data_check_status: STATUS_IN_PROGRESS,
        data_compare_status: STATUS_IN_PROGRESS,
        csv_download_status: STATUS_IN_PROGRESS,
        csv_file_name: None,
        folder_id: workflow.folder_id,
        workflow_id: workflow.workflow_id,
        workflow_name: workflow.name,
        created_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        department_ids: (0..files.len())
            .map(|i| department_ids.get(&i).cloned())
            .collect(),
        files,
    };
    tracing::info!(unit_id = %unit.unit_id, files = unit.files.len(), "registered unit");

    let registered = Registered {
        unit_id: unit.unit_id.clone(),
        unit_name,
    };
    state.units.write().await.insert(unit.unit_id.clone(), unit);
    Ok(Json(registered))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitQuery {
    folder_id: Option<String>,
    workflow_id: Option<String>,
    unit_id: Option<String>,
    unit_name: Option<String>,
    status: Option<i32>,
    created_from: Option<String>,
    created_to: Option<String>,
}

impl UnitQuery {
    fn matches(&self, unit: &Unit) -> bool {
        let day = &unit.created_at[..10];
        self.folder_id.as_ref().map_or(true, |v| &unit.folder_id == v)
            && self.workflow_id.as_ref().map_or(true, |v| &unit.workflow_id == v)
            && self.unit_id.as_ref().map_or(true, |v| &unit.unit_id == v)
            && self.unit_name.as_ref().map_or(true, |v| &unit.unit_name == v)
            && self.status.map_or(true, |v| unit.status == v)
            && self.created_from.as_deref().map_or(true, |v| day >= v)
            && self.created_to.as_deref().map_or(true, |v| day <= v)
    }
}

#[derive(Serialize, Deserialize)]
pub struct UnitList {
    pub units: Vec<Unit>,
}

async fn search_units(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UnitQuery>,
) -> Result<Json<UnitList>, Failure> {
    authorize(&state, &headers)?;
    let units = state.units.read().await;
    let mut found: Vec<Unit> = units.values().filter(|u| query.matches(u)).cloned().collect();
    found.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.unit_id.cmp(&b.unit_id))
    });
    Ok(Json(UnitList { units: found }))
}

fn unit_not_found(unit_id: &str) -> Failure {
    failure(
        StatusCode::NOT_FOUND,
        "E40402",
        format!("unit {unit_id} not found"),
    )
}

async fn download_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(unit_id): Path<String>,
) -> Result<Response, Failure> {
    authorize(&state, &headers)?;
    let units = state.units.read().await;
    let unit = units.get(&unit_id).ok_or_else(|| unit_not_found(&unit_id))?;
    if unit.csv_download_status != STATUS_DONE {
        return Err(failure(
            StatusCode::CONFLICT,
            "E40900",
            format!("csv for unit {unit_id} is not ready"),
        ));
    }

    let csv = unit_csv(unit).map_err(|e| {
        failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "E50000",
            format!("failed to build csv: {e}"),
        )
    })?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

/// One row per file. Fields holding commas, quotes or newlines are quoted.
fn unit_csv(unit: &Unit) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["fileName", "unitName", "departmentId"])?;
    for (file, department) in unit.files.iter().zip(&unit.department_ids) {
        writer.write_record([
            file.as_str(),
            unit.unit_name.as_str(),
            department.as_deref().unwrap_or_default(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

async fn complete_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
) -> Result<Json<Unit>, Failure> {
    let mut units = state.units.write().await;
    let unit = units.get_mut(&unit_id).ok_or_else(|| unit_not_found(&unit_id))?;
    unit.status = STATUS_DONE;
    unit.data_processing_status = STATUS_DONE;
    unit.data_check_status = STATUS_DONE;
    unit.data_compare_status = STATUS_DONE;
    unit.csv_download_status = STATUS_DONE;
    unit.csv_file_name = Some(format!("{unit_id}.csv"));
    Ok(Json(unit.clone()))
}
