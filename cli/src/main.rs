//! `dxsuite`: command-line access to the DX Suite standard API.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dxsuite_core::{
    load_credentials, select_credential, BlockingClient, DxSuiteClient, ReqwestTransport,
    UnitSearch, UnitUpload, WorkflowRef,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "dxsuite", about = "DX Suite standard API client", version)]
struct Cli {
    /// JSON file holding an array of credentials
    #[arg(long, env = "DXSUITE_AUTH_FILE", default_value = "./Auth.json")]
    auth_file: PathBuf,

    /// Credential to use: account id, or zero-based position in the file
    /// when no account has that id
    #[arg(long, default_value = "0")]
    account: String,

    /// Override the tenant URL derived from the credential's domain
    #[arg(long, env = "DXSUITE_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the configuration of one workflow revision
    WorkflowConfig { workflow_id: String, revision: u32 },
    /// Find workflows in a folder by exact name
    SearchWorkflows { folder_id: String, name: String },
    /// Submit image files as one unit
    RegisterUnit {
        workflow_id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        unit_name: Option<String>,
        #[arg(long)]
        department_id: Option<String>,
    },
    /// List units matching every given filter
    SearchUnits {
        #[arg(long)]
        folder_id: Option<String>,
        #[arg(long)]
        workflow_id: Option<String>,
        #[arg(long)]
        unit_id: Option<String>,
        #[arg(long)]
        unit_name: Option<String>,
        #[arg(long)]
        status: Option<i32>,
        /// YYYY-MM-DD
        #[arg(long)]
        created_from: Option<NaiveDate>,
        /// YYYY-MM-DD
        #[arg(long)]
        created_to: Option<NaiveDate>,
    },
    /// Fetch the CSV result of a finished unit
    DownloadCsv {
        unit_id: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Metadata given on the command line applies to the first file; the
/// service names the unit after it.
fn uploads(files: Vec<PathBuf>, unit_name: Option<String>, department_id: Option<String>) -> Vec<UnitUpload> {
    files
        .into_iter()
        .enumerate()
        .map(|(i, file)| {
            let mut upload = UnitUpload::new(file);
            if i == 0 {
                upload.unit_name = unit_name.clone();
                upload.department_id = department_id.clone();
            }
            upload
        })
        .collect()
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let credentials = load_credentials(&cli.auth_file)
        .with_context(|| format!("Failed to load credentials from {}", cli.auth_file.display()))?;
    let credential = select_credential(&credentials, &cli.account)
        .with_context(|| format!("No credential matches account {}", cli.account))?;

    let client = match &cli.base_url {
        Some(url) => DxSuiteClient::with_base_url(credential, url),
        None => DxSuiteClient::new(credential),
    };
    tracing::debug!(base_url = client.base_url(), account = %credential.id, "client ready");
    let api = BlockingClient::with_transport(client, ReqwestTransport::new()?);

    match cli.command {
        Command::WorkflowConfig {
            workflow_id,
            revision,
        } => {
            let workflow = WorkflowRef::new(workflow_id, revision)?;
            print_json(&api.get_workflow_configuration(&workflow)?)?;
        }
        Command::SearchWorkflows { folder_id, name } => {
            print_json(&api.search_workflows(&folder_id, &name)?)?;
        }
        Command::RegisterUnit {
            workflow_id,
            files,
            unit_name,
            department_id,
        } => {
            let uploads = uploads(files, unit_name, department_id);
            let registered = api.register_unit(&workflow_id, &uploads)?;
            tracing::info!(unit_id = %registered.unit_id, "unit registered");
            print_json(&registered)?;
        }
        Command::SearchUnits {
            folder_id,
            workflow_id,
            unit_id,
            unit_name,
            status,
            created_from,
            created_to,
        } => {
            let search = UnitSearch {
                folder_id,
                workflow_id,
                unit_id,
                unit_name,
                status,
                created_from,
                created_to,
            };
            print_json(&api.search_units(&search)?)?;
        }
        Command::DownloadCsv { unit_id, output } => {
            let csv = api.download_csv(&unit_id)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), bytes = csv.len(), "csv saved");
                }
                None => std::io::stdout().write_all(&csv)?,
            }
        }
    }
    Ok(())
}
