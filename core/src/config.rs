//! Credentials and the credential file.
//!
//! The credential file is a JSON array of account objects:
//!
//! ```json
//! [{"id": 1, "key": "...", "domain": "acme",
//!   "registerDate": "2023-04-01", "expirationDate": "2024-03-31"}]
//! ```
//!
//! A `Credential` is loaded once and handed to `DxSuiteClient::new` by
//! reference; nothing here is global.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Path segment shared by every endpoint of the standard API.
pub const API_PATH: &str = "/wf/api/standard/v2";

/// Account id as it appears in the credential file, either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountId {
    Number(u64),
    Text(String),
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountId::Number(n) => write!(f, "{n}"),
            AccountId::Text(s) => f.write_str(s),
        }
    }
}

/// One DX Suite account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: AccountId,
    pub key: String,
    pub domain: String,
    #[serde(default)]
    pub register_date: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

impl Credential {
    /// `https://{domain}.dx-suite.com/wf/api/standard/v2`
    pub fn base_url(&self) -> String {
        format!("https://{}.dx-suite.com{API_PATH}", self.domain)
    }
}

// Keeps the api key out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .field("domain", &self.domain)
            .field("register_date", &self.register_date)
            .field("expiration_date", &self.expiration_date)
            .finish()
    }
}

/// Parse a credential file's contents. An empty array is rejected.
pub fn parse_credentials(raw: &str) -> Result<Vec<Credential>, ApiError> {
    let credentials: Vec<Credential> =
        serde_json::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))?;
    if credentials.is_empty() {
        return Err(ApiError::Config("no credentials defined".to_string()));
    }
    Ok(credentials)
}

/// Read and parse the credential file at `path`.
pub fn load_credentials(path: impl AsRef<Path>) -> Result<Vec<Credential>, ApiError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ApiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let credentials = parse_credentials(&raw)?;
    tracing::debug!(
        path = %path.display(),
        count = credentials.len(),
        "loaded credentials"
    );
    Ok(credentials)
}

/// Pick a credential by account id. A selector that matches no id falls
/// back to a zero-based position in the file.
pub fn select_credential<'a>(
    credentials: &'a [Credential],
    selector: &str,
) -> Option<&'a Credential> {
    credentials
        .iter()
        .find(|c| c.id.to_string() == selector)
        .or_else(|| {
            selector
                .parse::<usize>()
                .ok()
                .and_then(|index| credentials.get(index))
        })
}
