use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One request line from the shell: `{"id", "method", "params"}`.
/// Methods are dotted family names (`students.import`, `recap.class`, ...).
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Session state: the selected attendance workspace and its open database.
/// Both stay None until `workspace.select` succeeds.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}
