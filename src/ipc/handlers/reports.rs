use crate::export;
use crate::ipc::helpers::{get_optional_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;

use super::recap::load_recap_rows;

const DEFAULT_TABLE_TITLE: &str = "Rekapitulasi Absensi Siswa";

/// Sheet-form recap export. Always returns headers plus aligned records;
/// when outPath is given the same rows are also written as CSV for the
/// download sink.
fn reports_recap_sheet(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (interval, rows) = load_recap_rows(conn, params)?;
    let records = export::recap_sheet_records(&rows);

    let out_path = get_optional_str(params, "outPath");
    if let Some(path) = &out_path {
        export::write_recap_csv(&PathBuf::from(path), &rows).map_err(|e| {
            HandlerErr::with_details("io_failed", e.to_string(), json!({ "path": path }))
        })?;
    }

    Ok(json!({
        "from": interval.start.format("%Y-%m-%d").to_string(),
        "to": interval.end.format("%Y-%m-%d").to_string(),
        "headers": export::SHEET_HEADERS,
        "records": records,
        "rowCount": rows.len(),
        "outPath": out_path
    }))
}

/// Table-form recap export for the paginated document renderer. Same rows as
/// the sheet form; only the percentage cell differs, gaining its "%" suffix.
fn reports_recap_table(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (interval, rows) = load_recap_rows(conn, params)?;
    let title =
        get_optional_str(params, "title").unwrap_or_else(|| DEFAULT_TABLE_TITLE.to_string());

    Ok(json!({
        "title": title,
        "from": interval.start.format("%Y-%m-%d").to_string(),
        "to": interval.end.format("%Y-%m-%d").to_string(),
        "headers": export::TABLE_HEADERS,
        "body": export::recap_table_body(&rows),
        "rowCount": rows.len()
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.recapSheet" => Some(with_db(state, req, reports_recap_sheet)),
        "reports.recapTable" => Some(with_db(state, req, reports_recap_table)),
        _ => None,
    }
}
