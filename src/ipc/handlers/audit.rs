use crate::db;
use crate::ipc::helpers::{get_nonempty_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

const DEFAULT_FEED_LIMIT: i64 = 20;
const MAX_FEED_LIMIT: i64 = 200;

fn audit_append(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let action = get_nonempty_str(params, "action")?;
    let user_email = get_nonempty_str(params, "userEmail")?;

    conn.execute(
        "INSERT INTO audit_log(created_at, user_email, action) VALUES(?, ?, ?)",
        (db::now_utc_iso(), &user_email, &action),
    )
    .map_err(|e| {
        HandlerErr::with_details(
            "db_insert_failed",
            e.to_string(),
            json!({ "table": "audit_log" }),
        )
    })?;

    let entry_id = conn.last_insert_rowid();
    Ok(json!({ "entryId": entry_id }))
}

fn audit_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_i64())
        .unwrap_or(DEFAULT_FEED_LIMIT)
        .clamp(1, MAX_FEED_LIMIT);

    let mut stmt = conn
        .prepare(
            "SELECT id, created_at, user_email, action
             FROM audit_log
             ORDER BY id DESC
             LIMIT ?",
        )
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let entries = stmt
        .query_map([limit], |r| {
            Ok(json!({
                "id": r.get::<_, i64>(0)?,
                "createdAt": r.get::<_, String>(1)?,
                "userEmail": r.get::<_, String>(2)?,
                "action": r.get::<_, String>(3)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    Ok(json!({ "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "audit.append" => Some(with_db(state, req, audit_append)),
        "audit.list" => Some(with_db(state, req, audit_list)),
        _ => None,
    }
}
