use crate::ipc::helpers::{
    get_nonempty_str, get_optional_str, get_required_date, get_required_str, get_required_u64,
    with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::recap::AttendanceStatus;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

fn require_lesson_hour(params: &serde_json::Value) -> Result<i64, HandlerErr> {
    let hour = get_required_u64(params, "lessonHour")? as i64;
    if hour < 1 {
        return Err(HandlerErr::new(
            "bad_params",
            "lessonHour must be a positive integer",
        ));
    }
    Ok(hour)
}

fn require_status(raw: &str) -> Result<AttendanceStatus, HandlerErr> {
    AttendanceStatus::parse(raw).ok_or_else(|| {
        HandlerErr::new("invalid_status", format!("unknown attendance status: {}", raw))
    })
}

/// Entry sheet for one class at one (date, lesson hour): the roster with any
/// saved statuses merged in, unmarked students defaulting to Hadir.
fn attendance_sheet_open(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_name = get_nonempty_str(params, "className")?;
    let date = get_required_date(params, "date")?;
    let lesson_hour = require_lesson_hour(params)?;
    let date_str = date.format("%Y-%m-%d").to_string();

    let mut stmt = conn
        .prepare(
            "SELECT id, full_name FROM students
             WHERE class_name = ?
             ORDER BY full_name",
        )
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let students = stmt
        .query_map([&class_name], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    let mut saved: HashMap<String, String> = HashMap::new();
    let mut stmt = conn
        .prepare(
            "SELECT a.student_id, a.status
             FROM attendance a
             JOIN students s ON s.id = a.student_id
             WHERE s.class_name = ? AND a.date = ? AND a.lesson_hour = ?",
        )
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let rows = stmt
        .query_map((&class_name, &date_str, lesson_hour), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    for (student_id, status) in rows {
        saved.insert(student_id, status);
    }

    let rows_json: Vec<serde_json::Value> = students
        .iter()
        .map(|(id, full_name)| {
            let status = saved
                .get(id)
                .cloned()
                .unwrap_or_else(|| AttendanceStatus::Present.as_str().to_string());
            json!({
                "studentId": id,
                "fullName": full_name,
                "status": status
            })
        })
        .collect();

    Ok(json!({
        "className": class_name,
        "date": date_str,
        "lessonHour": lesson_hour,
        "rows": rows_json
    }))
}

/// Transactional bulk upsert of one class sheet, keyed by
/// (student, date, lesson hour). Saving again for the same key replaces the
/// status wholesale; entries for unknown students are skipped.
fn attendance_save(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let lesson_hour = require_lesson_hour(params)?;
    let taken_by = get_optional_str(params, "takenBy");
    let date_str = date.format("%Y-%m-%d").to_string();

    let Some(entries) = params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing entries"));
    };

    // Validate everything before touching the database.
    let mut parsed: Vec<(String, AttendanceStatus)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let student_id = get_required_str(entry, "studentId")?;
        let status_raw = get_required_str(entry, "status")?;
        parsed.push((student_id, require_status(&status_raw)?));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let mut saved = 0usize;
    for (student_id, status) in parsed {
        let exists = tx
            .query_row("SELECT 1 FROM students WHERE id = ?", [&student_id], |r| {
                r.get::<_, i64>(0)
            })
            .optional()
            .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?
            .is_some();
        if !exists {
            continue;
        }
        tx.execute(
            "INSERT INTO attendance(id, student_id, date, lesson_hour, status, taken_by)
             VALUES(?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id, date, lesson_hour) DO UPDATE SET
               status = excluded.status,
               taken_by = excluded.taken_by",
            (
                Uuid::new_v4().to_string(),
                &student_id,
                &date_str,
                lesson_hour,
                status.as_str(),
                &taken_by,
            ),
        )
        .map_err(|e| {
            HandlerErr::with_details(
                "db_update_failed",
                e.to_string(),
                json!({ "table": "attendance" }),
            )
        })?;
        saved += 1;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;

    Ok(json!({ "saved": saved, "date": date_str, "lessonHour": lesson_hour }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.sheetOpen" => Some(with_db(state, req, attendance_sheet_open)),
        "attendance.save" => Some(with_db(state, req, attendance_save)),
        _ => None,
    }
}
