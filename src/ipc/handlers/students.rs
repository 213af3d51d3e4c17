use crate::db;
use crate::ipc::helpers::{
    get_nonempty_str, get_optional_str, get_required_str, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, NewStudent};
use crate::sheet;
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use serde_json::json;
use std::path::PathBuf;
use uuid::Uuid;

fn student_exists(conn: &Connection, student_id: &str) -> Result<bool, HandlerErr> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))
}

fn validate_gender(raw: &str) -> Result<String, HandlerErr> {
    let code = raw.trim().to_ascii_uppercase();
    if code == "L" || code == "P" {
        Ok(code)
    } else {
        Err(HandlerErr::new(
            "bad_params",
            format!("gender must be L or P, got {}", raw),
        ))
    }
}

fn student_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    let id: String = row.get(0)?;
    let full_name: String = row.get(1)?;
    let class_name: String = row.get(2)?;
    let gender: Option<String> = row.get(3)?;
    let nisn: Option<String> = row.get(4)?;
    let email: Option<String> = row.get(5)?;
    let parent_id: Option<String> = row.get(6)?;
    Ok(json!({
        "id": id,
        "fullName": full_name,
        "className": class_name,
        "gender": gender,
        "nisn": nisn,
        "email": email,
        "parentId": parent_id
    }))
}

fn students_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut sql = String::from(
        "SELECT id, full_name, class_name, gender, nisn, email, parent_id
         FROM students",
    );
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(class_name) = get_optional_str(params, "className") {
        clauses.push("class_name = ?");
        args.push(Value::Text(class_name));
    }
    if let Some(parent_id) = get_optional_str(params, "parentId") {
        clauses.push("parent_id = ?");
        args.push(Value::Text(parent_id));
    }
    if let Some(search) = get_optional_str(params, "search") {
        clauses.push("LOWER(full_name) LIKE ?");
        args.push(Value::Text(format!("%{}%", search.to_lowercase())));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY class_name, full_name");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let students = stmt
        .query_map(params_from_iter(args), student_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    Ok(json!({ "students": students }))
}

fn students_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let full_name = get_nonempty_str(params, "fullName")?;
    let class_name = get_nonempty_str(params, "className")?;
    let gender = match get_optional_str(params, "gender") {
        Some(raw) => Some(validate_gender(&raw)?),
        None => None,
    };
    let nisn = get_optional_str(params, "nisn");
    let email = get_optional_str(params, "email");
    let parent_id = get_optional_str(params, "parentId");

    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, full_name, class_name, gender, nisn, email, parent_id, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &student_id,
            &full_name,
            &class_name,
            &gender,
            &nisn,
            &email,
            &parent_id,
            db::now_utc_iso(),
        ),
    )
    .map_err(|e| {
        HandlerErr::with_details("db_insert_failed", e.to_string(), json!({ "table": "students" }))
    })?;

    Ok(json!({ "studentId": student_id, "fullName": full_name, "className": class_name }))
}

fn students_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    let patch = params
        .get("patch")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let (mut full_name, mut class_name, mut gender, mut nisn, mut email, mut parent_id) = conn
        .query_row(
            "SELECT full_name, class_name, gender, nisn, email, parent_id
             FROM students WHERE id = ?",
            [&student_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, Option<String>>(5)?,
                ))
            },
        )
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    if patch.get("fullName").is_some() {
        full_name = get_nonempty_str(&patch, "fullName")?;
    }
    if patch.get("className").is_some() {
        class_name = get_nonempty_str(&patch, "className")?;
    }
    if let Some(raw) = patch.get("gender") {
        gender = if raw.is_null() {
            None
        } else {
            Some(validate_gender(raw.as_str().unwrap_or_default())?)
        };
    }
    if let Some(raw) = patch.get("nisn") {
        nisn = raw.as_str().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    }
    if let Some(raw) = patch.get("email") {
        email = raw.as_str().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    }
    if let Some(raw) = patch.get("parentId") {
        parent_id = raw.as_str().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    }

    conn.execute(
        "UPDATE students
         SET full_name = ?, class_name = ?, gender = ?, nisn = ?, email = ?, parent_id = ?, updated_at = ?
         WHERE id = ?",
        (
            &full_name,
            &class_name,
            &gender,
            &nisn,
            &email,
            &parent_id,
            db::now_utc_iso(),
            &student_id,
        ),
    )
    .map_err(|e| {
        HandlerErr::with_details("db_update_failed", e.to_string(), json!({ "table": "students" }))
    })?;

    Ok(json!({ "ok": true, "studentId": student_id }))
}

fn students_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    if !student_exists(conn, &student_id)? {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    // Attendance rows go with the student via ON DELETE CASCADE.
    conn.execute("DELETE FROM students WHERE id = ?", [&student_id])
        .map_err(|e| {
            HandlerErr::with_details(
                "db_delete_failed",
                e.to_string(),
                json!({ "table": "students" }),
            )
        })?;
    Ok(json!({ "ok": true }))
}

fn import_error(e: roster::ImportError) -> HandlerErr {
    // Surface the normalizer's own code so shells can show targeted messages.
    let code = match e.code.as_str() {
        "missing_headers" => "missing_headers",
        "no_valid_rows" => "no_valid_rows",
        _ => "import_invalid",
    };
    HandlerErr::new(code, e.message)
}

fn load_import_rows(params: &serde_json::Value) -> Result<Vec<Vec<String>>, HandlerErr> {
    if let Some(raw) = params.get("rows") {
        return sheet::rows_from_json(raw).ok_or_else(|| {
            HandlerErr::new("bad_params", "rows must be an array of arrays of cells")
        });
    }
    let path = get_nonempty_str(params, "path")
        .map_err(|_| HandlerErr::new("bad_params", "missing rows or path"))?;
    sheet::read_sheet(&PathBuf::from(&path))
        .map_err(|e| HandlerErr::with_details("io_failed", e.to_string(), json!({ "path": path })))
}

fn insert_students(conn: &Connection, students: &[NewStudent]) -> Result<usize, HandlerErr> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    for student in students {
        tx.execute(
            "INSERT INTO students(id, full_name, class_name, gender, nisn, email, parent_id, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, NULL, ?)",
            (
                Uuid::new_v4().to_string(),
                &student.full_name,
                &student.class_name,
                &student.gender,
                &student.nisn,
                &student.email,
                db::now_utc_iso(),
            ),
        )
        .map_err(|e| {
            HandlerErr::with_details(
                "db_insert_failed",
                e.to_string(),
                json!({ "table": "students" }),
            )
        })?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_commit_failed", e.to_string()))?;
    Ok(students.len())
}

fn students_import(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let rows = load_import_rows(params)?;
    let students = roster::normalize_roster(&rows).map_err(import_error)?;
    let imported = insert_students(conn, &students)?;
    Ok(json!({ "imported": imported }))
}

fn students_quick_import(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_name = get_nonempty_str(params, "className")?;
    let rows = load_import_rows(params)?;
    let names: Vec<String> = rows
        .iter()
        .map(|row| row.first().cloned().unwrap_or_default())
        .collect();
    let students = roster::normalize_name_list(&class_name, &names).map_err(import_error)?;
    let imported = insert_students(conn, &students)?;
    Ok(json!({ "imported": imported, "className": class_name }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_db(state, req, students_list)),
        "students.create" => Some(with_db(state, req, students_create)),
        "students.update" => Some(with_db(state, req, students_update)),
        "students.delete" => Some(with_db(state, req, students_delete)),
        "students.import" => Some(with_db(state, req, students_import)),
        "students.quickImport" => Some(with_db(state, req, students_quick_import)),
        _ => None,
    }
}
