use crate::ipc::helpers::{
    get_optional_date, get_optional_str, get_required_str, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::recap::{
    self, AttendanceEntry, AttendanceStatus, DateInterval, RosterEntry,
};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

/// Recap scope comes either as a whole month key or an explicit closed
/// from/to pair.
pub(super) fn interval_from_params(
    params: &serde_json::Value,
) -> Result<DateInterval, HandlerErr> {
    if let Some(month) = get_optional_str(params, "month") {
        return recap::month_interval(&month)
            .ok_or_else(|| HandlerErr::new("bad_params", "month must be YYYY-MM"));
    }
    let from = get_optional_date(params, "from")?;
    let to = get_optional_date(params, "to")?;
    match (from, to) {
        (Some(start), Some(end)) if start <= end => Ok(DateInterval { start, end }),
        (Some(_), Some(_)) => Err(HandlerErr::new("bad_params", "from must not be after to")),
        _ => Err(HandlerErr::new(
            "bad_params",
            "missing month or from/to interval",
        )),
    }
}

fn load_students(
    conn: &Connection,
    class_filter: Option<&str>,
) -> Result<Vec<RosterEntry>, HandlerErr> {
    let mut sql = String::from("SELECT id, full_name, class_name FROM students");
    if class_filter.is_some() {
        sql.push_str(" WHERE class_name = ?");
    }
    sql.push_str(" ORDER BY class_name, full_name");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    fn map_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<RosterEntry> {
        Ok(RosterEntry {
            id: r.get(0)?,
            full_name: r.get(1)?,
            class_name: r.get(2)?,
        })
    }
    let rows = if let Some(class_name) = class_filter {
        stmt.query_map([class_name], map_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    } else {
        stmt.query_map([], map_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    };
    rows.map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))
}

fn entry_from_parts(
    student_id: String,
    date_raw: String,
    lesson_hour: i64,
    status_raw: String,
) -> Option<AttendanceEntry> {
    // Tolerate rows written by older shells; anything unreadable simply
    // does not count.
    let date = NaiveDate::parse_from_str(date_raw.trim(), "%Y-%m-%d").ok()?;
    let status = AttendanceStatus::parse(&status_raw)?;
    Some(AttendanceEntry {
        student_id,
        date,
        lesson_hour,
        status,
    })
}

fn load_all_entries(conn: &Connection) -> Result<Vec<AttendanceEntry>, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT student_id, date, lesson_hour, status FROM attendance")
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, String>(3)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    Ok(rows
        .into_iter()
        .filter_map(|(sid, date, hour, status)| entry_from_parts(sid, date, hour, status))
        .collect())
}

fn load_student_entries(
    conn: &Connection,
    student_id: &str,
) -> Result<Vec<AttendanceEntry>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT student_id, date, lesson_hour, status
             FROM attendance WHERE student_id = ?",
        )
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, String>(3)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    Ok(rows
        .into_iter()
        .filter_map(|(sid, date, hour, status)| entry_from_parts(sid, date, hour, status))
        .collect())
}

/// Loads and aggregates recap rows for the given scope. Shared by the
/// interactive recap view and both report exports so every surface reports
/// identical numbers.
pub(super) fn load_recap_rows(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<(DateInterval, Vec<recap::RecapRow>), HandlerErr> {
    let interval = interval_from_params(params)?;
    let class_filter = get_optional_str(params, "className");
    let students = load_students(conn, class_filter.as_deref())?;
    let records = load_all_entries(conn)?;
    let rows = recap::class_recap(&students, &records, interval, class_filter.as_deref());
    Ok((interval, rows))
}

fn recap_row_json(row: &recap::RecapRow) -> serde_json::Value {
    let tier = recap::classify_presence(row.presence_percentage);
    let mut value = serde_json::to_value(row).unwrap_or_else(|_| json!({}));
    value["tier"] = json!(tier);
    value["tierLabel"] = json!(tier.label());
    value
}

fn recap_class(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (interval, rows) = load_recap_rows(conn, params)?;
    let rows_json: Vec<serde_json::Value> = rows.iter().map(recap_row_json).collect();
    Ok(json!({
        "from": interval.start.format("%Y-%m-%d").to_string(),
        "to": interval.end.format("%Y-%m-%d").to_string(),
        "rows": rows_json
    }))
}

fn recap_student(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let student = conn
        .query_row(
            "SELECT full_name, class_name FROM students WHERE id = ?",
            [&student_id],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let Some((full_name, class_name)) = student else {
        return Err(HandlerErr::new("not_found", "student not found"));
    };

    let interval = match (
        get_optional_date(params, "from")?,
        get_optional_date(params, "to")?,
    ) {
        (Some(start), Some(end)) if start <= end => Some(DateInterval { start, end }),
        (Some(_), Some(_)) => {
            return Err(HandlerErr::new("bad_params", "from must not be after to"))
        }
        (None, None) => None,
        _ => {
            return Err(HandlerErr::new(
                "bad_params",
                "from and to must be given together",
            ))
        }
    };

    let records = load_student_entries(conn, &student_id)?;
    let stats = recap::student_recap(&records, interval);
    let tier = recap::classify_presence(stats.presence_percentage);

    let recent_limit = params
        .get("recentLimit")
        .and_then(|v| v.as_u64())
        .unwrap_or(7) as i64;
    let mut stmt = conn
        .prepare(
            "SELECT date, lesson_hour, status
             FROM attendance
             WHERE student_id = ?
             ORDER BY date DESC, lesson_hour DESC
             LIMIT ?",
        )
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let recent = stmt
        .query_map((&student_id, recent_limit), |r| {
            Ok(json!({
                "date": r.get::<_, String>(0)?,
                "lessonHour": r.get::<_, i64>(1)?,
                "status": r.get::<_, String>(2)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    Ok(json!({
        "studentId": student_id,
        "fullName": full_name,
        "className": class_name,
        "stats": stats,
        "tier": tier,
        "tierLabel": tier.label(),
        "recent": recent
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "recap.class" => Some(with_db(state, req, recap_class)),
        "recap.student" => Some(with_db(state, req, recap_student)),
        _ => None,
    }
}
