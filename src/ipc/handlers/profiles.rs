use crate::db;
use crate::ipc::helpers::{
    get_nonempty_str, get_optional_str, get_required_str, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

const ROLE_TEACHER: &str = "teacher";
const ROLE_PARENT: &str = "parent";

fn validate_role(raw: &str) -> Result<String, HandlerErr> {
    let role = raw.trim().to_lowercase();
    if role == ROLE_TEACHER || role == ROLE_PARENT {
        Ok(role)
    } else {
        Err(HandlerErr::new(
            "bad_params",
            format!("role must be teacher or parent, got {}", raw),
        ))
    }
}

fn admin_email(conn: &Connection) -> Result<Option<String>, HandlerErr> {
    db::settings_get(conn, "admin_email")
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))
}

fn profiles_list(
    conn: &Connection,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let admin = admin_email(conn)?;
    let mut stmt = conn
        .prepare("SELECT id, full_name, email, role FROM profiles ORDER BY full_name")
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let profiles = stmt
        .query_map([], |r| {
            let id: String = r.get(0)?;
            let full_name: String = r.get(1)?;
            let email: String = r.get(2)?;
            let role: String = r.get(3)?;
            Ok((id, full_name, email, role))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    let profiles_json: Vec<serde_json::Value> = profiles
        .into_iter()
        .map(|(id, full_name, email, role)| {
            // Client-side convenience only; authorization stays with the
            // storage layer's policies.
            let is_super_admin = admin.as_deref() == Some(email.as_str());
            json!({
                "id": id,
                "fullName": full_name,
                "email": email,
                "role": role,
                "isSuperAdmin": is_super_admin
            })
        })
        .collect();

    Ok(json!({ "profiles": profiles_json }))
}

fn profiles_upsert(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let full_name = get_nonempty_str(params, "fullName")?;
    let email = get_nonempty_str(params, "email")?;
    let role = validate_role(&get_required_str(params, "role")?)?;
    let profile_id = get_optional_str(params, "id").unwrap_or_else(|| Uuid::new_v4().to_string());

    conn.execute(
        "INSERT INTO profiles(id, full_name, email, role)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           full_name = excluded.full_name,
           email = excluded.email,
           role = excluded.role",
        (&profile_id, &full_name, &email, &role),
    )
    .map_err(|e| {
        HandlerErr::with_details("db_update_failed", e.to_string(), json!({ "table": "profiles" }))
    })?;

    Ok(json!({ "profileId": profile_id, "role": role }))
}

fn profiles_set_role(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let profile_id = get_required_str(params, "profileId")?;
    let role = validate_role(&get_required_str(params, "role")?)?;

    let exists = conn
        .query_row("SELECT 1 FROM profiles WHERE id = ?", [&profile_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?
        .is_some();
    if !exists {
        return Err(HandlerErr::new("not_found", "profile not found"));
    }

    conn.execute(
        "UPDATE profiles SET role = ? WHERE id = ?",
        (&role, &profile_id),
    )
    .map_err(|e| {
        HandlerErr::with_details("db_update_failed", e.to_string(), json!({ "table": "profiles" }))
    })?;

    Ok(json!({ "ok": true, "profileId": profile_id, "role": role }))
}

fn profiles_set_admin_email(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let email = get_nonempty_str(params, "email")?;
    db::settings_set(conn, "admin_email", &email)
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    Ok(json!({ "ok": true, "email": email }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "profiles.list" => Some(with_db(state, req, profiles_list)),
        "profiles.upsert" => Some(with_db(state, req, profiles_upsert)),
        "profiles.setRole" => Some(with_db(state, req, profiles_set_role)),
        "profiles.setAdminEmail" => Some(with_db(state, req, profiles_set_admin_email)),
        _ => None,
    }
}
