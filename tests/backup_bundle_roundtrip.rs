mod test_support;

use serde_json::json;
use test_support::{create_student, request_err, request_ok, select_workspace, spawn_sidecar, temp_dir};

#[test]
fn workspace_bundle_round_trips_into_a_fresh_workspace() {
    let source = temp_dir("absensi-backup-source");
    let target = temp_dir("absensi-backup-target");
    let bundle = source.join("backup.absbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "1", &source);

    let ani = create_student(&mut stdin, &mut reader, "2", "Ani", "10A");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.save",
        json!({
            "date": "2026-03-02",
            "lessonHour": 1,
            "entries": [{ "studentId": ani, "status": "Sakit" }]
        }),
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "backup.exportWorkspaceBundle",
        json!({
            "workspacePath": source.to_string_lossy(),
            "outPath": bundle.to_string_lossy()
        }),
    );
    assert_eq!(
        exported.get("bundleFormat").and_then(|v| v.as_str()),
        Some("absensi-workspace-v1")
    );
    assert_eq!(
        exported
            .get("dbSha256")
            .and_then(|v| v.as_str())
            .map(|s| s.len()),
        Some(64)
    );

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importWorkspaceBundle",
        json!({
            "workspacePath": target.to_string_lossy(),
            "inPath": bundle.to_string_lossy()
        }),
    );
    assert_eq!(
        imported.get("bundleFormatDetected").and_then(|v| v.as_str()),
        Some("absensi-workspace-v1")
    );

    // The import switches the session onto the restored workspace.
    let listed = request_ok(&mut stdin, &mut reader, "6", "students.list", json!({}));
    let students = listed
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students");
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].get("fullName").and_then(|v| v.as_str()),
        Some("Ani")
    );

    let recap = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "recap.student",
        json!({ "studentId": students[0].get("id").and_then(|v| v.as_str()).expect("id") }),
    );
    assert_eq!(
        recap
            .get("stats")
            .and_then(|s| s.get("sick"))
            .and_then(|v| v.as_i64()),
        Some(1)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(target);
}

#[test]
fn bundle_import_rejects_missing_files() {
    let workspace = temp_dir("absensi-backup-missing");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "1", &workspace);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "backup.importWorkspaceBundle",
        json!({
            "workspacePath": workspace.to_string_lossy(),
            "inPath": workspace.join("does-not-exist.zip").to_string_lossy()
        }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
