mod test_support;

use serde_json::json;
use test_support::{create_student, request_ok, select_workspace, spawn_sidecar, temp_dir};

fn save_day(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
    date: &str,
    hour: u32,
    entries: serde_json::Value,
) {
    let _ = request_ok(
        stdin,
        reader,
        id,
        "attendance.save",
        json!({ "date": date, "lessonHour": hour, "entries": entries }),
    );
}

#[test]
fn class_recap_filters_by_interval_and_class() {
    let workspace = temp_dir("absensi-recap-class");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "1", &workspace);

    let ani = create_student(&mut stdin, &mut reader, "2", "Ani", "10A");
    let budi = create_student(&mut stdin, &mut reader, "3", "Budi", "10A");
    let citra = create_student(&mut stdin, &mut reader, "4", "Citra", "11B");

    // March: Ani present twice and sick once, Budi absent once.
    save_day(
        &mut stdin,
        &mut reader,
        "5",
        "2026-03-02",
        1,
        json!([
            { "studentId": ani, "status": "Hadir" },
            { "studentId": budi, "status": "Alpa" }
        ]),
    );
    save_day(
        &mut stdin,
        &mut reader,
        "6",
        "2026-03-02",
        2,
        json!([{ "studentId": ani, "status": "Hadir" }]),
    );
    save_day(
        &mut stdin,
        &mut reader,
        "7",
        "2026-03-03",
        1,
        json!([{ "studentId": ani, "status": "Sakit" }]),
    );
    // April records must stay outside a March recap.
    save_day(
        &mut stdin,
        &mut reader,
        "8",
        "2026-04-01",
        1,
        json!([{ "studentId": ani, "status": "Alpa" }]),
    );
    // Citra has records but sits in another class.
    save_day(
        &mut stdin,
        &mut reader,
        "9",
        "2026-03-02",
        1,
        json!([{ "studentId": citra, "status": "Tidur" }]),
    );

    let march = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "recap.class",
        json!({ "month": "2026-03" }),
    );
    assert_eq!(march.get("from").and_then(|v| v.as_str()), Some("2026-03-01"));
    assert_eq!(march.get("to").and_then(|v| v.as_str()), Some("2026-03-31"));
    let rows = march.get("rows").and_then(|v| v.as_array()).expect("rows");
    assert_eq!(rows.len(), 3);

    let row_for = |name: &str| {
        rows.iter()
            .find(|r| r.get("studentName").and_then(|v| v.as_str()) == Some(name))
            .unwrap_or_else(|| panic!("row for {}", name))
            .clone()
    };

    let ani_row = row_for("Ani");
    assert_eq!(ani_row.get("present").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(ani_row.get("sick").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(ani_row.get("absent").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(ani_row.get("totalHours").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(
        ani_row.get("presencePercentage").and_then(|v| v.as_i64()),
        Some(67)
    );

    let budi_row = row_for("Budi");
    assert_eq!(budi_row.get("absent").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(budi_row.get("totalHours").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(
        budi_row.get("presencePercentage").and_then(|v| v.as_i64()),
        Some(0)
    );
    assert_eq!(
        budi_row.get("tierLabel").and_then(|v| v.as_str()),
        Some("Perlu Perhatian")
    );

    let citra_row = row_for("Citra");
    assert_eq!(citra_row.get("sleeping").and_then(|v| v.as_i64()), Some(1));

    // Class filter excludes other classes entirely rather than zero-padding.
    let class_scoped = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "recap.class",
        json!({ "month": "2026-03", "className": "10A" }),
    );
    let scoped_rows = class_scoped
        .get("rows")
        .and_then(|v| v.as_array())
        .expect("rows");
    assert_eq!(scoped_rows.len(), 2);
    assert!(scoped_rows
        .iter()
        .all(|r| r.get("className").and_then(|v| v.as_str()) == Some("10A")));

    // An interval with no matching records yields all-zero rows at the
    // class-recap default percentage of 0.
    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "recap.class",
        json!({ "from": "2025-01-01", "to": "2025-01-31" }),
    );
    let empty_rows = empty.get("rows").and_then(|v| v.as_array()).expect("rows");
    assert_eq!(empty_rows.len(), 3);
    for row in empty_rows {
        assert_eq!(row.get("totalHours").and_then(|v| v.as_i64()), Some(0));
        assert_eq!(
            row.get("presencePercentage").and_then(|v| v.as_i64()),
            Some(0)
        );
    }

    // Same scope twice, same answer.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "recap.class",
        json!({ "month": "2026-03" }),
    );
    assert_eq!(march, again);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
