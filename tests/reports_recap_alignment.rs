mod test_support;

use serde_json::json;
use test_support::{create_student, request_ok, select_workspace, spawn_sidecar, temp_dir};

#[test]
fn sheet_and_table_exports_agree_with_the_interactive_recap() {
    let workspace = temp_dir("absensi-reports-alignment");
    let csv_out = workspace.join("rekap-absensi.csv");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "1", &workspace);

    let ani = create_student(&mut stdin, &mut reader, "2", "Ani", "10A");
    let budi = create_student(&mut stdin, &mut reader, "3", "Budi", "10A");

    for (i, (date, hour, sid, status)) in [
        ("2026-03-02", 1, &ani, "Hadir"),
        ("2026-03-02", 2, &ani, "Hadir"),
        ("2026-03-03", 1, &ani, "Sakit"),
        ("2026-03-02", 1, &budi, "Alpa"),
        ("2026-03-02", 2, &budi, "Tidur"),
        ("2026-03-03", 1, &budi, "Hadir"),
    ]
    .iter()
    .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("seed-{}", i),
            "attendance.save",
            json!({
                "date": date,
                "lessonHour": hour,
                "entries": [{ "studentId": sid, "status": status }]
            }),
        );
    }

    let scope = json!({ "month": "2026-03", "className": "10A" });

    let recap = request_ok(&mut stdin, &mut reader, "4", "recap.class", scope.clone());
    let recap_rows = recap.get("rows").and_then(|v| v.as_array()).expect("rows");

    let mut sheet_scope = scope.clone();
    sheet_scope["outPath"] = json!(csv_out.to_string_lossy());
    let sheet = request_ok(&mut stdin, &mut reader, "5", "reports.recapSheet", sheet_scope);
    let records = sheet
        .get("records")
        .and_then(|v| v.as_array())
        .expect("records");

    let table = request_ok(&mut stdin, &mut reader, "6", "reports.recapTable", scope);
    let body = table.get("body").and_then(|v| v.as_array()).expect("body");

    assert_eq!(recap_rows.len(), records.len());
    assert_eq!(records.len(), body.len());

    for ((recap_row, record), table_row) in recap_rows.iter().zip(records).zip(body) {
        let record = record.as_array().expect("sheet record");
        let table_row = table_row.as_array().expect("table row");

        // Name and class verbatim across all three surfaces.
        assert_eq!(recap_row.get("studentName"), Some(&record[0]));
        assert_eq!(record[0].as_str(), table_row[0].as_str());
        assert_eq!(recap_row.get("className"), Some(&record[1]));

        // Counts: sheet keeps numbers, table renders the same numbers.
        for (key, col) in [
            ("present", 2),
            ("sick", 3),
            ("excused", 4),
            ("absent", 5),
            ("sleeping", 6),
            ("totalHours", 7),
        ] {
            let n = recap_row.get(key).and_then(|v| v.as_i64()).expect(key);
            assert_eq!(record[col].as_i64(), Some(n));
            assert_eq!(table_row[col].as_str(), Some(n.to_string().as_str()));
        }

        // Percentage: number in the sheet, suffixed string in the table.
        let pct = recap_row
            .get("presencePercentage")
            .and_then(|v| v.as_i64())
            .expect("percentage");
        assert_eq!(record[8].as_i64(), Some(pct));
        assert_eq!(table_row[8].as_str(), Some(format!("{}%", pct).as_str()));
    }

    // The CSV landed and carries the sheet header row.
    let csv_text = std::fs::read_to_string(&csv_out).expect("read exported csv");
    let mut lines = csv_text.lines();
    assert_eq!(
        lines.next(),
        Some("Nama Siswa,Kelas,Hadir,Sakit,Izin,Alpa,Tidur,Total Pertemuan,Persentase Hadir (%)")
    );
    assert_eq!(lines.count(), recap_rows.len());

    // Header sets are fixed per surface.
    assert_eq!(
        sheet.get("headers").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(9)
    );
    assert_eq!(
        table
            .get("headers")
            .and_then(|v| v.as_array())
            .and_then(|a| a.last())
            .and_then(|v| v.as_str()),
        Some("% Hadir")
    );
    assert_eq!(
        table.get("title").and_then(|v| v.as_str()),
        Some("Rekapitulasi Absensi Siswa")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
