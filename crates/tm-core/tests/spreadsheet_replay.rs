//! Spreadsheet loading and replay, using workbooks built on the fly.
//!
//! Validates:
//! - The first worksheet is read with its first row as the header
//! - Column kinds are inferred from the cells; empty cells become `Null`
//! - A blank header cell is named `Unnamed: <index>`
//! - A workbook replays through the in-memory server like a CSV file

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::{tempdir, TempDir};
use tm_common::{Value, ValueKind};
use tm_config::{Endpoint, RunConfig};
use tm_core::replay::{CancelToken, OBJECT_NAME};
use tm_core::server::AddressSpaceServer;
use tm_core::{load_dataset, ReplayEngine};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
<sheet name="Plant" sheetId="1" r:id="rId1"/>
<sheet name="Notes" sheetId="2" r:id="rId2"/>
</sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;

/// Plant readings. Column E has no header; C3 is empty.
const PLANT_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1">
<c r="A1" t="inlineStr"><is><t>Timestamp</t></is></c>
<c r="B1" t="inlineStr"><is><t>Temperature</t></is></c>
<c r="C1" t="inlineStr"><is><t>Pressure</t></is></c>
<c r="D1" t="inlineStr"><is><t>Running</t></is></c>
</row>
<row r="2">
<c r="A2" t="inlineStr"><is><t>2019-06-01 08:00:00</t></is></c>
<c r="B2"><v>20.5</v></c>
<c r="C2"><v>101.3</v></c>
<c r="D2" t="b"><v>1</v></c>
<c r="E2"><v>7</v></c>
</row>
<row r="3">
<c r="A3" t="inlineStr"><is><t>2019-06-01 08:01:00</t></is></c>
<c r="B3"><v>21</v></c>
<c r="D3" t="b"><v>0</v></c>
<c r="E3"><v>8</v></c>
</row>
<row r="4">
<c r="A4" t="inlineStr"><is><t>2019-06-01 08:02:00</t></is></c>
<c r="B4"><v>21.5</v></c>
<c r="C4"><v>100.9</v></c>
<c r="D4" t="b"><v>1</v></c>
<c r="E4"><v>9</v></c>
</row>
</sheetData>
</worksheet>"#;

/// Second worksheet; never read.
const NOTES_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Operator</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>night shift</t></is></c></row>
</sheetData>
</worksheet>"#;

fn write_workbook(path: &Path) {
    let file = File::create(path).expect("create workbook");
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", PLANT_SHEET),
        ("xl/worksheets/sheet2.xml", NOTES_SHEET),
    ] {
        zip.start_file(name, options).expect("start entry");
        zip.write_all(body.as_bytes()).expect("write entry");
    }
    zip.finish().expect("finish workbook");
}

fn fixture(name: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(name);
    write_workbook(&path);
    (dir, path)
}

#[test]
fn first_worksheet_loads_with_inferred_kinds() {
    let (_dir, path) = fixture("plant.xlsx");
    let dataset = load_dataset(&path).expect("load xlsx");

    let names: Vec<&str> = dataset.column_names().collect();
    assert_eq!(
        names,
        ["Timestamp", "Temperature", "Pressure", "Running", "Unnamed: 4"]
    );
    assert_eq!(dataset.len(), 3);

    let kinds: Vec<ValueKind> = dataset.columns().iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        [
            ValueKind::Text,
            ValueKind::Float,
            ValueKind::Float,
            ValueKind::Bool,
            ValueKind::Float,
        ]
    );

    let first = dataset.row(0).expect("row 0");
    assert_eq!(first.get("Timestamp"), Some(&Value::Text("2019-06-01 08:00:00".into())));
    assert_eq!(first.get("Temperature"), Some(&Value::Float(20.5)));
    assert_eq!(first.get("Running"), Some(&Value::Bool(true)));
    assert_eq!(first.get("Unnamed: 4"), Some(&Value::Float(7.0)));

    let second = dataset.row(1).expect("row 1");
    assert_eq!(second.get("Pressure"), Some(&Value::Null));
    assert_eq!(second.get("Temperature"), Some(&Value::Float(21.0)));
    assert_eq!(second.get("Running"), Some(&Value::Bool(false)));
}

#[test]
fn extension_match_ignores_case() {
    let (_dir, path) = fixture("PLANT.XLSX");
    assert_eq!(load_dataset(&path).expect("load xlsx").len(), 3);
}

#[test]
fn workbook_replays_into_the_address_space() {
    let (_dir, path) = fixture("plant.xlsx");
    let dataset = load_dataset(&path).expect("load xlsx");
    let server = AddressSpaceServer::new();
    let reader = server.reader();
    let config = RunConfig::new(Endpoint::parse("127.0.0.1:0").expect("endpoint"))
        .with_interval(Duration::from_millis(1));

    let mut engine = ReplayEngine::new(server, dataset, config);
    engine.configure().expect("configure");
    engine.start().expect("start");

    let names: Vec<String> = reader
        .browse(OBJECT_NAME)
        .expect("object exists")
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(names, ["Time", "Temperature", "Pressure", "Running", "Unnamed: 4"]);

    let summary = engine.run(&CancelToken::new()).expect("run");
    assert_eq!(summary.ticks_completed, 3);
    assert!(summary.is_clean());
    assert_eq!(reader.read(OBJECT_NAME, "Temperature"), Some(Value::Float(21.5)));
    assert_eq!(reader.read(OBJECT_NAME, "Pressure"), Some(Value::Float(100.9)));
    assert_eq!(reader.read(OBJECT_NAME, "Running"), Some(Value::Bool(true)));
    assert_eq!(reader.read(OBJECT_NAME, "Unnamed: 4"), Some(Value::Float(9.0)));
    engine.stop().expect("stop");
}
