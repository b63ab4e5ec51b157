//! Spreadsheet origin.
//!
//! Excel workbooks are read from their first sheet, with the header row
//! naming the columns. Exports may also be JSON or YAML arrays of row
//! objects. Column names vary between exports, so rows stay loosely typed
//! until normalization.

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;

use super::RawRow;
use crate::core::error::{EngineError, Result};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load every row from a spreadsheet, picking the reader by extension.
///
/// Non-object entries and blank rows are logged and skipped.
pub fn load_sheet(path: &Path) -> Result<Vec<RawRow>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        fs::metadata(path)?;
        return read_workbook(path)
            .map_err(|e| EngineError::Source(format!("{}: {}", path.display(), e)));
    }

    let content = fs::read_to_string(path)?;
    let is_yaml = matches!(extension.as_str(), "yaml" | "yml");
    parse_rows(&content, is_yaml)
        .map_err(|e| EngineError::Source(format!("{}: {}", path.display(), e)))
}

fn read_workbook(path: &Path) -> std::result::Result<Vec<RawRow>, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no sheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut lines = range.rows();
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<Option<String>> = header
        .iter()
        .map(|cell| super::value_to_text(&cell_to_value(cell)))
        .collect();

    let mut rows = Vec::new();
    for (i, cells) in lines.enumerate() {
        let mut fields = Map::new();
        for (name, cell) in columns.iter().zip(cells) {
            let Some(name) = name else {
                continue;
            };
            let value = cell_to_value(cell);
            if !value.is_null() {
                fields.insert(name.clone(), value);
            }
        }
        if fields.is_empty() {
            tracing::debug!("sheet row {} is blank, skipping", i + 2);
            continue;
        }
        rows.push(into_row(fields));
    }
    Ok(rows)
}

/// Cell content as JSON. Empty and error cells become null.
fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

fn parse_rows(content: &str, is_yaml: bool) -> std::result::Result<Vec<RawRow>, String> {
    let value: Value = if is_yaml {
        serde_yaml::from_str(content).map_err(|e| e.to_string())?
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())?
    };

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => return Ok(Vec::new()),
        _ => return Err("expected an array of rows".to_string()),
    };

    let mut rows = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        match entry {
            Value::Object(fields) => rows.push(into_row(fields)),
            _ => tracing::warn!("sheet row {} is not an object, skipping", i),
        }
    }
    Ok(rows)
}

fn into_row(mut fields: Map<String, Value>) -> RawRow {
    let skills = fields.remove("skills").map(skill_list).unwrap_or_default();
    RawRow { fields, skills }
}

/// Skills column: either an array of names or one comma-separated string.
fn skill_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(super::value_to_text)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::SourceTag;
    use crate::sources::{normalize, SourceRecord};
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn inline_cell(col: char, row: usize, text: &str) -> String {
        format!(r#"<c r="{col}{row}" t="inlineStr"><is><t>{text}</t></is></c>"#)
    }

    /// Minimal single-sheet workbook. Numbers are written as numeric cells,
    /// everything else as inline strings.
    fn write_workbook(path: &Path, rows: &[&[&str]]) {
        let mut sheet_rows = String::new();
        for (r, cells) in rows.iter().enumerate() {
            let r = r + 1;
            sheet_rows.push_str(&format!(r#"<row r="{r}">"#));
            for (c, text) in cells.iter().enumerate() {
                let col = (b'A' + c as u8) as char;
                if text.is_empty() {
                    continue;
                }
                if text.parse::<f64>().is_ok() {
                    sheet_rows.push_str(&format!(r#"<c r="{col}{r}"><v>{text}</v></c>"#));
                } else {
                    sheet_rows.push_str(&inline_cell(col, r, text));
                }
            }
            sheet_rows.push_str("</row>");
        }

        let parts = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#
                    .to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                    .to_string(),
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Jobs" sheetId="1" r:id="rId1"/></sheets></workbook>"#
                    .to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
                    .to_string(),
            ),
            (
                "xl/worksheets/sheet1.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
                ),
            ),
        ];

        let file = fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in parts {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_parse_json_rows() {
        let json = r#"[
            {"id": 7, "job_title": "QA Engineer", "skills": "Selenium, Python"},
            {"id": "8", "title": "Designer", "skills": ["Figma", "UX"]},
            "not a row"
        ]"#;
        let rows = parse_rows(json, false).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].skills, vec!["Selenium", "Python"]);
        assert_eq!(rows[0].field(&["id"]), Some("7".to_string()));
        assert_eq!(rows[1].skills, vec!["Figma", "UX"]);
        assert!(!rows[1].fields.contains_key("skills"));
    }

    #[test]
    fn test_parse_yaml_rows() {
        let yaml = "- id: 1\n  position: Accountant\n  city: Da Nang\n";
        let rows = parse_rows(yaml, true).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field(&["city"]), Some("Da Nang".to_string()));
        assert!(rows[0].skills.is_empty());
    }

    #[test]
    fn test_non_array_rejected() {
        assert!(parse_rows(r#"{"id": 1}"#, false).is_err());
    }

    #[test]
    fn test_load_sheet_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.yml");
        fs::write(&path, "- id: 3\n  title: Tester\n").unwrap();

        let rows = load_sheet(&path).unwrap();
        assert_eq!(rows.len(), 1);

        let missing = load_sheet(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(EngineError::Io(_))));
    }

    #[test]
    fn test_load_workbook_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.xlsx");
        write_workbook(
            &path,
            &[
                &["id", "job_title", "job_description", "city", "skills", ""],
                &["7", "QA Engineer", "Test web apps", "Hà Nội", "Selenium, Python ,", "x"],
                &[],
                &["8", "Designer", "Design mobile screens", "Đà Nẵng", "", ""],
            ],
        );

        let rows = load_sheet(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field(&["id"]), Some("7".to_string()));
        assert_eq!(rows[0].skills, vec!["Selenium", "Python"]);
        assert_eq!(rows[0].fields.len(), 4);
        assert!(rows[1].skills.is_empty());

        let report = normalize(rows.into_iter().map(SourceRecord::Spreadsheet));
        assert!(report.rejected.is_empty());
        let qa = &report.records[0];
        assert_eq!(qa.id, "7");
        assert_eq!(qa.title, "QA Engineer");
        assert_eq!(qa.location.as_deref(), Some("Hà Nội"));
        assert_eq!(qa.source, SourceTag::Spreadsheet);
        assert_eq!(qa.skills.iter().collect::<Vec<_>>(), vec!["python", "selenium"]);
    }

    #[test]
    fn test_workbook_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_sheet(&dir.path().join("missing.xlsx"));
        assert!(matches!(missing, Err(EngineError::Io(_))));

        let garbage = dir.path().join("broken.xlsx");
        fs::write(&garbage, "not a zip archive").unwrap();
        assert!(matches!(load_sheet(&garbage), Err(EngineError::Source(_))));
    }
}
