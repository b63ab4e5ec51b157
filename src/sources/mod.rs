//! Job record origins and the normalizer that unifies them.
//!
//! Each adapter yields loosely-typed rows. Only the normalizer knows how the
//! origins name their fields; everything downstream sees [`JobRecord`].
//!
//! [`JobRecord`]: crate::core::record::JobRecord

pub mod database;
pub mod normalizer;
pub mod sheet;

use serde_json::{Map, Value};

use crate::core::record::SourceTag;

pub use database::JobDatabase;
pub use normalizer::{normalize, NormalizeReport};
pub use sheet::load_sheet;

/// Field map of one raw row plus the skill names attached to it.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub fields: Map<String, Value>,
    pub skills: Vec<String>,
}

impl RawRow {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            skills: Vec::new(),
        }
    }

    /// First non-blank value among `aliases`, rendered as text.
    pub fn field(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .find_map(value_to_text)
    }
}

/// A row tagged with the origin that produced it.
#[derive(Debug, Clone)]
pub enum SourceRecord {
    Database(RawRow),
    Spreadsheet(RawRow),
}

impl SourceRecord {
    pub fn tag(&self) -> SourceTag {
        match self {
            SourceRecord::Database(_) => SourceTag::Database,
            SourceRecord::Spreadsheet(_) => SourceTag::Spreadsheet,
        }
    }

    pub fn row(&self) -> &RawRow {
        match self {
            SourceRecord::Database(row) | SourceRecord::Spreadsheet(row) => row,
        }
    }
}

/// Render a scalar JSON value as trimmed text. Integral floats lose their
/// fractional part so spreadsheet ids like `42.0` match database id `42`.
pub fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
