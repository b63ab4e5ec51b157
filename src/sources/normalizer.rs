//! Record normalizer: raw origin rows → canonical, deduplicated job records.
//!
//! Pure transform. Nothing here touches the index.

use std::collections::BTreeMap;

use super::{RawRow, SourceRecord};
use crate::core::error::EngineError;
use crate::core::record::{JobRecord, SkillSet, SourceTag};

const ID_FIELDS: &[&str] = &["job_post_id", "id", "job_id"];
const TITLE_FIELDS: &[&str] = &["title", "job_title", "position"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "job_description"];
const COMPANY_FIELDS: &[&str] = &["company_name", "company"];
const LOCATION_FIELDS: &[&str] = &["location", "city", "address"];
const SALARY_FIELDS: &[&str] = &["salary", "salary_range"];
const REQUIREMENTS_FIELDS: &[&str] = &["requirements", "job_requirements"];

/// Outcome of one normalization pass
#[derive(Debug, Default)]
pub struct NormalizeReport {
    /// Canonical records, ascending by id
    pub records: Vec<JobRecord>,
    /// Rows that could not become records
    pub rejected: Vec<EngineError>,
    /// Rows dropped because a higher-priority origin had the same id
    pub duplicates: usize,
}

/// Normalize rows from every origin.
///
/// On id collision the origin with higher priority wins (database over
/// spreadsheet); within one origin the first row wins.
pub fn normalize<I>(rows: I) -> NormalizeReport
where
    I: IntoIterator<Item = SourceRecord>,
{
    let mut by_id: BTreeMap<String, JobRecord> = BTreeMap::new();
    let mut report = NormalizeReport::default();

    for source in rows {
        let record = match to_record(source.row(), source.tag()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}", e);
                report.rejected.push(e);
                continue;
            }
        };

        let kept = by_id.get(&record.id).map(|existing| existing.source);
        match kept {
            Some(kept) if kept <= record.source => {
                tracing::debug!(
                    "duplicate id '{}' from {} ignored ({} kept)",
                    record.id,
                    record.source,
                    kept
                );
                report.duplicates += 1;
            }
            Some(_) => {
                tracing::debug!("id '{}' replaced by {} row", record.id, record.source);
                report.duplicates += 1;
                by_id.insert(record.id.clone(), record);
            }
            None => {
                by_id.insert(record.id.clone(), record);
            }
        }
    }

    report.records = by_id.into_values().collect();
    report
}

fn to_record(row: &RawRow, origin: SourceTag) -> Result<JobRecord, EngineError> {
    let id = row
        .field(ID_FIELDS)
        .ok_or_else(|| EngineError::malformed(origin, None, "missing identity key"))?;

    let title = row
        .field(TITLE_FIELDS)
        .ok_or_else(|| EngineError::malformed(origin, Some(id.as_str()), "missing title"))?;

    let description = row
        .field(DESCRIPTION_FIELDS)
        .ok_or_else(|| EngineError::malformed(origin, Some(id.as_str()), "missing description"))?;

    Ok(JobRecord {
        id,
        title,
        company: row.field(COMPANY_FIELDS),
        location: row.field(LOCATION_FIELDS),
        salary: row.field(SALARY_FIELDS),
        description,
        requirements: row.field(REQUIREMENTS_FIELDS),
        skills: row.skills.iter().collect::<SkillSet>(),
        source: origin,
    })
}
