//! Relational job origin backed by SQLite.
//!
//! The engine never manages this schema. It reads `job_posts` (joined to
//! `companies` when that table exists), `job_post_skills` ⨝ `skills`, and the
//! seeker tables `job_seekers` / `user_skills`.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Params};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use super::{value_to_text, RawRow};
use crate::core::error::Result;
use crate::matching::Seeker;

const JOBS_WITH_COMPANY_SQL: &str = r#"
    SELECT jp.*, c.name AS company_name
    FROM job_posts jp
    LEFT JOIN companies c ON jp.company_id = c.company_id
"#;

const JOBS_SQL: &str = "SELECT * FROM job_posts";

const JOB_SKILLS_SQL: &str = r#"
    SELECT jps.job_post_id, s.name
    FROM job_post_skills jps
    JOIN skills s ON s.id = jps.skill_id
    ORDER BY jps.job_post_id, s.name
"#;

const SEEKER_SKILLS_SQL: &str = r#"
    SELECT s.name, us.endorsement_count
    FROM user_skills us
    JOIN skills s ON s.id = us.skill_id
    WHERE us.job_seeker_id = ?1
"#;

/// Read-only view of the job database
pub struct JobDatabase {
    conn: Connection,
}

impl JobDatabase {
    /// Open an existing database read-only
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// All job rows with their skill names attached
    pub fn load_jobs(&self) -> Result<Vec<RawRow>> {
        let mut rows = match self.query_rows(JOBS_WITH_COMPANY_SQL, []) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::debug!("company join unavailable ({}), reading job_posts only", e);
                self.query_rows(JOBS_SQL, [])?
            }
        };

        let skills = self.job_skills();
        for row in &mut rows {
            if let Some(names) = row
                .field(&["job_post_id", "id"])
                .and_then(|id| skills.get(&id))
            {
                row.skills = names.clone();
            }
        }

        tracing::debug!("loaded {} job rows from database", rows.len());
        Ok(rows)
    }

    /// Skill names per job id. A missing skills table yields no skills.
    fn job_skills(&self) -> HashMap<String, Vec<String>> {
        self.read_job_skills().unwrap_or_else(|e| {
            tracing::warn!("could not read job skills: {}", e);
            HashMap::new()
        })
    }

    fn read_job_skills(&self) -> rusqlite::Result<HashMap<String, Vec<String>>> {
        let mut stmt = self.conn.prepare(JOB_SKILLS_SQL)?;
        let mut rows = stmt.query([])?;

        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let job_id = value_to_text(&column_value(row.get_ref(0)?));
            let name: Option<String> = row.get(1)?;
            if let (Some(job_id), Some(name)) = (job_id, name) {
                map.entry(job_id).or_default().push(name);
            }
        }
        Ok(map)
    }

    /// Seeker profile with endorsed skills, `None` if the id is unknown
    pub fn load_seeker(&self, seeker_id: &str) -> Result<Option<Seeker>> {
        let bio: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT bio FROM job_seekers WHERE job_seeker_id = ?1",
                [seeker_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(bio) = bio else {
            return Ok(None);
        };

        let mut seeker = Seeker::new(seeker_id);
        seeker.bio = bio;

        let mut stmt = self.conn.prepare(SEEKER_SKILLS_SQL)?;
        let skills = stmt
            .query_map([seeker_id], |row| {
                let name: String = row.get(0)?;
                let count: Option<i64> = row.get(1)?;
                Ok((name, count.unwrap_or(0)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (name, count) in skills {
            seeker.add_skill(&name, count.clamp(0, u32::MAX as i64) as u32);
        }

        Ok(Some(seeker))
    }

    fn query_rows<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<Vec<RawRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params, |row| {
                let mut fields = Map::new();
                for (i, name) in names.iter().enumerate() {
                    let value = column_value(row.get_ref(i)?);
                    // LEFT JOIN misses must not shadow a same-named base column
                    if value.is_null() && fields.contains_key(name) {
                        continue;
                    }
                    fields.insert(name.clone(), value);
                }
                Ok(RawRow::new(fields))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(with_companies: bool) -> JobDatabase {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE job_posts (
                job_post_id INTEGER PRIMARY KEY,
                title TEXT,
                description TEXT,
                location TEXT,
                salary_range TEXT,
                company_id INTEGER
            );
            CREATE TABLE skills (id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE job_post_skills (job_post_id INTEGER, skill_id INTEGER);
            CREATE TABLE job_seekers (job_seeker_id INTEGER PRIMARY KEY, bio TEXT);
            CREATE TABLE user_skills (job_seeker_id INTEGER, skill_id INTEGER, endorsement_count INTEGER);

            INSERT INTO job_posts VALUES (1, 'Backend Engineer', 'Build APIs', 'Ha Noi', '20-30M', 10);
            INSERT INTO job_posts VALUES (2, 'Data Analyst', 'Dashboards', 'Da Nang', NULL, NULL);
            INSERT INTO skills VALUES (1, 'Python'), (2, 'SQL'), (3, 'Docker');
            INSERT INTO job_post_skills VALUES (1, 1), (1, 3), (2, 2);
            INSERT INTO job_seekers VALUES (5, 'Backend developer');
            INSERT INTO user_skills VALUES (5, 1, 5), (5, 2, NULL);
            "#,
        )
        .unwrap();

        if with_companies {
            conn.execute_batch(
                r#"
                CREATE TABLE companies (company_id INTEGER PRIMARY KEY, name TEXT);
                INSERT INTO companies VALUES (10, 'Acme');
                "#,
            )
            .unwrap();
        }

        JobDatabase::from_connection(conn)
    }

    #[test]
    fn test_load_jobs_with_company_join() {
        let db = fixture(true);
        let rows = db.load_jobs().unwrap();
        assert_eq!(rows.len(), 2);

        let first = rows
            .iter()
            .find(|r| r.field(&["job_post_id"]) == Some("1".to_string()))
            .unwrap();
        assert_eq!(first.field(&["company_name"]), Some("Acme".to_string()));
        assert_eq!(first.skills, vec!["Docker", "Python"]);
    }

    #[test]
    fn test_load_jobs_without_companies_table() {
        let db = fixture(false);
        let rows = db.load_jobs().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.field(&["company_name"]).is_none()));
    }

    #[test]
    fn test_load_seeker() {
        let db = fixture(true);
        let seeker = db.load_seeker("5").unwrap().unwrap();
        assert_eq!(seeker.bio.as_deref(), Some("Backend developer"));
        assert_eq!(seeker.skills.len(), 2);
        assert_eq!(seeker.endorsement("python"), 5);
        assert_eq!(seeker.endorsement("sql"), 0);

        assert!(db.load_seeker("404").unwrap().is_none());
    }
}
