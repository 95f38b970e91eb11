use std::collections::{BTreeSet, HashMap};

use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use rusqlite::types::ToSql;
use tracing::debug;

use presence_types::{Status, aggregate};

use crate::Database;
use crate::models::{PointRow, SampleRow, UserRow};

/// Upper bound on bound parameters per `IN (...)` query. SQLite builds older
/// than 3.32 cap a statement at 999 variables.
const MAX_IN_PARAMS: usize = 500;

impl Database {
    // -- Users --

    /// Map every username to its user id, creating users that don't exist yet.
    ///
    /// Repeated names are collapsed. Creation uses `INSERT OR IGNORE` against
    /// the unique username index, so a concurrent writer adding the same name
    /// is tolerated and both callers end up with the same id.
    pub fn resolve_user_ids<S: AsRef<str>>(&self, usernames: &[S]) -> Result<HashMap<String, i64>> {
        let wanted: BTreeSet<&str> = usernames.iter().map(AsRef::as_ref).collect();
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }
        let wanted: Vec<&str> = wanted.into_iter().collect();

        self.with_conn_mut(|conn| {
            let mut ids = query_user_ids(conn, &wanted)?;

            let missing: Vec<&str> =
                wanted.iter().copied().filter(|name| !ids.contains_key(*name)).collect();

            if !missing.is_empty() {
                debug!("Creating {} new users", missing.len());
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare("INSERT OR IGNORE INTO users (username) VALUES (?1)")?;
                    for name in &missing {
                        stmt.execute([name])?;
                    }
                }
                tx.commit()?;

                // Re-read instead of trusting insert rowids: ignored rows have none.
                let created = query_user_ids(conn, &missing)?;
                if created.len() != missing.len() {
                    return Err(anyhow!(
                        "user directory incomplete: expected {} new ids, found {}",
                        missing.len(),
                        created.len()
                    ));
                }
                ids.extend(created);
            }

            Ok(ids)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, added, displayname, flag FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        added: row.get(2)?,
                        displayname: row.get(3)?,
                        flag: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
    }

    // -- Samples --

    /// Persist a sample and all of its presence points in one transaction.
    ///
    /// The sample status is computed here from `points`, so the stored
    /// aggregate can never disagree with the stored points. Any failure rolls
    /// the whole sample back. Returns the new sample id.
    pub fn insert_sample(
        &self,
        taken: DateTime<Utc>,
        elapsed: f64,
        points: &[(i64, Status)],
    ) -> Result<i64> {
        let status = aggregate(points.iter().map(|(_, s)| *s));
        let taken = taken.to_rfc3339_opts(SecondsFormat::Micros, true);

        self.with_conn_mut(|conn| {
            // Dropping the transaction without commit rolls back.
            let tx = conn.transaction()?;

            debug!("INSERT sample taken={} status={} points={}", taken, status, points.len());
            tx.execute(
                "INSERT INTO samples (taken, elapsed, status) VALUES (?1, ?2, ?3)",
                rusqlite::params![taken, elapsed, status.code()],
            )?;
            let sample_id = tx.last_insert_rowid();

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO presence_points (sample_id, user_id, status) VALUES (?1, ?2, ?3)",
                )?;
                for (user_id, point_status) in points {
                    stmt.execute(rusqlite::params![sample_id, user_id, point_status.code()])?;
                }
            }

            tx.commit()?;
            Ok(sample_id)
        })
    }

    pub fn get_sample(&self, id: i64) -> Result<Option<SampleRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, taken, elapsed, status FROM samples WHERE id = ?1",
                [id],
                map_sample,
            )
            .optional()
        })
    }

    /// Points of one sample, ordered by username.
    pub fn get_presence_points(&self, sample_id: i64) -> Result<Vec<PointRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.sample_id, p.user_id, u.username, p.status
                 FROM presence_points p
                 JOIN users u ON p.user_id = u.id
                 WHERE p.sample_id = ?1
                 ORDER BY u.username",
            )?;

            let rows = stmt
                .query_map([sample_id], |row| {
                    Ok(PointRow {
                        sample_id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        status: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Most recent samples first.
    pub fn recent_samples(&self, limit: u32) -> Result<Vec<SampleRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, taken, elapsed, status FROM samples ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], map_sample)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_samples(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM samples", [], |r| r.get(0))?))
    }
}

fn map_sample(row: &rusqlite::Row<'_>) -> rusqlite::Result<SampleRow> {
    Ok(SampleRow {
        id: row.get(0)?,
        taken: row.get(1)?,
        elapsed: row.get(2)?,
        status: row.get(3)?,
    })
}

/// Look up ids for `names`, chunked to respect the bound-parameter limit.
fn query_user_ids(conn: &Connection, names: &[&str]) -> Result<HashMap<String, i64>> {
    let mut ids = HashMap::with_capacity(names.len());

    for chunk in names.chunks(MAX_IN_PARAMS) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT id, username FROM users WHERE username IN ({})",
            placeholders.join(", ")
        );
        debug!("SELECT users by username [{} params]", chunk.len());

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = chunk.iter().map(|name| name as &dyn ToSql).collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?))
        })?;
        for row in rows {
            let (username, id) = row?;
            ids.insert(username, id);
        }
    }

    Ok(ids)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
