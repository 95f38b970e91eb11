/// Database row types. These map directly to SQLite rows and are kept apart
/// from the presence-types domain models so the store stays independent.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use presence_types::Status;
use presence_types::models::{PresencePoint, Sample, User};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub added: String,
    pub displayname: Option<String>,
    pub flag: Option<String>,
}

pub struct SampleRow {
    pub id: i64,
    pub taken: String,
    pub elapsed: f64,
    pub status: String,
}

/// A presence point joined with its user's name.
pub struct PointRow {
    pub sample_id: i64,
    pub user_id: i64,
    pub username: String,
    pub status: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            added: parse_timestamp(&self.added)?,
            id: self.id,
            username: self.username,
            displayname: self.displayname,
            flag: self.flag,
        })
    }
}

impl SampleRow {
    pub fn into_sample(self) -> Result<Sample> {
        Ok(Sample {
            id: self.id,
            taken: parse_timestamp(&self.taken)?,
            elapsed: self.elapsed,
            status: Status::from_code(&self.status)
                .with_context(|| format!("sample {} has a corrupt status", self.id))?,
        })
    }
}

impl PointRow {
    pub fn status(&self) -> Result<Status> {
        Ok(Status::from_code(&self.status)?)
    }

    pub fn into_point(self) -> Result<PresencePoint> {
        Ok(PresencePoint {
            status: self.status()?,
            sample_id: self.sample_id,
            user_id: self.user_id,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime() has no timezone; treat it as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}
