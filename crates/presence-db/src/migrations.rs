use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                added       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
                displayname TEXT,
                flag        TEXT CHECK (flag IS NULL OR length(flag) = 1)
            );

            CREATE TABLE samples (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                taken   TEXT NOT NULL,
                elapsed REAL NOT NULL,
                status  TEXT NOT NULL CHECK (status IN ('s', 'w', 'e'))
            );

            CREATE INDEX idx_samples_taken ON samples(taken);

            CREATE TABLE presence_points (
                sample_id INTEGER NOT NULL REFERENCES samples(id),
                user_id   INTEGER NOT NULL REFERENCES users(id),
                status    TEXT NOT NULL CHECK (status IN ('s', 'w', 'e')),
                PRIMARY KEY (sample_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// Drop every table, children first.
pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS presence_points;
        DROP TABLE IF EXISTS samples;
        DROP TABLE IF EXISTS users;
        DROP TABLE IF EXISTS schema_version;
        ",
    )?;
    info!("Dropped all tables");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_drop_then_recreate() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute("INSERT INTO users (username) VALUES ('a')", []).unwrap();
        drop_all(&conn).unwrap();
        run(&conn).unwrap();
        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).unwrap();
        assert_eq!(users, 0);
    }
}
