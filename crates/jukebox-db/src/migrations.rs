use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, private messages, preferences)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                email       TEXT NOT NULL DEFAULT '',
                fullname    TEXT NOT NULL DEFAULT '',
                is_admin    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE user_pvmsg (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                subject         TEXT NOT NULL,
                message         TEXT NOT NULL,
                from_user       INTEGER NOT NULL REFERENCES users(id),
                to_user         INTEGER NOT NULL REFERENCES users(id),
                creation_date   INTEGER NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_user_pvmsg_to_user
                ON user_pvmsg(to_user, creation_date);

            CREATE INDEX idx_user_pvmsg_from_user
                ON user_pvmsg(from_user, creation_date);

            CREATE TABLE user_preference (
                user_id     INTEGER NOT NULL REFERENCES users(id),
                name        TEXT NOT NULL,
                value       TEXT NOT NULL,
                PRIMARY KEY (user_id, name)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
