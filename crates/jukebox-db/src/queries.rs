use crate::Database;
use crate::models::{NewPrivateMessage, PrivateMessageRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, username, password, email, fullname, is_admin";

// JOIN users to fetch both usernames in a single query
const PVMSG_SELECT: &str = "SELECT m.id, m.subject, m.message, m.from_user, f.username,
            m.to_user, t.username, m.creation_date, m.is_read
     FROM user_pvmsg m
     LEFT JOIN users f ON m.from_user = f.id
     LEFT JOIN users t ON m.to_user = t.id";

impl Database {
    // -- Users --

    /// Insert a user and return its id. The first user ever created is
    /// flagged as administrator.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
        fullname: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, email, fullname, is_admin)
                 VALUES (?1, ?2, ?3, ?4, NOT EXISTS (SELECT 1 FROM users))",
                (username, password_hash, email, fullname),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"), username)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"), id)
        })
    }

    // -- Private messages --

    /// Single INSERT; returns the id SQLite assigned to the row.
    pub fn insert_private_message(&self, msg: &NewPrivateMessage<'_>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_pvmsg (subject, message, from_user, to_user, creation_date, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    msg.subject,
                    msg.message,
                    msg.from_user,
                    msg.to_user,
                    msg.creation_date,
                    msg.is_read,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_private_message(&self, id: i64) -> Result<Option<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PVMSG_SELECT} WHERE m.id = ?1"))?;
            let row = stmt.query_row([id], map_pvmsg).optional()?;
            Ok(row)
        })
    }

    /// Messages addressed to `user_id`, newest first.
    pub fn get_received_messages(&self, user_id: i64, limit: u32) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| query_pvmsgs(conn, "m.to_user", user_id, limit))
    }

    /// Messages written by `user_id`, newest first.
    pub fn get_sent_messages(&self, user_id: i64, limit: u32) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| query_pvmsgs(conn, "m.from_user", user_id, limit))
    }

    // -- Preferences --

    pub fn get_preference(&self, user_id: i64, name: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM user_preference WHERE user_id = ?1 AND name = ?2",
                rusqlite::params![user_id, name],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Boolean view of a preference. Unset reads as false.
    pub fn get_preference_bool(&self, user_id: i64, name: &str) -> Result<bool> {
        let value = self.get_preference(user_id, name)?;
        Ok(matches!(value.as_deref().map(str::trim), Some("1") | Some("true")))
    }

    pub fn set_preference(&self, user_id: i64, name: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_preference (user_id, name, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, name) DO UPDATE SET value = excluded.value",
                rusqlite::params![user_id, name, value],
            )?;
            Ok(())
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, sql: &str, key: P) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;

    let row = stmt
        .query_row([key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                email: row.get(3)?,
                fullname: row.get(4)?,
                is_admin: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_pvmsgs(
    conn: &Connection,
    owner_column: &str,
    user_id: i64,
    limit: u32,
) -> Result<Vec<PrivateMessageRow>> {
    let mut stmt = conn.prepare(&format!(
        "{PVMSG_SELECT}
         WHERE {owner_column} = ?1
         ORDER BY m.creation_date DESC, m.id DESC
         LIMIT ?2"
    ))?;

    let rows = stmt
        .query_map(rusqlite::params![user_id, limit], map_pvmsg)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_pvmsg(row: &Row<'_>) -> rusqlite::Result<PrivateMessageRow> {
    Ok(PrivateMessageRow {
        id: row.get(0)?,
        subject: row.get(1)?,
        message: row.get(2)?,
        from_user: row.get(3)?,
        from_username: row.get::<_, Option<String>>(4)?.unwrap_or_else(|| "unknown".to_string()),
        to_user: row.get(5)?,
        to_username: row.get::<_, Option<String>>(6)?.unwrap_or_else(|| "unknown".to_string()),
        creation_date: row.get(7)?,
        is_read: row.get(8)?,
    })
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
