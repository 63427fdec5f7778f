//! Database row types. These map directly to SQLite rows and stay
//! distinct from the jukebox-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub email: String,
    pub fullname: String,
    pub is_admin: bool,
}

impl UserRow {
    /// Name shown to other users: the full name, or the username when unset.
    pub fn display_name(&self) -> &str {
        if self.fullname.trim().is_empty() {
            &self.username
        } else {
            &self.fullname
        }
    }
}

pub struct NewPrivateMessage<'a> {
    pub subject: &'a str,
    pub message: &'a str,
    pub from_user: i64,
    pub to_user: i64,
    pub creation_date: i64,
    pub is_read: bool,
}

pub struct PrivateMessageRow {
    pub id: i64,
    pub subject: String,
    pub message: String,
    pub from_user: i64,
    pub from_username: String,
    pub to_user: i64,
    pub to_username: String,
    pub creation_date: i64,
    pub is_read: bool,
}
