use crate::Database;
use crate::models::{UserInfoRow, UserRow};
use amity_types::models::UserInfo;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, Row};

/// Timestamp layout SQLite's `datetime('now')` produces, so stored values
/// compare correctly against it.
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

const USER_COLUMNS: &str = "id, username, password, profile_img, created_at";

impl Database {
    // -- Users --

    /// Insert a user. Returns `None` when the username is already taken.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            ) {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                map_user,
            )
            .optional()
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_profile_img(&self, user_id: i64, filename: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET profile_img = ?1 WHERE id = ?2",
                rusqlite::params![filename, user_id],
            )?;
            Ok(())
        })
    }

    // -- Profiles --

    pub fn get_user_info(&self, user_id: i64) -> Result<Option<UserInfoRow>> {
        self.with_conn(|conn| query_user_info(conn, user_id))
    }

    /// Create or overwrite the profile row of `user_id`.
    pub fn save_user_info(&self, user_id: i64, info: &UserInfo) -> Result<()> {
        self.with_conn(|conn| upsert_user_info(conn, user_id, info))
    }

    /// Load the profile of `user_id` (empty if it has none), let `edit`
    /// change it and store the result, all in one transaction. Nothing is
    /// written when `edit` fails.
    pub fn update_user_info<F, E>(&self, user_id: i64, edit: F) -> std::result::Result<UserInfo, E>
    where
        F: FnOnce(&mut UserInfo) -> std::result::Result<(), E>,
        E: From<anyhow::Error>,
    {
        self.with_tx(|conn| {
            let mut info = query_user_info(conn, user_id)?
                .map(UserInfo::from)
                .unwrap_or_default();
            edit(&mut info)?;
            upsert_user_info(conn, user_id, &info)?;
            Ok(info)
        })
    }

    /// Users whose education contains `term`, ignoring ASCII case.
    pub fn users_by_education(&self, term: &str) -> Result<Vec<UserRow>> {
        let pattern = format!("%{}%", escape_like(term));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.password, u.profile_img, u.created_at
                 FROM users u
                 JOIN user_info i ON i.user_id = u.id
                 WHERE i.education LIKE ?1 ESCAPE '\\'
                 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([pattern], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        let expires = expires_at.format(SQLITE_DATETIME).to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, user_id, expires],
            )?;
            Ok(())
        })
    }

    /// True if the session exists, belongs to `user_id` and has not expired.
    pub fn session_is_active(&self, id: &str, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM sessions
                     WHERE id = ?1 AND user_id = ?2 AND expires_at > datetime('now')",
                    rusqlite::params![id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])?;
            Ok(n)
        })
    }
}

pub(crate) fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        [username],
        map_user,
    )
    .optional()
}

fn query_user_info(conn: &Connection, user_id: i64) -> Result<Option<UserInfoRow>> {
    conn.query_row(
        "SELECT user_id, work, education, hobbies, age, location, bio
         FROM user_info WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(UserInfoRow {
                user_id: row.get(0)?,
                work: row.get(1)?,
                education: row.get(2)?,
                hobbies: row.get(3)?,
                age: row.get(4)?,
                location: row.get(5)?,
                bio: row.get(6)?,
            })
        },
    )
    .optional()
}

fn upsert_user_info(conn: &Connection, user_id: i64, info: &UserInfo) -> Result<()> {
    conn.execute(
        "INSERT INTO user_info (user_id, work, education, hobbies, age, location, bio)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id) DO UPDATE SET
            work = excluded.work,
            education = excluded.education,
            hobbies = excluded.hobbies,
            age = excluded.age,
            location = excluded.location,
            bio = excluded.bio",
        rusqlite::params![
            user_id,
            info.work,
            info.education,
            info.hobbies,
            info.age,
            info.location,
            info.bio
        ],
    )?;
    Ok(())
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        profile_img: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
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
