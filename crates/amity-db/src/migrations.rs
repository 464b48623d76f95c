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
                password    TEXT NOT NULL,
                profile_img TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE user_info (
                user_id     INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                work        TEXT NOT NULL DEFAULT '',
                education   TEXT NOT NULL DEFAULT '',
                hobbies     TEXT NOT NULL DEFAULT '',
                age         INTEGER,
                location    TEXT NOT NULL DEFAULT '',
                bio         TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE friend_requests (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                status      TEXT NOT NULL DEFAULT 'pending' CHECK (status = 'pending'),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (sender_id, receiver_id),
                CHECK (sender_id != receiver_id)
            );

            CREATE INDEX idx_friend_requests_receiver
                ON friend_requests(receiver_id);

            -- One row per direction; rows are always written in pairs.
            CREATE TABLE friends (
                friend1     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                friend2     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (friend1, friend2),
                CHECK (friend1 != friend2)
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
