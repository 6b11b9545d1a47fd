use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS prefs (
    namespace  TEXT NOT NULL,        -- account handle, e.g. rook@corvid.social
    name       TEXT NOT NULL,        -- preference name, e.g. shortcuts
    json       TEXT NOT NULL,        -- JSON-encoded value
    updated_at TEXT NOT NULL,        -- RFC 3339 timestamp of the last write
    PRIMARY KEY (namespace, name)
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
