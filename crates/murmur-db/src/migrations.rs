use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER PRIMARY KEY,
            username    TEXT,
            first_name  TEXT,
            link_code   TEXT NOT NULL UNIQUE,
            last_active TEXT
        );

        CREATE TABLE IF NOT EXISTS messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id       INTEGER NOT NULL,
            recipient_id    INTEGER NOT NULL,
            kind            TEXT NOT NULL
                            CHECK (kind IN ('text','voice','photo','animation')),
            content         TEXT NOT NULL,
            caption         TEXT,
            reply_to_tg_id  INTEGER,
            tg_message_id   INTEGER,
            read            INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id, created_at);

        -- Reply-threading lookup: platform message ids are only unique
        -- per chat, so the delivery reference is keyed by recipient too.
        CREATE INDEX IF NOT EXISTS idx_messages_delivery
            ON messages(recipient_id, tg_message_id);

        CREATE TABLE IF NOT EXISTS blocks (
            blocker_id  INTEGER NOT NULL,
            blocked_id  INTEGER NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (blocker_id, blocked_id)
        ) WITHOUT ROWID;
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
