use crate::Database;
use crate::models::{MessageRow, UserRow};
use anyhow::Result;
use murmur_types::MessagePayload;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Write-through upsert: refreshes display metadata and last-active on
    /// every interaction, keeps the link code stable.
    pub fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        link_code: &str,
        last_active: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, first_name, link_code, last_active)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                     username = excluded.username,
                     first_name = excluded.first_name,
                     link_code = excluded.link_code,
                     last_active = excluded.last_active",
                rusqlite::params![user_id, username, first_name, link_code, last_active],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "user_id = ?1", &[&user_id]))
    }

    /// resolveCode: reverse lookup from a shareable link code to its owner.
    pub fn user_by_link_code(&self, code: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "link_code = ?1", &[&code]))
    }

    /// Overwrites the user's link code; the previous code stops resolving.
    /// Fails on the `link_code` uniqueness constraint if the fresh code
    /// collides — callers retry with a new code (see `is_unique_violation`).
    pub fn set_link_code(&self, user_id: i64, code: &str, last_active: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, link_code, last_active)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                     link_code = excluded.link_code,
                     last_active = excluded.last_active",
                rusqlite::params![user_id, code, last_active],
            )?;
            Ok(())
        })
    }

    pub fn all_user_ids(&self) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY user_id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    /// Admin wipe: strips display metadata from every user while keeping the
    /// records and their link codes alive, so shared links keep working.
    pub fn strip_user_profiles(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET username = NULL, first_name = NULL, last_active = NULL",
                [],
            )?;
            Ok(n)
        })
    }

    // -- Messages --

    /// Persists a new message with `read = false`; returns the store id.
    pub fn insert_message(
        &self,
        sender_id: i64,
        recipient_id: i64,
        payload: &MessagePayload,
        reply_to_tg_id: Option<i64>,
        created_at: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages
                     (sender_id, recipient_id, kind, content, caption, reply_to_tg_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    sender_id,
                    recipient_id,
                    payload.kind.as_str(),
                    payload.content,
                    payload.caption,
                    reply_to_tg_id,
                    created_at
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Backfills the platform id of the outbound copy after delivery.
    /// Idempotent for a repeated call with the same value.
    pub fn set_delivery_ref(&self, message_id: i64, tg_message_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET tg_message_id = ?2 WHERE id = ?1",
                rusqlite::params![message_id, tg_message_id],
            )?;
            Ok(())
        })
    }

    pub fn message_by_id(&self, message_id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, "id = ?1", &[&message_id]))
    }

    /// Resolves which stored message a platform-level reply refers to.
    pub fn message_by_delivery_ref(
        &self,
        recipient_id: i64,
        tg_message_id: i64,
    ) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            query_message(
                conn,
                "recipient_id = ?1 AND tg_message_id = ?2",
                &[&recipient_id, &tg_message_id],
            )
        })
    }

    pub fn count_received(&self, user_id: i64, since: Option<&str>) -> Result<u64> {
        self.count_messages("recipient_id", user_id, since)
    }

    pub fn count_sent(&self, user_id: i64, since: Option<&str>) -> Result<u64> {
        self.count_messages("sender_id", user_id, since)
    }

    fn count_messages(&self, column: &str, user_id: i64, since: Option<&str>) -> Result<u64> {
        self.with_conn(|conn| {
            let n: u64 = match since {
                Some(ts) => conn.query_row(
                    &format!(
                        "SELECT COUNT(*) FROM messages WHERE {column} = ?1 AND created_at >= ?2"
                    ),
                    rusqlite::params![user_id, ts],
                    |row| row.get(0),
                )?,
                None => conn.query_row(
                    &format!("SELECT COUNT(*) FROM messages WHERE {column} = ?1"),
                    [user_id],
                    |row| row.get(0),
                )?,
            };
            Ok(n)
        })
    }

    pub fn delete_all_messages(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM messages", [])?;
            Ok(n)
        })
    }

    // -- Blocks --

    pub fn is_blocked(&self, blocker_id: i64, sender_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
                    rusqlite::params![blocker_id, sender_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Idempotent set-union add.
    pub fn add_block(&self, blocker_id: i64, sender_id: i64, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blocks (blocker_id, blocked_id, created_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![blocker_id, sender_id, created_at],
            )?;
            Ok(())
        })
    }

    /// Returns whether an entry was actually removed.
    pub fn remove_block(&self, blocker_id: i64, sender_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
                rusqlite::params![blocker_id, sender_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Returns whether the list had any entries.
    pub fn clear_blocks(&self, blocker_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM blocks WHERE blocker_id = ?1", [blocker_id])?;
            Ok(n > 0)
        })
    }

    pub fn delete_all_blocks(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM blocks", [])?;
            Ok(n)
        })
    }
}

/// True if the error chain bottoms out in a SQLite UNIQUE violation,
/// i.e. a freshly generated link code collided with an existing one.
/// Other constraint failures (CHECK, NOT NULL) are not collisions and must
/// not be retried as one.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn query_user(
    conn: &Connection,
    filter: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT user_id, username, first_name, link_code, last_active FROM users WHERE {filter}"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row(params, |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                username: row.get(1)?,
                first_name: row.get(2)?,
                link_code: row.get(3)?,
                last_active: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_message(
    conn: &Connection,
    filter: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<MessageRow>> {
    let sql = format!(
        "SELECT id, sender_id, recipient_id, kind, content, caption,
                reply_to_tg_id, tg_message_id, read, created_at
         FROM messages WHERE {filter}"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row(params, |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                recipient_id: row.get(2)?,
                kind: row.get(3)?,
                content: row.get(4)?,
                caption: row.get(5)?,
                reply_to_tg_id: row.get(6)?,
                tg_message_id: row.get(7)?,
                read: row.get(8)?,
                created_at: row.get(9)?,
            })
        })
        .optional()?;

    Ok(row)
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

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_types::{MessageKind, MessagePayload};

    const NOW: &str = "2025-06-01T12:00:00Z";

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn payload(body: &str) -> MessagePayload {
        MessagePayload::text(body)
    }

    #[test]
    fn link_code_resolves_to_owner() {
        let db = db();
        db.upsert_user(100, Some("alice"), Some("Alice"), "abc123xyz00", NOW)
            .unwrap();

        let user = db.user_by_link_code("abc123xyz00").unwrap().unwrap();
        assert_eq!(user.user_id, 100);
        assert_eq!(user.username.as_deref(), Some("alice"));

        assert!(db.user_by_link_code("nosuchcode0").unwrap().is_none());
    }

    #[test]
    fn upsert_keeps_code_stable_and_refreshes_metadata() {
        let db = db();
        db.upsert_user(100, Some("alice"), None, "code0000001", NOW)
            .unwrap();
        db.upsert_user(100, Some("alice_new"), Some("Alice"), "code0000001", NOW)
            .unwrap();

        let user = db.get_user(100).unwrap().unwrap();
        assert_eq!(user.link_code, "code0000001");
        assert_eq!(user.username.as_deref(), Some("alice_new"));
        assert_eq!(user.first_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn regenerated_code_invalidates_old_one() {
        let db = db();
        db.upsert_user(100, None, None, "oldcode0001", NOW).unwrap();
        db.set_link_code(100, "newcode0001", NOW).unwrap();

        assert!(db.user_by_link_code("oldcode0001").unwrap().is_none());
        assert_eq!(
            db.user_by_link_code("newcode0001").unwrap().unwrap().user_id,
            100
        );
    }

    #[test]
    fn colliding_code_is_a_unique_violation() {
        let db = db();
        db.upsert_user(100, None, None, "samecode000", NOW).unwrap();
        let err = db.set_link_code(200, "samecode000", NOW).unwrap_err();
        assert!(is_unique_violation(&err));
        // Retry with a fresh code succeeds.
        db.set_link_code(200, "othercode00", NOW).unwrap();
    }

    #[test]
    fn check_violation_is_not_a_code_collision() {
        let db = db();
        let err = db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO messages (sender_id, recipient_id, kind, content, created_at)
                     VALUES (1, 2, 'sticker', 'x', ?1)",
                    [NOW],
                )?;
                Ok(())
            })
            .unwrap_err();
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn strip_profiles_keeps_link_codes() {
        let db = db();
        db.upsert_user(100, Some("alice"), Some("Alice"), "keepme00001", NOW)
            .unwrap();
        db.strip_user_profiles().unwrap();

        let user = db.get_user(100).unwrap().unwrap();
        assert!(user.username.is_none());
        assert!(user.first_name.is_none());
        assert!(user.last_active.is_none());
        assert_eq!(user.link_code, "keepme00001");
    }

    #[test]
    fn message_roundtrip_and_delivery_ref() {
        let db = db();
        let id = db
            .insert_message(200, 100, &payload("hello"), None, NOW)
            .unwrap();

        let row = db.message_by_id(id).unwrap().unwrap();
        assert_eq!(row.sender_id, 200);
        assert_eq!(row.recipient_id, 100);
        assert_eq!(row.kind, MessageKind::Text.as_str());
        assert_eq!(row.content, "hello");
        assert!(!row.read);
        assert!(row.tg_message_id.is_none());

        db.set_delivery_ref(id, 555).unwrap();
        // Idempotent second backfill with the same value.
        db.set_delivery_ref(id, 555).unwrap();

        let row = db.message_by_delivery_ref(100, 555).unwrap().unwrap();
        assert_eq!(row.id, id);
        // Same platform id in a different chat does not resolve.
        assert!(db.message_by_delivery_ref(300, 555).unwrap().is_none());
    }

    #[test]
    fn counts_by_side_and_since() {
        let db = db();
        db.insert_message(200, 100, &payload("a"), None, "2025-05-31T23:00:00Z")
            .unwrap();
        db.insert_message(200, 100, &payload("b"), None, "2025-06-01T08:00:00Z")
            .unwrap();
        db.insert_message(100, 200, &payload("c"), None, "2025-06-01T09:00:00Z")
            .unwrap();

        assert_eq!(db.count_received(100, None).unwrap(), 2);
        assert_eq!(db.count_sent(100, None).unwrap(), 1);
        assert_eq!(
            db.count_received(100, Some("2025-06-01T00:00:00Z")).unwrap(),
            1
        );
        assert_eq!(db.count_sent(200, None).unwrap(), 2);
        assert_eq!(db.count_received(999, None).unwrap(), 0);
    }

    #[test]
    fn block_list_lifecycle() {
        let db = db();
        assert!(!db.is_blocked(100, 200).unwrap());

        db.add_block(100, 200, NOW).unwrap();
        assert!(db.is_blocked(100, 200).unwrap());
        // Direction matters.
        assert!(!db.is_blocked(200, 100).unwrap());

        // Idempotent re-add.
        db.add_block(100, 200, NOW).unwrap();
        assert!(db.is_blocked(100, 200).unwrap());

        assert!(db.remove_block(100, 200).unwrap());
        assert!(!db.is_blocked(100, 200).unwrap());
        assert!(!db.remove_block(100, 200).unwrap());
    }

    #[test]
    fn clear_blocks_reports_whether_list_was_empty() {
        let db = db();
        assert!(!db.clear_blocks(100).unwrap());

        db.add_block(100, 200, NOW).unwrap();
        db.add_block(100, 300, NOW).unwrap();
        assert!(db.clear_blocks(100).unwrap());
        assert!(!db.is_blocked(100, 200).unwrap());
        assert!(!db.is_blocked(100, 300).unwrap());
    }

    #[test]
    fn admin_wipe_clears_messages_and_blocks() {
        let db = db();
        db.insert_message(200, 100, &payload("x"), None, NOW).unwrap();
        db.add_block(100, 200, NOW).unwrap();

        assert_eq!(db.delete_all_messages().unwrap(), 1);
        assert_eq!(db.delete_all_blocks().unwrap(), 1);
        assert_eq!(db.count_received(100, None).unwrap(), 0);
        assert!(!db.is_blocked(100, 200).unwrap());
    }
}
