/// Database row types — these map directly to SQLite rows.
/// Distinct from murmur-types domain models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub link_code: String,
    pub last_active: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub kind: String,
    pub content: String,
    pub caption: Option<String>,
    pub reply_to_tg_id: Option<i64>,
    pub tg_message_id: Option<i64>,
    pub read: bool,
    pub created_at: String,
}
