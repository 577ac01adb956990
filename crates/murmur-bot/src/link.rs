use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use murmur_db::Database;
use murmur_db::queries::is_unique_violation;
use rand::RngCore;
use tracing::warn;

/// 8 random bytes → 11 characters over the url-safe base64 alphabet.
const CODE_BYTES: usize = 8;
const MAX_CODE_RETRIES: usize = 5;

pub fn generate_code() -> String {
    let mut buf = [0u8; CODE_BYTES];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// getOrCreateLinkCode: returns the user's stable code, issuing a fresh one
/// for first-time users, and refreshes display metadata either way.
pub fn ensure_code(
    db: &Database,
    user_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
) -> Result<String> {
    let now = now_rfc3339();

    if let Some(user) = db.get_user(user_id)? {
        db.upsert_user(user_id, username, first_name, &user.link_code, &now)?;
        return Ok(user.link_code);
    }

    for _ in 0..MAX_CODE_RETRIES {
        let code = generate_code();
        match db.upsert_user(user_id, username, first_name, &code, &now) {
            Ok(()) => return Ok(code),
            Err(e) if is_unique_violation(&e) => {
                warn!(user_id, "link code collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    bail!("could not issue a unique link code after {MAX_CODE_RETRIES} attempts")
}

/// Unconditionally replaces the user's code; the old one stops resolving.
pub fn regenerate_code(db: &Database, user_id: i64) -> Result<String> {
    let now = now_rfc3339();

    for _ in 0..MAX_CODE_RETRIES {
        let code = generate_code();
        match db.set_link_code(user_id, &code, &now) {
            Ok(()) => return Ok(code),
            Err(e) if is_unique_violation(&e) => {
                warn!(user_id, "link code collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    bail!("could not issue a unique link code after {MAX_CODE_RETRIES} attempts")
}
