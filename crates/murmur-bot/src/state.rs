use std::sync::Arc;

use murmur_db::Database;

use crate::config::Config;
use crate::sessions::Sessions;

pub type AppCtx = Arc<AppStateInner>;

/// Everything a handler needs, constructed once in `main` and injected into
/// the dispatch tree. No ambient globals.
pub struct AppStateInner {
    pub db: Database,
    pub sessions: Sessions,
    pub cfg: Config,
    /// Fetched via `get_me` at startup; used to build t.me share links.
    pub bot_username: String,
}
