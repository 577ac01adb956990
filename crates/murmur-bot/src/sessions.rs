use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Ephemeral per-user conversation state: "the next message this user sends
/// goes to `target`". Set when a user follows someone's share link, cleared
/// once the pending send resolves. Entries expire after a TTL so abandoned
/// compositions do not linger forever.
pub struct Sessions {
    inner: Mutex<HashMap<i64, Pending>>,
    ttl: Duration,
}

struct Pending {
    target: i64,
    set_at: Instant,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn set_target(&self, user_id: i64, target: i64) {
        let mut map = self.inner.lock().expect("sessions lock");
        // Evict stale entries from link-followers who never sent anything,
        // so the map does not grow for the process lifetime.
        map.retain(|_, p| p.set_at.elapsed() <= self.ttl);
        map.insert(
            user_id,
            Pending {
                target,
                set_at: Instant::now(),
            },
        );
    }

    /// Returns the pending target, dropping it if expired.
    pub fn target(&self, user_id: i64) -> Option<i64> {
        let mut map = self.inner.lock().expect("sessions lock");
        match map.get(&user_id) {
            Some(p) if p.set_at.elapsed() <= self.ttl => Some(p.target),
            Some(_) => {
                map.remove(&user_id);
                None
            }
            None => None,
        }
    }

    pub fn clear(&self, user_id: i64) {
        self.inner.lock().expect("sessions lock").remove(&user_id);
    }
}
