//! Per-user activity statistics and the popularity ranking scan.
//!
//! The rank is recomputed from scratch on every request: every known user's
//! lifetime activity (received + sent) is counted and sorted. That is an
//! O(U) full scan per request, fine at this bot's scale but a known bound
//! if the user table ever grows large.

use anyhow::Result;
use chrono::{DateTime, Utc};
use murmur_db::Database;
use murmur_types::{PeriodStats, PopularityTier, RankStats, UserStats};

/// Start of the current UTC day, RFC 3339, for "today" counts.
fn utc_midnight(now: DateTime<Utc>) -> String {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc()
        .to_rfc3339()
}

pub fn compute(db: &Database, user_id: i64) -> Result<UserStats> {
    compute_at(db, user_id, Utc::now())
}

pub fn compute_at(db: &Database, user_id: i64, now: DateTime<Utc>) -> Result<UserStats> {
    let midnight = utc_midnight(now);

    let today = PeriodStats {
        messages: db.count_received(user_id, Some(&midnight))?,
        visits: db.count_sent(user_id, Some(&midnight))?,
    };
    let total = PeriodStats {
        messages: db.count_received(user_id, None)?,
        visits: db.count_sent(user_id, None)?,
    };

    let rank = compute_rank(db, user_id, total.messages + total.visits)?;

    Ok(UserStats { today, total, rank })
}

/// Orders every known user by lifetime activity, descending; ties are broken
/// by ascending user id so the ordering is deterministic.
fn compute_rank(db: &Database, user_id: i64, own_activity: u64) -> Result<RankStats> {
    let mut activities: Vec<(i64, u64)> = Vec::new();
    let mut seen_self = false;

    for uid in db.all_user_ids()? {
        let activity = if uid == user_id {
            seen_self = true;
            own_activity
        } else {
            db.count_received(uid, None)? + db.count_sent(uid, None)?
        };
        activities.push((uid, activity));
    }

    // A user asking for stats before their first upsert still gets a slot.
    if !seen_self {
        activities.push((user_id, own_activity));
    }

    activities.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let total_users = activities.len() as u64;
    let position = activities
        .iter()
        .position(|&(uid, _)| uid == user_id)
        .map(|i| i as u64 + 1)
        .unwrap_or(total_users);

    Ok(RankStats {
        position,
        total_users,
        tier: PopularityTier::from_rank(position, total_users),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use murmur_types::MessagePayload;

    fn seed_user(db: &Database, id: i64, code: &str) {
        db.upsert_user(id, None, None, code, "2025-06-01T00:00:00Z")
            .unwrap();
    }

    fn send(db: &Database, from: i64, to: i64, at: &str) {
        db.insert_message(from, to, &MessagePayload::text("m"), None, at)
            .unwrap();
    }

    #[test]
    fn today_counts_split_at_utc_midnight() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 100, "a00000000001");
        seed_user(&db, 200, "a00000000002");

        send(&db, 200, 100, "2025-05-31T23:59:00Z");
        send(&db, 200, 100, "2025-06-01T00:01:00Z");
        send(&db, 100, 200, "2025-06-01T10:00:00Z");

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let stats = compute_at(&db, 100, now).unwrap();

        assert_eq!(stats.today.messages, 1);
        assert_eq!(stats.today.visits, 1);
        assert_eq!(stats.total.messages, 2);
        assert_eq!(stats.total.visits, 1);
    }

    #[test]
    fn more_activity_ranks_better() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 100, "b00000000001");
        seed_user(&db, 200, "b00000000002");
        seed_user(&db, 300, "b00000000003");

        // 100 receives three messages, 200 receives one, 300 none.
        send(&db, 200, 100, "2025-06-01T01:00:00Z");
        send(&db, 300, 100, "2025-06-01T02:00:00Z");
        send(&db, 300, 100, "2025-06-01T03:00:00Z");
        send(&db, 100, 200, "2025-06-01T04:00:00Z");

        let now = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let r100 = compute_at(&db, 100, now).unwrap().rank;
        let r200 = compute_at(&db, 200, now).unwrap().rank;
        let r300 = compute_at(&db, 300, now).unwrap().rank;

        assert_eq!(r100.total_users, 3);
        assert_eq!(r100.position, 1);
        assert!(r200.position < r300.position);
        assert!(r300.position <= r300.total_users);
    }

    #[test]
    fn ties_break_by_user_id() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 200, "c00000000002");
        seed_user(&db, 100, "c00000000001");

        let now = Utc::now();
        assert_eq!(compute_at(&db, 100, now).unwrap().rank.position, 1);
        assert_eq!(compute_at(&db, 200, now).unwrap().rank.position, 2);
    }

    #[test]
    fn unknown_user_still_gets_a_valid_position() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, 100, "d00000000001");

        let rank = compute_at(&db, 999, Utc::now()).unwrap().rank;
        assert_eq!(rank.total_users, 2);
        assert!(rank.position >= 1 && rank.position <= rank.total_users);
    }
}
