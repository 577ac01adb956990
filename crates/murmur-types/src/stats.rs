use serde::{Deserialize, Serialize};

/// Received-message and link-visit counts over one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub messages: u64,
    pub visits: u64,
}

/// Where a user sits in the activity ordering of all known users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankStats {
    /// 1-based position, always within `1..=total_users`.
    pub position: u64,
    pub total_users: u64,
    pub tier: PopularityTier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub today: PeriodStats,
    pub total: PeriodStats,
    pub rank: RankStats,
}

/// Step function of `position / total_users * 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopularityTier {
    Top1,
    Top5,
    Top10,
    Top25,
    Top50,
    Bottom,
}

impl PopularityTier {
    pub fn from_rank(position: u64, total_users: u64) -> Self {
        let total = total_users.max(1);
        let pct = position as f64 / total as f64 * 100.0;
        if pct <= 1.0 {
            PopularityTier::Top1
        } else if pct <= 5.0 {
            PopularityTier::Top5
        } else if pct <= 10.0 {
            PopularityTier::Top10
        } else if pct <= 25.0 {
            PopularityTier::Top25
        } else if pct <= 50.0 {
            PopularityTier::Top50
        } else {
            PopularityTier::Bottom
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PopularityTier::Top1 => "🏆 Top 1%",
            PopularityTier::Top5 => "💫 Top 5%",
            PopularityTier::Top10 => "⭐️ Top 10%",
            PopularityTier::Top25 => "🌟 Top 25%",
            PopularityTier::Top50 => "✨ Top 50%",
            PopularityTier::Bottom => "💭 Top 100%",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(PopularityTier::from_rank(1, 100), PopularityTier::Top1);
        assert_eq!(PopularityTier::from_rank(2, 100), PopularityTier::Top5);
        assert_eq!(PopularityTier::from_rank(5, 100), PopularityTier::Top5);
        assert_eq!(PopularityTier::from_rank(10, 100), PopularityTier::Top10);
        assert_eq!(PopularityTier::from_rank(25, 100), PopularityTier::Top25);
        assert_eq!(PopularityTier::from_rank(50, 100), PopularityTier::Top50);
        assert_eq!(PopularityTier::from_rank(51, 100), PopularityTier::Bottom);
        assert_eq!(PopularityTier::from_rank(100, 100), PopularityTier::Bottom);
    }

    #[test]
    fn single_user_is_bottom() {
        // 1/1 = 100% — the only user is also the least popular.
        assert_eq!(PopularityTier::from_rank(1, 1), PopularityTier::Bottom);
    }
}
