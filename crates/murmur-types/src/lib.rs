pub mod payload;
pub mod stats;

pub use payload::{MessageKind, MessagePayload};
pub use stats::{PeriodStats, PopularityTier, RankStats, UserStats};
