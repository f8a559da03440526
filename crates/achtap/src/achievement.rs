//! Typed achievement records produced by the schema resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, FromRepr, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum AchievementStatus {
    #[default]
    #[strum(serialize = "INVALID")]
    Invalid = 0,
    #[strum(serialize = "UNFINISHED")]
    Unfinished = 1,
    #[strum(serialize = "FINISHED")]
    Finished = 2,
    #[strum(serialize = "REWARD_TAKEN")]
    RewardTaken = 3,
}

impl AchievementStatus {
    /// Map a raw wire value; anything outside 0..=3 has no status.
    pub fn from_raw(value: u32) -> Option<Self> {
        u8::try_from(value).ok().and_then(Self::from_repr)
    }

    pub fn short_name(&self) -> &'static str {
        self.into()
    }

    /// Finished or reward already taken.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Finished | Self::RewardTaken)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementItem {
    pub id: u32,
    pub total_progress: u32,
    pub current_progress: u32,
    pub finish_timestamp: u32,
    pub status: AchievementStatus,
}

impl AchievementItem {
    /// Completion time, if the achievement carries one.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        if self.finish_timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp(i64::from(self.finish_timestamp), 0)
    }
}
