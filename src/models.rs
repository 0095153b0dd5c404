//! Row types exchanged with the backend.
//!
//! Field names follow the column names of the hosted tables, so every type
//! here serializes straight into a request body and deserializes straight
//! from a response row.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Child profile attached to the signed-in parent account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub child_name: Option<String>,
    pub pin: Option<String>,
    pub theme: Option<String>,
}

/// A live mission definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMission<'a> {
    pub user_id: &'a str,
    pub content: &'a str,
    pub order_index: i32,
}

/// One completion of one mission on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionLog {
    pub id: String,
    pub user_id: String,
    pub mission_id: String,
    pub completed_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMissionLog<'a> {
    pub user_id: &'a str,
    pub mission_id: &'a str,
    pub completed_date: NaiveDate,
}

/// Frozen copy of a mission inside a daily snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMission {
    pub id: String,
    pub content: String,
    pub order_index: i32,
}

impl From<&Mission> for SnapshotMission {
    fn from(mission: &Mission) -> Self {
        Self {
            id: mission.id.clone(),
            content: mission.content.clone(),
            order_index: mission.order_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub missions: Vec<SnapshotMission>,
    pub completed_count: u32,
    pub total_count: u32,
}

impl DailySnapshot {
    pub fn is_complete(&self) -> bool {
        self.total_count > 0 && self.completed_count >= self.total_count
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDailySnapshot<'a> {
    pub user_id: &'a str,
    pub date: NaiveDate,
    pub missions: &'a [SnapshotMission],
    pub completed_count: u32,
    pub total_count: u32,
}

/// Type tag of a catalog badge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BadgeType {
    Weekly,
    Mission,
    Challenge,
    Other(String),
}

impl BadgeType {
    pub fn as_str(&self) -> &str {
        match self {
            BadgeType::Weekly => "weekly",
            BadgeType::Mission => "mission",
            BadgeType::Challenge => "challenge",
            BadgeType::Other(tag) => tag,
        }
    }
}

impl From<&str> for BadgeType {
    fn from(tag: &str) -> Self {
        match tag {
            "weekly" => BadgeType::Weekly,
            "mission" => BadgeType::Mission,
            "challenge" => BadgeType::Challenge,
            other => BadgeType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BadgeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BadgeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(BadgeType::from(tag.as_str()))
    }
}

/// Catalog entry for a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Object path inside the badge image bucket.
    pub image_path: Option<String>,
    pub badge_type: BadgeType,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBadge<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub image_path: Option<&'a str>,
    pub badge_type: BadgeType,
    pub created_by: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub id: String,
    pub user_id: String,
    pub badge_id: String,
    pub badge_type: BadgeType,
    pub earned_at: DateTime<Utc>,
    pub reward_text: Option<String>,
    #[serde(default)]
    pub reward_used: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEarnedBadge<'a> {
    pub user_id: &'a str,
    pub badge_id: &'a str,
    pub badge_type: BadgeType,
    pub earned_at: DateTime<Utc>,
    pub reward_text: Option<&'a str>,
    pub reward_used: bool,
}

/// A badge the child may pick after completing a full week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBadgeSetting {
    pub id: String,
    pub user_id: String,
    pub badge_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Count of days on which every mission was completed.
    DailyCompletion,
    /// Count of fully completed Mon-Fri weeks.
    WeeklyCompletion,
    /// Count of individual mission completions.
    TotalCompletion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub badge_id: String,
    pub condition_type: ConditionType,
    pub required_count: u32,
    pub created_by: Option<String>,
    #[serde(default)]
    pub is_global: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewChallenge<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub badge_id: &'a str,
    pub condition_type: ConditionType,
    pub required_count: u32,
    pub created_by: &'a str,
    pub is_global: bool,
}
