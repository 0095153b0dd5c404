use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use super::{BADGES, EARNED_BADGES, Store, WEEKLY_BADGE_SETTINGS};
use crate::api::Query;
use crate::error::AppResult;
use crate::models::{Badge, BadgeType, EarnedBadge, NewBadge, NewEarnedBadge, WeeklyBadgeSetting};
use crate::traits::BadgeSource;

#[derive(Serialize)]
struct NewWeeklyBadgeSetting<'a> {
    user_id: &'a str,
    badge_id: &'a str,
}

impl Store {
    pub async fn fetch_badge(&self, badge_id: &str) -> AppResult<Option<Badge>> {
        let query = Query::new().select("*").eq("id", badge_id);
        self.client.select_optional(BADGES, &query).await
    }

    /// Global catalog plus badges this user created.
    pub async fn list_badges(&self) -> AppResult<Vec<Badge>> {
        let query = Query::new()
            .select("*")
            .or(&format!("created_by.is.null,created_by.eq.{}", self.user_id))
            .order("name", true);
        self.client.select(BADGES, &query).await
    }

    /// Register a catalog entry whose image already lives in the bucket.
    pub async fn create_badge(
        &self,
        name: &str,
        description: Option<&str>,
        image_path: Option<&str>,
        badge_type: BadgeType,
    ) -> AppResult<Badge> {
        let row = NewBadge {
            name,
            description,
            image_path,
            badge_type,
            created_by: &self.user_id,
        };
        self.client.insert(BADGES, &row).await
    }

    pub fn badge_image_url(&self, badge: &Badge) -> Option<String> {
        badge
            .image_path
            .as_deref()
            .map(|path| self.client.public_url(&self.image_bucket, path))
    }

    pub async fn earned_badges(&self) -> AppResult<Vec<EarnedBadge>> {
        let query = Query::new()
            .select("*")
            .eq("user_id", &self.user_id)
            .order("earned_at", false);
        self.client.select(EARNED_BADGES, &query).await
    }

    pub async fn award_badge(
        &self,
        badge_id: &str,
        badge_type: BadgeType,
        earned_at: DateTime<Utc>,
        reward_text: Option<&str>,
    ) -> AppResult<EarnedBadge> {
        let row = NewEarnedBadge {
            user_id: &self.user_id,
            badge_id,
            badge_type,
            earned_at,
            reward_text,
            reward_used: false,
        };
        self.client.insert(EARNED_BADGES, &row).await
    }

    pub async fn mark_reward_used(&self, earned_id: &str) -> AppResult<Vec<EarnedBadge>> {
        let query = Query::new()
            .eq("id", earned_id)
            .eq("user_id", &self.user_id);
        self.client
            .update(EARNED_BADGES, &query, &json!({ "reward_used": true }))
            .await
    }

    /// Whether `badge_id` was earned in `[start, end)`.
    pub async fn has_earned_between(
        &self,
        badge_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<bool> {
        let query = Query::new()
            .select("id")
            .eq("user_id", &self.user_id)
            .eq("badge_id", badge_id)
            .gte("earned_at", start.to_rfc3339())
            .lt("earned_at", end.to_rfc3339());
        let rows: Vec<serde_json::Value> = self.client.select(EARNED_BADGES, &query).await?;
        Ok(!rows.is_empty())
    }

    pub async fn weekly_badge_choices(&self) -> AppResult<Vec<WeeklyBadgeSetting>> {
        let query = Query::new().select("*").eq("user_id", &self.user_id);
        self.client.select(WEEKLY_BADGE_SETTINGS, &query).await
    }

    /// Replace the set of badges offered after a completed week.
    pub async fn set_weekly_badge_choices(&self, badge_ids: &[String]) -> AppResult<()> {
        self.client
            .delete(WEEKLY_BADGE_SETTINGS, &Query::new().eq("user_id", &self.user_id))
            .await?;
        let rows: Vec<NewWeeklyBadgeSetting<'_>> = badge_ids
            .iter()
            .map(|badge_id| NewWeeklyBadgeSetting {
                user_id: &self.user_id,
                badge_id,
            })
            .collect();
        self.client.insert_many(WEEKLY_BADGE_SETTINGS, &rows).await
    }
}

impl BadgeSource for Store {
    async fn fetch_badge(&self, id: &str) -> AppResult<Option<Badge>> {
        Store::fetch_badge(self, id).await
    }
}
