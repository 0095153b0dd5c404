use serde_json::json;

use super::{PROFILES, Store};
use crate::api::Query;
use crate::error::AppResult;
use crate::models::Profile;

impl Store {
    pub async fn profile(&self) -> AppResult<Option<Profile>> {
        let query = Query::new().select("*").eq("id", &self.user_id);
        self.client.select_optional(PROFILES, &query).await
    }

    pub async fn update_child_name(&self, name: &str) -> AppResult<Vec<Profile>> {
        self.patch_profile(json!({ "child_name": name })).await
    }

    pub async fn update_pin(&self, pin: &str) -> AppResult<Vec<Profile>> {
        self.patch_profile(json!({ "pin": pin })).await
    }

    /// Stored theme preference; `None` when the profile has none.
    pub async fn theme(&self) -> AppResult<Option<String>> {
        Ok(self.profile().await?.and_then(|p| p.theme))
    }

    pub async fn set_theme(&self, theme: &str) -> AppResult<Vec<Profile>> {
        self.patch_profile(json!({ "theme": theme })).await
    }

    async fn patch_profile(&self, body: serde_json::Value) -> AppResult<Vec<Profile>> {
        let query = Query::new().eq("id", &self.user_id);
        self.client.update(PROFILES, &query, &body).await
    }
}
