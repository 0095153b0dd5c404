use super::{CHALLENGES, Store};
use crate::api::Query;
use crate::error::AppResult;
use crate::models::{Challenge, ConditionType, NewChallenge};

impl Store {
    /// Global challenges plus the ones this user defined.
    pub async fn list_challenges(&self) -> AppResult<Vec<Challenge>> {
        let query = Query::new()
            .select("*")
            .or(&format!("is_global.eq.true,created_by.eq.{}", self.user_id))
            .order("required_count", true);
        self.client.select(CHALLENGES, &query).await
    }

    pub async fn create_challenge(
        &self,
        name: &str,
        description: Option<&str>,
        badge_id: &str,
        condition_type: ConditionType,
        required_count: u32,
    ) -> AppResult<Challenge> {
        let row = NewChallenge {
            name,
            description,
            badge_id,
            condition_type,
            required_count,
            created_by: &self.user_id,
            is_global: false,
        };
        self.client.insert(CHALLENGES, &row).await
    }

    /// Deletes only challenges owned by this user.
    pub async fn delete_challenge(&self, challenge_id: &str) -> AppResult<()> {
        let query = Query::new()
            .eq("id", challenge_id)
            .eq("created_by", &self.user_id);
        self.client.delete(CHALLENGES, &query).await
    }
}
