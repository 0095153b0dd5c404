use serde_json::json;

use super::{MISSIONS, Store};
use crate::api::Query;
use crate::error::AppResult;
use crate::models::{Mission, NewMission};

impl Store {
    /// Live mission list in display order.
    pub async fn list_missions(&self) -> AppResult<Vec<Mission>> {
        let query = Query::new()
            .select("*")
            .eq("user_id", &self.user_id)
            .order("order_index", true);
        self.client.select(MISSIONS, &query).await
    }

    /// Append a mission after the current last one.
    pub async fn add_mission(&self, content: &str) -> AppResult<Mission> {
        let last: Option<Mission> = self
            .client
            .select_optional(
                MISSIONS,
                &Query::new()
                    .select("*")
                    .eq("user_id", &self.user_id)
                    .order("order_index", false),
            )
            .await?;
        let order_index = last.map_or(0, |m| m.order_index + 1);

        let row = NewMission {
            user_id: &self.user_id,
            content,
            order_index,
        };
        self.client.insert(MISSIONS, &row).await
    }

    pub async fn update_mission_content(&self, mission_id: &str, content: &str) -> AppResult<Vec<Mission>> {
        let query = Query::new()
            .eq("id", mission_id)
            .eq("user_id", &self.user_id);
        self.client
            .update(MISSIONS, &query, &json!({ "content": content }))
            .await
    }

    pub async fn delete_mission(&self, mission_id: &str) -> AppResult<()> {
        let query = Query::new()
            .eq("id", mission_id)
            .eq("user_id", &self.user_id);
        self.client.delete(MISSIONS, &query).await
    }

    /// Rewrite `order_index` so missions appear in the given id order.
    pub async fn reorder_missions(&self, ordered_ids: &[String]) -> AppResult<()> {
        for (index, id) in ordered_ids.iter().enumerate() {
            let query = Query::new().eq("id", id).eq("user_id", &self.user_id);
            let _: Vec<Mission> = self
                .client
                .update(MISSIONS, &query, &json!({ "order_index": index }))
                .await?;
        }
        Ok(())
    }
}
