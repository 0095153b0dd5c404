use chrono::NaiveDate;

use super::{MISSION_LOGS, Store};
use crate::api::Query;
use crate::dates::format_date;
use crate::error::AppResult;
use crate::models::{MissionLog, NewMissionLog};

impl Store {
    pub async fn logs_for_date(&self, date: NaiveDate) -> AppResult<Vec<MissionLog>> {
        let query = Query::new()
            .select("*")
            .eq("user_id", &self.user_id)
            .eq("completed_date", format_date(date));
        self.client.select(MISSION_LOGS, &query).await
    }

    /// Logs between `start` and `end`, both inclusive.
    pub async fn logs_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<MissionLog>> {
        let query = Query::new()
            .select("*")
            .eq("user_id", &self.user_id)
            .gte("completed_date", format_date(start))
            .lte("completed_date", format_date(end))
            .order("completed_date", true);
        self.client.select(MISSION_LOGS, &query).await
    }

    /// Total number of completions ever recorded.
    pub async fn total_completions(&self) -> AppResult<usize> {
        let query = Query::new().select("id").eq("user_id", &self.user_id);
        let rows: Vec<serde_json::Value> = self.client.select(MISSION_LOGS, &query).await?;
        Ok(rows.len())
    }

    pub async fn insert_log(&self, mission_id: &str, date: NaiveDate) -> AppResult<MissionLog> {
        let row = NewMissionLog {
            user_id: &self.user_id,
            mission_id,
            completed_date: date,
        };
        self.client.insert(MISSION_LOGS, &row).await
    }

    pub async fn delete_log(&self, mission_id: &str, date: NaiveDate) -> AppResult<()> {
        let query = Query::new()
            .eq("user_id", &self.user_id)
            .eq("mission_id", mission_id)
            .eq("completed_date", format_date(date));
        self.client.delete(MISSION_LOGS, &query).await
    }
}
