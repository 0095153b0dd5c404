use chrono::NaiveDate;
use serde_json::json;

use super::{DAILY_SNAPSHOTS, RPC_DECREMENT_COMPLETED, RPC_INCREMENT_COMPLETED, Store};
use crate::api::Query;
use crate::dates::format_date;
use crate::error::AppResult;
use crate::models::{DailySnapshot, NewDailySnapshot, SnapshotMission};

impl Store {
    /// Snapshot for one day; `None` when the day has not been frozen yet.
    pub async fn snapshot_for_date(&self, date: NaiveDate) -> AppResult<Option<DailySnapshot>> {
        let query = Query::new()
            .select("*")
            .eq("user_id", &self.user_id)
            .eq("date", format_date(date));
        self.client.select_optional(DAILY_SNAPSHOTS, &query).await
    }

    /// Snapshots between `start` and `end` inclusive, oldest first.
    pub async fn snapshots_in_range(&self, start: NaiveDate, end: NaiveDate) -> AppResult<Vec<DailySnapshot>> {
        let query = Query::new()
            .select("*")
            .eq("user_id", &self.user_id)
            .gte("date", format_date(start))
            .lte("date", format_date(end))
            .order("date", true);
        self.client.select(DAILY_SNAPSHOTS, &query).await
    }

    /// Freeze `missions` as the list for `date`.
    pub async fn create_snapshot(
        &self,
        date: NaiveDate,
        missions: &[SnapshotMission],
        completed_count: u32,
    ) -> AppResult<DailySnapshot> {
        let row = NewDailySnapshot {
            user_id: &self.user_id,
            date,
            missions,
            completed_count,
            total_count: missions.len() as u32,
        };
        self.client.insert(DAILY_SNAPSHOTS, &row).await
    }

    /// Replace the frozen mission list of an existing snapshot.
    pub async fn replace_snapshot_missions(
        &self,
        date: NaiveDate,
        missions: &[SnapshotMission],
    ) -> AppResult<Vec<DailySnapshot>> {
        let query = Query::new()
            .eq("user_id", &self.user_id)
            .eq("date", format_date(date));
        let body = json!({ "missions": missions, "total_count": missions.len() });
        self.client.update(DAILY_SNAPSHOTS, &query, &body).await
    }

    /// Atomic server-side `completed_count + 1`; returns the new count.
    pub async fn increment_completed(&self, date: NaiveDate) -> AppResult<u32> {
        let args = json!({ "p_user_id": self.user_id, "p_date": format_date(date) });
        self.client.rpc(RPC_INCREMENT_COMPLETED, &args).await
    }

    /// Atomic server-side `completed_count - 1` (floored at zero).
    pub async fn decrement_completed(&self, date: NaiveDate) -> AppResult<u32> {
        let args = json!({ "p_user_id": self.user_id, "p_date": format_date(date) });
        self.client.rpc(RPC_DECREMENT_COMPLETED, &args).await
    }
}
