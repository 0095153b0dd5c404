use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::CalendarConfig;
use crate::dates::month_grid;
use crate::models::DailySnapshot;
use crate::traits::Clock;

/// Visual state of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTier {
    /// Every mission done.
    Complete,
    /// At or above the high threshold (60% by default).
    High,
    /// Below high, at or above the medium threshold (30% by default).
    Medium,
    /// Something done, below medium.
    Low,
    /// Nothing done, or no data.
    Empty,
}

impl CompletionTier {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompletionTier::Complete => "★",
            CompletionTier::High => "▓",
            CompletionTier::Medium => "▒",
            CompletionTier::Low => "░",
            CompletionTier::Empty => "·",
        }
    }
}

pub fn tier_for(completed: u32, total: u32, thresholds: &CalendarConfig) -> CompletionTier {
    if total == 0 || completed == 0 {
        return CompletionTier::Empty;
    }
    if completed >= total {
        return CompletionTier::Complete;
    }
    let percent = completed as f64 / total as f64 * 100.0;
    if percent >= thresholds.high_tier_percent {
        CompletionTier::High
    } else if percent >= thresholds.medium_tier_percent {
        CompletionTier::Medium
    } else {
        CompletionTier::Low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub completed: u32,
    pub total: u32,
    pub tier: CompletionTier,
}

/// Monday-first month grid; `None` cells pad the first and last weeks.
pub fn month_view(
    year: i32,
    month: u32,
    snapshots: &[DailySnapshot],
    thresholds: &CalendarConfig,
) -> Option<Vec<Option<CalendarCell>>> {
    let by_date: HashMap<NaiveDate, &DailySnapshot> =
        snapshots.iter().map(|s| (s.date, s)).collect();

    let grid = month_grid(year, month)?;
    Some(
        grid.into_iter()
            .map(|slot| {
                slot.map(|date| {
                    let (completed, total) = by_date
                        .get(&date)
                        .map_or((0, 0), |s| (s.completed_count, s.total_count));
                    CalendarCell {
                        date,
                        completed,
                        total,
                        tier: tier_for(completed, total, thresholds),
                    }
                })
            })
            .collect(),
    )
}

/// Text rendering of a month view, one week per line.
pub fn render_month(cells: &[Option<CalendarCell>]) -> String {
    let mut out = String::from(" Mo  Tu  We  Th  Fr  Sa  Su\n");
    for week in cells.chunks(7) {
        let line: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                Some(c) => format!("{:>3}{}", c.date.day(), c.tier.symbol()),
                None => "    ".to_string(),
            })
            .collect();
        out.push_str(line.join("").trim_end());
        out.push('\n');
    }
    out
}

/// Write the month's cells to a timestamped CSV file in `output_dir`.
pub async fn export_month_csv<C: Clock + ?Sized>(
    cells: &[Option<CalendarCell>],
    output_dir: &Path,
    clock: &C,
) -> Result<PathBuf> {
    let rows: Vec<CalendarCell> = cells.iter().flatten().cloned().collect();
    let first = rows.first().map(|c| c.date.format("%Y%m").to_string());

    let filename = format!(
        "missions_{}_{}.csv",
        first.unwrap_or_else(|| "empty".to_string()),
        clock.now_utc().format("%Y%m%d_%H%M%S")
    );
    let output_path = output_dir.join(&filename);

    let path = output_path.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut wtr = csv::Writer::from_path(&path).context("Failed to create CSV writer")?;
        for row in rows {
            wtr.serialize(row).context("Failed to serialize calendar row")?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    })
    .await
    .context("CSV export task failed")??;

    Ok(output_path)
}
