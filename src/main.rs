use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mission_tracker::{
    AppConfig, ConsoleNotifier, MissionTracker, NotificationHandle, NotificationService, Store,
    SystemClock, TrackerSettings,
    calendar::{export_month_csv, render_month},
    config::PopupConfig,
    dates::parse_month,
    models::ConditionType,
    present_popup,
    traits::Clock,
};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "mission-tracker")]
#[command(about = "Daily missions, streaks and badges for a household routine")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's missions
    Missions,
    /// Add a mission to the live list
    Add { text: String },
    /// Change a mission's text
    Edit { id: String, text: String },
    /// Remove a mission from the live list
    Remove { id: String },
    /// Mark a mission done for today
    Done { id: String },
    /// Undo today's completion of a mission
    Undo { id: String },
    /// Show this week's Mon-Fri status and the current streak
    Week,
    /// Show a month calendar
    Calendar {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
        /// Write the month to a CSV file in this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List earned badges
    Badges,
    /// Claim a weekly badge after a completed week
    Choose {
        badge_id: String,
        #[arg(long)]
        reward: Option<String>,
    },
    /// Mark a badge reward as used
    Redeem { earned_id: String },
    /// Define a personal challenge
    Challenge {
        name: String,
        badge_id: String,
        #[arg(long, value_enum)]
        condition: Condition,
        #[arg(long)]
        count: u32,
        #[arg(long)]
        description: Option<String>,
    },
    /// Set the child's 4-digit PIN
    Pin { pin: String },
    /// Set the child's display name
    Rename { name: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Condition {
    Daily,
    Weekly,
    Total,
}

impl From<Condition> for ConditionType {
    fn from(c: Condition) -> Self {
        match c {
            Condition::Daily => ConditionType::DailyCompletion,
            Condition::Weekly => ConditionType::WeeklyCompletion,
            Condition::Total => ConditionType::TotalCompletion,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("mission_tracker=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Single-threaded: UI events, timers and fetches interleave on one thread.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(run(args.command, config))
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    let store = Store::from_config(&config).context("Failed to set up backend store")?;
    tracing::debug!("Backend store ready for user {}", store.user_id());

    let (notifications, service) = NotificationService::start(Arc::new(store.clone()));
    let presenter = tokio::spawn(present_badges(
        notifications.clone(),
        store.clone(),
        config.popup,
    ));

    let tracker = MissionTracker::new(
        store,
        Arc::new(SystemClock),
        Arc::new(ConsoleNotifier),
        notifications.clone(),
        TrackerSettings::from(&config),
    );

    let result = execute(&tracker, command).await;

    // Let queued badge popups play out before exiting.
    notifications.wait_settled().await;
    notifications.shutdown();
    let _ = service.await;
    presenter.abort();

    result
}

async fn execute(tracker: &MissionTracker, command: Command) -> Result<()> {
    match command {
        Command::Missions => {
            let view = tracker.today_missions().await?;
            println!("Missions for {}", view.date);
            for mission in &view.missions {
                let mark = if view.is_completed(&mission.id) { "x" } else { " " };
                println!("  [{}] {}  ({})", mark, mission.content, mission.id);
            }
            println!("{}/{} done", view.completed_count(), view.missions.len());
        }
        Command::Add { text } => {
            let mission = tracker.add_mission(&text).await?;
            println!("{}", mission.id);
        }
        Command::Edit { id, text } => tracker.edit_mission(&id, &text).await?,
        Command::Remove { id } => tracker.remove_mission(&id).await?,
        Command::Done { id } => {
            let outcome = tracker.complete_mission(&id).await?;
            for badge_id in &outcome.awarded {
                tracing::info!("Badge {} earned", badge_id);
            }
        }
        Command::Undo { id } => tracker.uncomplete_mission(&id).await?,
        Command::Week => {
            let week = tracker.weekly_status().await?;
            let line: Vec<String> = week
                .days
                .iter()
                .map(|d| format!("{} {}", d.date.format("%a"), d.status.symbol()))
                .collect();
            println!("{}", line.join("  "));
            println!("Streak: {} day(s)", week.streak);
            if week.complete {
                println!("Week complete! Pick a weekly badge with `choose`.");
            }
        }
        Command::Calendar { month, export } => {
            let (year, month) = match month {
                Some(m) => parse_month(&m).with_context(|| format!("Invalid month '{m}', expected YYYY-MM"))?,
                None => {
                    let today = SystemClock.today();
                    (chrono::Datelike::year(&today), chrono::Datelike::month(&today))
                }
            };
            let cells = tracker.month_calendar(year, month).await?;
            println!("{year}-{month:02}");
            print!("{}", render_month(&cells));
            if let Some(dir) = export {
                let path = export_month_csv(&cells, &dir, &SystemClock).await?;
                println!("Exported to {}", path.display());
            }
        }
        Command::Badges => {
            for (earned, badge) in tracker.badge_collection().await? {
                let name = badge.as_ref().map_or(earned.badge_id.as_str(), |b| b.name.as_str());
                let reward = match (&earned.reward_text, earned.reward_used) {
                    (Some(text), false) => format!("  reward: {text}"),
                    (Some(text), true) => format!("  reward: {text} (used)"),
                    (None, _) => String::new(),
                };
                println!(
                    "{}  {} [{}]{}  ({})",
                    earned.earned_at.format("%Y-%m-%d"),
                    name,
                    earned.badge_type,
                    reward,
                    earned.id
                );
            }
        }
        Command::Choose { badge_id, reward } => {
            tracker.choose_weekly_badge(&badge_id, reward.as_deref()).await?;
        }
        Command::Redeem { earned_id } => {
            if !tracker.redeem_reward(&earned_id).await? {
                anyhow::bail!("No reward with id {earned_id}");
            }
        }
        Command::Challenge {
            name,
            badge_id,
            condition,
            count,
            description,
        } => {
            tracker
                .create_challenge(&name, description.as_deref(), &badge_id, condition.into(), count)
                .await?;
        }
        Command::Pin { pin } => tracker.set_pin(&pin).await?,
        Command::Rename { name } => tracker.rename_child(&name).await?,
    }
    Ok(())
}

/// Show each badge that enters the display slot as a timed popup.
async fn present_badges(handle: NotificationHandle, store: Store, popup: PopupConfig) {
    let mut state = handle.subscribe();
    // No interactive dismissal in the CLI; popups always time out.
    let (_dismiss_tx, mut dismissals) = mpsc::unbounded_channel::<()>();
    let mut last_shown = 0;

    loop {
        let badge = match state
            .wait_for(|s| s.displayed > last_shown && s.current.is_some())
            .await
        {
            Ok(s) => {
                last_shown = s.displayed;
                s.current.clone()
            }
            Err(_) => break,
        };
        let Some(badge) = badge else { continue };

        println!();
        println!("🏅 Badge earned: {}", badge.name);
        if let Some(description) = &badge.description {
            println!("   {description}");
        }
        if let Some(url) = store.badge_image_url(&badge) {
            println!("   {url}");
        }

        let closer = handle.clone();
        present_popup(&popup, &mut dismissals, move || closer.close()).await;
    }
}
