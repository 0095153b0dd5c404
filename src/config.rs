use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub network: NetworkConfig,
    pub user: UserConfig,
    pub popup: PopupConfig,
    pub calendar: CalendarConfig,
    pub badges: BadgeConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    /// Session token issued by the hosted auth service.
    pub access_token: Option<String>,
    pub image_bucket: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UserConfig {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PopupConfig {
    /// How long a badge popup stays up before dismissing itself.
    pub display_secs: u64,
    /// Fade-out delay between the dismissal trigger and the sequencer close.
    pub fade_ms: u64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            display_secs: 3,
            fade_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalendarConfig {
    pub high_tier_percent: f64,
    pub medium_tier_percent: f64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            high_tier_percent: 60.0,
            medium_tier_percent: 30.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BadgeConfig {
    /// Badge awarded when every mission of the day is done.
    pub daily_badge_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ValidationConfig {
    pub max_image_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let backend_url = std::env::var("MISSION_BACKEND_URL")
            .context("MISSION_BACKEND_URL must be set (via .env file or environment variable)")?;
        let anon_key = std::env::var("MISSION_ANON_KEY")
            .context("MISSION_ANON_KEY must be set (via .env file or environment variable)")?;

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mission-tracker");

        let builder = Config::builder()
            // Backend (url and key loaded from environment above)
            .set_default("backend.url", backend_url)?
            .set_default("backend.anon_key", anon_key)?
            .set_default("backend.access_token", None::<String>)?
            .set_default("backend.image_bucket", "badge-images")?
            // Network
            .set_default("network.request_timeout_secs", 30)?
            .set_default("network.connect_timeout_secs", 10)?
            // User
            .set_default("user.user_id", None::<String>)?
            // Popup
            .set_default("popup.display_secs", 3)?
            .set_default("popup.fade_ms", 300)?
            // Calendar tiers
            .set_default("calendar.high_tier_percent", 60.0)?
            .set_default("calendar.medium_tier_percent", 30.0)?
            // Badges
            .set_default("badges.daily_badge_id", None::<String>)?
            // Validation
            .set_default("validation.max_image_bytes", 5 * 1024 * 1024)?
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // MISSION__USER__USER_ID=...
            .add_source(Environment::with_prefix("MISSION").separator("__"));

        let s = builder.build()?;
        Ok(s.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Environment is process-global; config tests take this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        // SAFETY: guarded by ENV_LOCK
        for (key, value) in vars {
            unsafe {
                std::env::set_var(key, value);
            }
        }
        let result = f();
        for (key, _) in vars {
            unsafe {
                std::env::remove_var(key);
            }
        }
        result
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("MISSION_BACKEND_URL", "https://example.supabase.co"),
        ("MISSION_ANON_KEY", "anon-key"),
    ];

    #[test]
    fn test_network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_popup_config_defaults() {
        let config = PopupConfig::default();
        assert_eq!(config.display_secs, 3);
        assert_eq!(config.fade_ms, 300);
    }

    #[test]
    fn test_calendar_tiers_are_ordered() {
        let config = CalendarConfig::default();
        assert!(config.medium_tier_percent < config.high_tier_percent);
        assert!(config.high_tier_percent <= 100.0);
    }

    #[test]
    fn test_config_load_with_defaults() {
        let config = with_env_vars(&REQUIRED, || AppConfig::load().expect("Config should load"));
        assert_eq!(config.backend.url, "https://example.supabase.co");
        assert_eq!(config.backend.anon_key, "anon-key");
        assert_eq!(config.backend.image_bucket, "badge-images");
        assert!(config.backend.access_token.is_none());
        assert_eq!(config.popup.display_secs, 3);
        assert_eq!(config.validation.max_image_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_env_var_overrides_user_and_popup() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("MISSION__USER__USER_ID", "child-1"));
        vars.push(("MISSION__POPUP__DISPLAY_SECS", "5"));

        let config = with_env_vars(&vars, || AppConfig::load().expect("Config should load"));

        assert_eq!(config.user.user_id.as_deref(), Some("child-1"));
        assert_eq!(config.popup.display_secs, 5);
    }

    #[test]
    fn test_missing_backend_url_fails() {
        let result = with_env_vars(&[("MISSION_ANON_KEY", "anon-key")], AppConfig::load);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("MISSION_BACKEND_URL"));
    }
}
