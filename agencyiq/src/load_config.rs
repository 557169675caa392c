/// `load_config` module: loads the static YAML config and injects the session
/// secret from the environment.
///
/// This is the only place where user-supplied YAML is parsed. Everything past
/// this point works with typed sections and resolved defaults.
///
/// # Responsibilities
/// - Parse the YAML file into [`CliConfig`], filling optional keys with defaults
/// - Inject `AGENCYIQ_SESSION_COOKIE` (never stored in the file)
/// - Reject values the core cannot work with (empty base URL, zero timeouts,
///   zero ceiling or window)
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use agencyiq_core::calendar::CALENDAR_WINDOW_DAYS;
use agencyiq_core::post::Platform;
use agencyiq_core::quota::DEFAULT_GENERATION_CEILING;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const SESSION_COOKIE_ENV: &str = "AGENCYIQ_SESSION_COOKIE";

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api: ApiSection,
    pub schedule: ScheduleSection,
    pub calendar: CalendarSection,
    pub session_cookie: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_video_timeout")]
    pub video_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_ceiling")]
    pub ceiling: u32,
    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            ceiling: default_ceiling(),
            platforms: default_platforms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSection {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_video_timeout() -> u64 {
    300
}

fn default_ceiling() -> u32 {
    DEFAULT_GENERATION_CEILING
}

fn default_platforms() -> Vec<Platform> {
    Platform::ALL.to_vec()
}

fn default_window_days() -> u32 {
    CALENDAR_WINDOW_DAYS
}

/// Loads a static YAML config file (no secrets) and injects the session cookie
/// from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Deserialize)]
    struct RawConfig {
        api: ApiSection,
        #[serde(default)]
        schedule: ScheduleSection,
        #[serde(default)]
        calendar: CalendarSection,
    }

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.api.base_url.trim().is_empty() {
        bail!("Failed to parse config YAML: api.base_url must not be empty");
    }
    if raw.api.request_timeout_secs == 0 || raw.api.video_timeout_secs == 0 {
        bail!("Failed to parse config YAML: timeouts must be at least one second");
    }
    if raw.schedule.ceiling == 0 {
        bail!("Failed to parse config YAML: schedule.ceiling must be at least 1");
    }
    if raw.calendar.window_days == 0 {
        bail!("Failed to parse config YAML: calendar.window_days must be at least 1");
    }

    let session_cookie = match std::env::var(SESSION_COOKIE_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            error!(env = SESSION_COOKIE_ENV, "Session cookie missing from environment");
            bail!("{SESSION_COOKIE_ENV} environment variable not set");
        }
    };

    info!(
        base_url = %raw.api.base_url,
        ceiling = raw.schedule.ceiling,
        platforms = ?raw.schedule.platforms,
        window_days = raw.calendar.window_days,
        "Configuration loaded"
    );

    Ok(CliConfig {
        api: raw.api,
        schedule: raw.schedule,
        calendar: raw.calendar,
        session_cookie,
    })
}
