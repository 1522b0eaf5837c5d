use std::path::Path;

use chrono::{NaiveDateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "aging.toml";

/// Prefix for environment overrides, e.g. `AGING__RETENTION__TIMEZONE`.
pub const ENV_PREFIX: &str = "AGING__";

/// Settings applied to every retention run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// First day of a weekly slot, 0 = Monday ... 6 = Sunday.
    ///
    /// Env: AGING__RETENTION__WEEK_ANCHOR_DAY
    #[serde(default = "default_week_anchor_day")]
    pub week_anchor_day: u8,

    /// IANA timezone used to read the wall clock. System local time if unset.
    ///
    /// Env: AGING__RETENTION__TIMEZONE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

fn default_week_anchor_day() -> u8 {
    6 // Sunday
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            week_anchor_day: default_week_anchor_day(),
            timezone: None,
        }
    }
}

impl RetentionSettings {
    /// Configured week anchor as a weekday.
    pub fn week_anchor(&self) -> Result<Weekday, ConfigError> {
        Weekday::try_from(self.week_anchor_day)
            .map_err(|_| ConfigError::InvalidWeekAnchor(self.week_anchor_day))
    }

    /// Parsed timezone, `None` meaning system local time.
    pub fn tz(&self) -> Result<Option<Tz>, ConfigError> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|e| ConfigError::InvalidTimezone {
                        timezone: name.to_string(),
                        message: e.to_string(),
                    })
            })
            .transpose()
    }

    /// Current wall-clock time in the configured timezone.
    ///
    /// Backup names carry local wall-clock timestamps, so slots are
    /// computed on naive local time as well.
    pub fn wall_clock_now(&self) -> Result<NaiveDateTime, ConfigError> {
        let now = match self.tz()? {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => chrono::Local::now().naive_local(),
        };
        Ok(now)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Retention defaults
    #[serde(default)]
    pub retention: RetentionSettings,
}

impl Configuration {
    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
    }

    /// Defaults, then `aging.toml` if present, then `AGING__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Like [`load`](Self::load) but reads an explicit file, which must exist.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.display().to_string()));
        }
        Self::figment()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Check values that serde cannot validate on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retention.week_anchor()?;
        self.retention.tz()?;
        Ok(())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Figment could not merge or extract the configuration.
    #[error("Failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    MissingFile(String),

    /// Week anchor outside 0..=6.
    #[error("Invalid week anchor day {0}: expected 0 (Monday) to 6 (Sunday)")]
    InvalidWeekAnchor(u8),

    /// Invalid timezone specified.
    #[error("Invalid timezone '{timezone}': {message}")]
    InvalidTimezone { timezone: String, message: String },
}
