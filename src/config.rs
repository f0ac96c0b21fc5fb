//! Configuration management for the charge alert service.
//!
//! This module handles loading and saving configuration from disk,
//! including the default target, polling cadence, and notification settings.

use std::{env, fs, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
   charge::{
      session::{DEFAULT_MIN_HISTORY, DEFAULT_TARGET, TARGET_RANGE},
      window::DEFAULT_RECENT_SAMPLES,
   },
   error::{ChargeAlertError, Result},
};

/// Main configuration structure for the service.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
   #[serde(default = "default_target")]
   pub target_percent: u8,

   #[serde(default = "default_poll_interval")]
   pub poll_interval_ms: u64,

   /// Power supply name, e.g. `BAT0`. The first battery is used if unset.
   #[serde(default)]
   pub battery: Option<SmolStr>,

   #[serde(default = "default_recent_samples")]
   pub recent_samples: usize,

   #[serde(default = "default_min_history")]
   pub min_history: usize,

   /// Start monitoring with `target_percent` as soon as the service is up.
   #[serde(default)]
   pub auto_start: bool,

   #[serde(default = "default_notifications")]
   pub notifications: bool,

   #[serde(default = "default_notification_retries")]
   pub notification_retries: u32,

   #[serde(default = "default_notification_retry_delay")]
   pub notification_retry_delay_ms: u64,
}

const fn default_target() -> u8 {
   DEFAULT_TARGET
}

const fn default_poll_interval() -> u64 {
   2000
}

const fn default_recent_samples() -> usize {
   DEFAULT_RECENT_SAMPLES
}

const fn default_min_history() -> usize {
   DEFAULT_MIN_HISTORY
}

const fn default_notifications() -> bool {
   true
}

const fn default_notification_retries() -> u32 {
   3
}

const fn default_notification_retry_delay() -> u64 {
   500
}

impl Default for Config {
   fn default() -> Self {
      Self {
         target_percent: default_target(),
         poll_interval_ms: default_poll_interval(),
         battery: None,
         recent_samples: default_recent_samples(),
         min_history: default_min_history(),
         auto_start: false,
         notifications: default_notifications(),
         notification_retries: default_notification_retries(),
         notification_retry_delay_ms: default_notification_retry_delay(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      let config_path = Self::config_path()?;

      let config = if config_path.exists() {
         let contents = fs::read_to_string(&config_path)?;
         toml::from_str::<Self>(&contents)?
      } else {
         // Create default config
         let config = Self::default();
         config.save()?;
         config
      };
      config.validate()?;
      Ok(config)
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      let config_path = Self::config_path()?;

      // Ensure directory exists
      if let Some(parent) = config_path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(&config_path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(home) = env::var("CHARGEALERT_HOME") {
         PathBuf::from(home)
      } else {
         dirs::config_dir()
            .ok_or(ChargeAlertError::ConfigDirNotFound)?
            .join("chargealert")
      };

      Ok(config_dir.join("config.toml"))
   }

   /// Rejects values the monitor cannot run with.
   pub fn validate(&self) -> Result<()> {
      if !TARGET_RANGE.contains(&self.target_percent) {
         return Err(ChargeAlertError::InvalidTarget(self.target_percent));
      }
      if self.poll_interval_ms == 0 {
         return Err(ChargeAlertError::InvalidConfig("poll_interval_ms must be positive"));
      }
      if self.recent_samples < 2 {
         return Err(ChargeAlertError::InvalidConfig("recent_samples must be at least 2"));
      }
      Ok(())
   }

   pub const fn poll_interval(&self) -> Duration {
      Duration::from_millis(self.poll_interval_ms)
   }

   pub const fn notification_retry_delay(&self) -> Duration {
      Duration::from_millis(self.notification_retry_delay_ms)
   }
}
