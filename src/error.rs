//! Error types for the charge alert service.
//!
//! This module defines all error types that can occur while monitoring a
//! charging session, including battery source, D-Bus, I/O, and configuration
//! errors.

use thiserror::Error;

/// Main error type for the charge alert service.
#[derive(Error, Debug)]
pub enum ChargeAlertError {
   #[error("No battery reading available")]
   NoBatterySource,

   #[error("Invalid target {0}%: must be between 50 and 100")]
   InvalidTarget(u8),

   #[error("Monitoring session already running")]
   SessionRunning,

   #[error("Invalid battery reading: {0}")]
   InvalidReading(String),

   #[error("Invalid configuration: {0}")]
   InvalidConfig(&'static str),

   #[error("D-Bus error: {0}")]
   DBus(#[from] zbus::Error),

   #[error("D-Bus connection error: {0}")]
   DBusConnection(#[from] zbus::fdo::Error),

   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),

   #[error("Monitor has been shut down")]
   MonitorShutdown,
}

/// Convenience type alias for Results with `ChargeAlertError`.
pub type Result<T> = std::result::Result<T, ChargeAlertError>;
