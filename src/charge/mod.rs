//! Charge estimation core.
//!
//! This module contains the sample window and the monitoring session state
//! machine. Neither performs I/O; the host feeds readings in and forwards the
//! resulting events.

pub mod session;
pub mod window;

/// A single battery observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
   /// Charge level in percent.
   pub level: u8,
   /// Whether a charger is connected.
   pub charging: bool,
}

impl BatteryReading {
   pub const fn new(level: u8, charging: bool) -> Self {
      Self { level, charging }
   }
}

/// Formats a minute count for display, e.g. `1h 05m` or `42m`.
pub fn format_minutes(minutes: u32) -> String {
   let (hours, minutes) = (minutes / 60, minutes % 60);
   if hours == 0 {
      format!("{minutes}m")
   } else {
      format!("{hours}h {minutes:02}m")
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_format_minutes() {
      assert_eq!(format_minutes(0), "0m");
      assert_eq!(format_minutes(42), "42m");
      assert_eq!(format_minutes(60), "1h 00m");
      assert_eq!(format_minutes(65), "1h 05m");
      assert_eq!(format_minutes(185), "3h 05m");
   }
}
