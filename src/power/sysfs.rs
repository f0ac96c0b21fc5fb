//! Battery readings from `/sys/class/power_supply`.

use std::{
   fs,
   path::{Path, PathBuf},
   str::FromStr,
};

use log::debug;
use smol_str::SmolStr;

use crate::{
   charge::BatteryReading,
   error::{ChargeAlertError, Result},
   power::BatterySource,
};

pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Charging status as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
pub enum SupplyStatus {
   Charging,
   Discharging,
   Full,
   #[strum(serialize = "Not charging")]
   NotCharging,
   Unknown,
}

impl SupplyStatus {
   /// Whether a charger is connected.
   ///
   /// `Full` and `Not charging` are reported with the charger attached but the
   /// level held, which the session treats as a stalled charge.
   pub const fn is_plugged(self) -> bool {
      matches!(self, Self::Charging | Self::Full | Self::NotCharging)
   }
}

/// Reads a battery from the sysfs `power_supply` class.
#[derive(Debug, Clone)]
pub struct SysfsBattery {
   root: PathBuf,
   name: Option<SmolStr>,
}

impl Default for SysfsBattery {
   fn default() -> Self {
      Self::new(None)
   }
}

impl SysfsBattery {
   /// Uses the supply called `name`, or the first battery found if `None`.
   pub fn new(name: Option<SmolStr>) -> Self {
      Self::with_root(POWER_SUPPLY_ROOT, name)
   }

   pub fn with_root(root: impl Into<PathBuf>, name: Option<SmolStr>) -> Self {
      Self {
         root: root.into(),
         name,
      }
   }

   fn supply_dir(&self) -> Result<PathBuf> {
      if let Some(name) = &self.name {
         let dir = self.root.join(name.as_str());
         return if dir.join("capacity").exists() {
            Ok(dir)
         } else {
            Err(ChargeAlertError::NoBatterySource)
         };
      }

      let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)
         .map_err(|_| ChargeAlertError::NoBatterySource)?
         .filter_map(|entry| entry.ok().map(|e| e.path()))
         .collect();
      dirs.sort();

      dirs
         .into_iter()
         .find(|dir| {
            read_attr(dir, "type").is_ok_and(|t| t == "Battery") && dir.join("capacity").exists()
         })
         .ok_or(ChargeAlertError::NoBatterySource)
   }
}

impl BatterySource for SysfsBattery {
   fn read(&self) -> Result<BatteryReading> {
      let dir = self.supply_dir()?;

      let capacity = read_attr(&dir, "capacity")?;
      let level = capacity
         .parse::<u8>()
         .map_err(|e| ChargeAlertError::InvalidReading(format!("capacity {capacity:?}: {e}")))?
         .min(100);

      let status = read_attr(&dir, "status")?;
      let status = SupplyStatus::from_str(&status)
         .map_err(|_| ChargeAlertError::InvalidReading(format!("status {status:?}")))?;

      debug!("Battery {}: {level}% {status}", dir.display());
      Ok(BatteryReading::new(level, status.is_plugged()))
   }
}

fn read_attr(dir: &Path, attr: &str) -> Result<String> {
   Ok(fs::read_to_string(dir.join(attr))?.trim().to_string())
}

#[cfg(test)]
mod tests {
   use tempfile::TempDir;

   use super::*;

   fn add_supply(root: &Path, name: &str, kind: &str, capacity: &str, status: &str) {
      let dir = root.join(name);
      fs::create_dir_all(&dir).unwrap();
      fs::write(dir.join("type"), format!("{kind}\n")).unwrap();
      if kind == "Battery" {
         fs::write(dir.join("capacity"), format!("{capacity}\n")).unwrap();
         fs::write(dir.join("status"), format!("{status}\n")).unwrap();
      }
   }

   #[test]
   fn test_status_parsing() {
      assert_eq!(SupplyStatus::from_str("Charging").unwrap(), SupplyStatus::Charging);
      assert_eq!(
         SupplyStatus::from_str("Not charging").unwrap(),
         SupplyStatus::NotCharging
      );
      assert!(SupplyStatus::Full.is_plugged());
      assert!(!SupplyStatus::Discharging.is_plugged());
      assert!(!SupplyStatus::Unknown.is_plugged());
      assert!(SupplyStatus::from_str("Exploding").is_err());
   }

   #[test]
   fn test_discovers_first_battery() {
      let root = TempDir::new().unwrap();
      add_supply(root.path(), "AC", "Mains", "", "");
      add_supply(root.path(), "BAT0", "Battery", "57", "Charging");

      let battery = SysfsBattery::with_root(root.path(), None);
      let reading = battery.read().unwrap();
      assert_eq!(reading, BatteryReading::new(57, true));
   }

   #[test]
   fn test_named_battery() {
      let root = TempDir::new().unwrap();
      add_supply(root.path(), "BAT0", "Battery", "57", "Charging");
      add_supply(root.path(), "BAT1", "Battery", "31", "Discharging");

      let battery = SysfsBattery::with_root(root.path(), Some(SmolStr::new_static("BAT1")));
      assert_eq!(battery.read().unwrap(), BatteryReading::new(31, false));
   }

   #[test]
   fn test_missing_battery() {
      let root = TempDir::new().unwrap();
      add_supply(root.path(), "AC", "Mains", "", "");

      let err = SysfsBattery::with_root(root.path(), None).read().unwrap_err();
      assert!(matches!(err, ChargeAlertError::NoBatterySource));

      let err = SysfsBattery::with_root(root.path(), Some(SmolStr::new_static("BAT9")))
         .read()
         .unwrap_err();
      assert!(matches!(err, ChargeAlertError::NoBatterySource));

      let err = SysfsBattery::with_root(root.path().join("missing"), None)
         .read()
         .unwrap_err();
      assert!(matches!(err, ChargeAlertError::NoBatterySource));
   }

   #[test]
   fn test_malformed_capacity() {
      let root = TempDir::new().unwrap();
      add_supply(root.path(), "BAT0", "Battery", "lots", "Charging");

      let err = SysfsBattery::with_root(root.path(), None).read().unwrap_err();
      assert!(matches!(err, ChargeAlertError::InvalidReading(_)));
   }

   #[test]
   fn test_capacity_clamped() {
      let root = TempDir::new().unwrap();
      add_supply(root.path(), "BAT0", "Battery", "104", "Full");

      let reading = SysfsBattery::with_root(root.path(), None).read().unwrap();
      assert_eq!(reading, BatteryReading::new(100, true));
   }
}
