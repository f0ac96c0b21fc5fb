//! Battery reading sources.
//!
//! The monitor polls a [`BatterySource`] on a fixed cadence; the sysfs
//! implementation reads the Linux `power_supply` class.

pub mod sysfs;

use crate::{charge::BatteryReading, error::Result};

/// Provides the current battery level and charger state.
pub trait BatterySource: Send + Sync {
   /// Reads the battery. Fails with `NoBatterySource` if no battery is present.
   fn read(&self) -> Result<BatteryReading>;
}
