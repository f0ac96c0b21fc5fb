use log::info;
use zbus::{interface, object_server::SignalEmitter};

use crate::{error::ChargeAlertError, monitor::ChargeMonitor};

pub struct ChargeAlertService {
   monitor: ChargeMonitor,
}

impl ChargeAlertService {
   pub const fn new(monitor: ChargeMonitor) -> Self {
      Self { monitor }
   }
}

fn to_fdo(e: ChargeAlertError) -> zbus::fdo::Error {
   match e {
      ChargeAlertError::InvalidTarget(_) => zbus::fdo::Error::InvalidArgs(e.to_string()),
      _ => zbus::fdo::Error::Failed(e.to_string()),
   }
}

#[interface(name = "org.chargealert.Monitor")]
impl ChargeAlertService {
   async fn start(
      &self,
      target: u8,
      #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
   ) -> zbus::fdo::Result<bool> {
      self.monitor.start(target).await.map_err(to_fdo)?;
      info!("Monitoring requested with target {target}%");

      self.status_changed(&emitter).await?;
      self.target_changed(&emitter).await?;
      Ok(true)
   }

   async fn stop(
      &self,
      #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
   ) -> zbus::fdo::Result<bool> {
      self.monitor.stop().await.map_err(to_fdo)?;
      self.status_changed(&emitter).await?;
      Ok(true)
   }

   async fn get_status(&self) -> zbus::fdo::Result<String> {
      let status = self.monitor.status().await.map_err(to_fdo)?;
      serde_json::to_string(&status).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
   }

   // Signals
   #[zbus(signal)]
   pub async fn estimate_updated(emitter: &SignalEmitter<'_>, minutes: u32) -> zbus::Result<()>;

   #[zbus(signal)]
   pub async fn alert_fired(emitter: &SignalEmitter<'_>, level: u8, target: u8)
   -> zbus::Result<()>;

   #[zbus(signal)]
   pub async fn alert_reset(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

   // Properties for polling-free updates
   #[zbus(property)]
   async fn status(&self) -> String {
      self.get_status().await.unwrap_or_default()
   }

   #[zbus(property)]
   async fn target(&self) -> u8 {
      self
         .monitor
         .status()
         .await
         .map(|status| status.target)
         .unwrap_or_default()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_mapping() {
      assert!(matches!(
         to_fdo(ChargeAlertError::InvalidTarget(120)),
         zbus::fdo::Error::InvalidArgs(_)
      ));
      assert!(matches!(
         to_fdo(ChargeAlertError::NoBatterySource),
         zbus::fdo::Error::Failed(_)
      ));
      assert!(matches!(
         to_fdo(ChargeAlertError::SessionRunning),
         zbus::fdo::Error::Failed(_)
      ));
   }
}
