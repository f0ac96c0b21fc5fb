//! Desktop notifications for charge alerts.
//!
//! Alerts are delivered through `org.freedesktop.Notifications`. Delivery is
//! retried with exponential backoff since notification daemons are often slow
//! to come up after login.

use std::{
   collections::HashMap,
   fmt,
   future::Future,
   time::Duration,
};

use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::Rng;
use tokio::time;
use zbus::{Connection, proxy, zvariant::Value};

use crate::{config::Config, error::Result};

const APP_NAME: &str = "chargealertd";
const ALERT_ICON: &str = "battery-full-charging";
/// Notifications stay until dismissed or the charger is removed.
const EXPIRE_NEVER: i32 = 0;
/// Freedesktop "critical" urgency.
const URGENCY_CRITICAL: u8 = 2;
/// Upper bound on the backoff exponent.
const MAX_BACKOFF_SHIFT: u32 = 4;

#[proxy(
   interface = "org.freedesktop.Notifications",
   default_service = "org.freedesktop.Notifications",
   default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
   #[allow(clippy::too_many_arguments)]
   fn notify(
      &self,
      app_name: &str,
      replaces_id: u32,
      app_icon: &str,
      summary: &str,
      body: &str,
      actions: &[&str],
      hints: &HashMap<&str, &Value<'_>>,
      expire_timeout: i32,
   ) -> zbus::Result<u32>;

   fn close_notification(&self, id: u32) -> zbus::Result<()>;
}

/// Sends alert notifications to the desktop.
pub struct DesktopNotifier {
   proxy: NotificationsProxy<'static>,
   retries: u32,
   retry_delay: Duration,
   active: Mutex<Option<u32>>,
}

impl DesktopNotifier {
   pub async fn new(connection: &Connection, config: &Config) -> Result<Self> {
      let proxy = NotificationsProxy::new(connection).await?;
      Ok(Self {
         proxy,
         retries: config.notification_retries,
         retry_delay: config.notification_retry_delay(),
         active: Mutex::new(None),
      })
   }

   /// Shows the "target reached" notification.
   pub async fn alert_fired(&self, level: u8, target: u8) {
      let summary = format!("Battery at {level}%");
      let body = format!("Charge target of {target}% reached. You can unplug the charger.");
      let replaces_id = (*self.active.lock()).unwrap_or(0);
      let (summary, body) = (summary.as_str(), body.as_str());
      let hints = alert_hints();
      let hints: HashMap<&str, &Value<'_>> = hints.iter().map(|(k, v)| (*k, v)).collect();
      let hints = &hints;

      let result = with_retries(self.retries, self.retry_delay, || async move {
         self
            .proxy
            .notify(
               APP_NAME,
               replaces_id,
               ALERT_ICON,
               summary,
               body,
               &[],
               hints,
               EXPIRE_NEVER,
            )
            .await
      })
      .await;

      match result {
         Ok(id) => {
            info!("Charge alert notification shown (id {id})");
            *self.active.lock() = Some(id);
         },
         Err(e) => warn!("Giving up on charge alert notification: {e}"),
      }
   }

   /// Withdraws the alert notification, if one is showing.
   pub async fn alert_reset(&self) {
      let Some(id) = self.active.lock().take() else {
         return;
      };
      match self.proxy.close_notification(id).await {
         Ok(()) => debug!("Closed charge alert notification {id}"),
         Err(e) => debug!("Failed to close notification {id}: {e}"),
      }
   }
}

fn alert_hints() -> HashMap<&'static str, Value<'static>> {
   HashMap::from([
      ("urgency", Value::from(URGENCY_CRITICAL)),
      ("sound-name", Value::from("complete")),
      ("category", Value::from("device")),
   ])
}

/// Runs `op`, retrying up to `retries` more times with exponential backoff.
pub async fn with_retries<T, E, F, Fut>(
   retries: u32,
   base_delay: Duration,
   mut op: F,
) -> std::result::Result<T, E>
where
   F: FnMut() -> Fut,
   Fut: Future<Output = std::result::Result<T, E>>,
   E: fmt::Display,
{
   let mut attempt = 0;
   loop {
      match op().await {
         Ok(value) => return Ok(value),
         Err(e) if attempt < retries => {
            let delay = retry_delay(base_delay, attempt);
            warn!("Attempt {} failed: {e}, retrying in {delay:?}", attempt + 1);
            time::sleep(delay).await;
            attempt += 1;
         },
         Err(e) => return Err(e),
      }
   }
}

fn retry_delay(base_delay: Duration, attempt: u32) -> Duration {
   let exponential = base_delay * (1 << attempt.min(MAX_BACKOFF_SHIFT));
   let max_jitter = (base_delay.as_millis() / 4) as u64;
   let jitter = rand::thread_rng().gen_range(0..=max_jitter);
   exponential + Duration::from_millis(jitter)
}
