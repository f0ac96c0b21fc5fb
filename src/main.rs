//! Charge alert D-Bus service
//!
//! This service watches the battery while charging, publishes a time-to-target
//! estimate, and raises a one-shot alert once the chosen charge level is
//! reached.

use std::{sync::Arc, time::Duration};

use crossbeam::queue::SegQueue;
use log::{info, warn};
use tokio::{signal, sync::Notify, time};
use zbus::{Connection, connection, object_server::InterfaceRef};

use dbus::ChargeAlertService;
use event::{ChargeEvent, EventBus};
use monitor::ChargeMonitor;
use notify::DesktopNotifier;
use power::sysfs::SysfsBattery;

mod charge;
mod config;
mod dbus;
mod error;
mod event;
mod monitor;
mod notify;
mod power;

use crate::{charge::format_minutes, dbus::ChargeAlertServiceSignals, error::Result};

const OBJECT_PATH: &str = "/org/chargealert/monitor";

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   info!("Starting charge alert service...");

   // Load configuration
   let config = config::Config::load()?;
   info!(
      "Loaded configuration: target {}%, polling every {}ms",
      config.target_percent, config.poll_interval_ms
   );

   // Create event channel
   let event_bus = EventProcessor::new();

   let battery = Arc::new(SysfsBattery::new(config.battery.clone()));
   let monitor = ChargeMonitor::new(battery, event_bus.clone(), &config);

   // Create D-Bus service
   let service = ChargeAlertService::new(monitor.clone());

   // Build D-Bus connection
   let connection = connection::Builder::session()?
      .name("org.chargealert")?
      .serve_at(OBJECT_PATH, service)?
      .build()
      .await?;

   info!("Charge alert D-Bus service started at org.chargealert");

   let notifier = if config.notifications {
      match DesktopNotifier::new(&connection, &config).await {
         Ok(notifier) => Some(notifier),
         Err(e) => {
            warn!("Desktop notifications unavailable: {e}");
            None
         },
      }
   } else {
      None
   };

   // Start event processor
   event_bus.spawn_dispatcher(connection, notifier).await?;

   if config.auto_start {
      match monitor.start(config.target_percent).await {
         Ok(status) => info!("Auto-started monitoring: {}", status.state),
         Err(e) => warn!("Failed to auto-start monitoring: {e}"),
      }
   }

   // Wait for shutdown signal
   signal::ctrl_c().await?;
   info!("Shutting down charge alert service...");

   Ok(())
}

struct EventProcessor {
   queue: SegQueue<ChargeEvent>,
   notifier: Notify,
}

impl EventProcessor {
   fn new() -> Arc<Self> {
      Arc::new(Self {
         queue: SegQueue::new(),
         notifier: Notify::new(),
      })
   }
}

impl EventProcessor {
   async fn recv(self: &Arc<Self>) -> Option<ChargeEvent> {
      loop {
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         let notify = self.notifier.notified();
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         if Arc::strong_count(self) == 1 {
            return None;
         }
         let _ = time::timeout(Duration::from_secs(1), notify).await;
      }
   }

   async fn dispatch(
      &self,
      iface: &InterfaceRef<ChargeAlertService>,
      desktop: Option<&DesktopNotifier>,
      event: ChargeEvent,
   ) -> Result<()> {
      match event {
         ChargeEvent::EstimateUpdated(minutes) => {
            info!("Estimated time to target: {}", format_minutes(minutes));
            iface.estimate_updated(minutes).await?;
         },
         ChargeEvent::AlertFired { level, target } => {
            iface.alert_fired(level, target).await?;
            if let Some(desktop) = desktop {
               desktop.alert_fired(level, target).await;
            }
         },
         ChargeEvent::AlertReset => {
            iface.alert_reset().await?;
            if let Some(desktop) = desktop {
               desktop.alert_reset().await;
            }
         },
      }

      let service = iface.get().await;
      service.status_changed(iface.signal_emitter()).await?;
      Ok(())
   }

   async fn spawn_dispatcher(
      self: Arc<Self>,
      connection: Connection,
      desktop: Option<DesktopNotifier>,
   ) -> Result<()> {
      let iface = connection
         .object_server()
         .interface::<_, ChargeAlertService>(OBJECT_PATH)
         .await?;
      tokio::spawn(async move {
         while let Some(event) = self.recv().await {
            if let Err(e) = self.dispatch(&iface, desktop.as_ref(), event).await {
               warn!("Error dispatching event: {e}");
            }
         }
      });

      Ok(())
   }
}

impl EventBus for EventProcessor {
   fn emit(&self, event: ChargeEvent) {
      self.queue.push(event);
      self.notifier.notify_waiters();
   }
}
