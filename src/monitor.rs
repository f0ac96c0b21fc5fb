//! Charge monitor actor.
//!
//! Owns the [`MonitorSession`] on a single task, polls the battery source on a
//! fixed cadence, and serializes control commands from other tasks.

use std::{
   sync::Arc,
   time::{Duration, Instant},
};

use log::{debug, info, warn};
use tokio::{
   select,
   sync::{mpsc, oneshot},
   time::{self, MissedTickBehavior},
};

use crate::{
   charge::session::{MonitorSession, SessionStatus},
   config::Config,
   error::{ChargeAlertError, Result},
   event::EventSender,
   power::BatterySource,
};

/// Channel buffer size
const CHANNEL_BUFFER_SIZE: usize = 64;

#[derive(Debug)]
enum MonitorCommand {
   Start(u8, oneshot::Sender<Result<SessionStatus>>),
   Stop(oneshot::Sender<SessionStatus>),
   Status(oneshot::Sender<SessionStatus>),
}

/// Handle to the monitor actor. Cheap to clone.
#[derive(Clone)]
pub struct ChargeMonitor {
   inbox: mpsc::Sender<MonitorCommand>,
}

impl ChargeMonitor {
   /// Spawns the monitor actor on the current runtime.
   pub fn new(source: Arc<dyn BatterySource>, event_tx: EventSender, config: &Config) -> Self {
      let (command_tx, command_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
      let actor = MonitorActor {
         session: MonitorSession::with_tuning(config.recent_samples, config.min_history),
         source,
         event_tx,
         command_rx,
         poll_interval: config.poll_interval(),
      };
      tokio::spawn(actor.run());
      Self { inbox: command_tx }
   }

   pub async fn start(&self, target: u8) -> Result<SessionStatus> {
      let (tx, rx) = oneshot::channel();
      self
         .inbox
         .send(MonitorCommand::Start(target, tx))
         .await
         .map_err(|_| ChargeAlertError::MonitorShutdown)?;
      rx.await.map_err(|_| ChargeAlertError::MonitorShutdown)?
   }

   pub async fn stop(&self) -> Result<SessionStatus> {
      let (tx, rx) = oneshot::channel();
      self
         .inbox
         .send(MonitorCommand::Stop(tx))
         .await
         .map_err(|_| ChargeAlertError::MonitorShutdown)?;
      rx.await.map_err(|_| ChargeAlertError::MonitorShutdown)
   }

   pub async fn status(&self) -> Result<SessionStatus> {
      let (tx, rx) = oneshot::channel();
      self
         .inbox
         .send(MonitorCommand::Status(tx))
         .await
         .map_err(|_| ChargeAlertError::MonitorShutdown)?;
      rx.await.map_err(|_| ChargeAlertError::MonitorShutdown)
   }
}

struct MonitorActor {
   session: MonitorSession,
   source: Arc<dyn BatterySource>,
   event_tx: EventSender,
   command_rx: mpsc::Receiver<MonitorCommand>,
   poll_interval: Duration,
}

impl MonitorActor {
   async fn run(mut self) {
      info!("Charge monitor polling every {:?}", self.poll_interval);

      let mut poll_interval = time::interval(self.poll_interval);
      poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

      loop {
         select! {
             _ = poll_interval.tick() => {
                 self.poll();
             }
             cmd = self.command_rx.recv() => {
                 let Some(cmd) = cmd else {
                     info!("Charge monitor shutting down");
                     break;
                 };
                 self.handle_command(cmd);
             }
         }
      }

      self.session.stop();
   }

   fn handle_command(&mut self, cmd: MonitorCommand) {
      match cmd {
         MonitorCommand::Start(target, reply) => {
            let reading = match self.source.read() {
               Ok(reading) => Some(reading),
               Err(e) => {
                  warn!("Battery unavailable: {e}");
                  None
               },
            };
            let result = self
               .session
               .start(target, reading, Instant::now())
               .map(|event| {
                  if let Some(event) = event {
                     self.event_tx.emit(event);
                  }
                  self.session.status()
               });
            let _ = reply.send(result);
         },
         MonitorCommand::Stop(reply) => {
            self.session.stop();
            let _ = reply.send(self.session.status());
         },
         MonitorCommand::Status(reply) => {
            let _ = reply.send(self.session.status());
         },
      }
   }

   fn poll(&mut self) {
      if !self.session.is_running() {
         return;
      }

      match self.source.read() {
         Ok(reading) => {
            debug!("Polled battery: {}% charging={}", reading.level, reading.charging);
            if let Some(event) = self.session.ingest(reading, Instant::now()) {
               self.event_tx.emit(event);
            }
         },
         Err(e) => warn!("Failed to read battery: {e}"),
      }
   }
}

#[cfg(test)]
mod tests {
   use parking_lot::Mutex;

   use super::*;
   use crate::{
      charge::{BatteryReading, session::SessionState},
      event::{ChargeEvent, EventBus},
   };

   #[derive(Default)]
   struct MockBattery(Mutex<Option<BatteryReading>>);

   impl MockBattery {
      fn set(&self, reading: Option<BatteryReading>) {
         *self.0.lock() = reading;
      }
   }

   impl BatterySource for MockBattery {
      fn read(&self) -> Result<BatteryReading> {
         (*self.0.lock()).ok_or(ChargeAlertError::NoBatterySource)
      }
   }

   #[derive(Default)]
   struct CollectingBus(Mutex<Vec<ChargeEvent>>);

   impl CollectingBus {
      fn events(&self) -> Vec<ChargeEvent> {
         self.0.lock().clone()
      }
   }

   impl EventBus for CollectingBus {
      fn emit(&self, event: ChargeEvent) {
         self.0.lock().push(event);
      }
   }

   fn spawn_monitor() -> (ChargeMonitor, Arc<MockBattery>, Arc<CollectingBus>) {
      let battery = Arc::new(MockBattery::default());
      let bus = Arc::new(CollectingBus::default());
      let config = Config {
         poll_interval_ms: 10,
         ..Config::default()
      };
      let monitor = ChargeMonitor::new(battery.clone(), bus.clone(), &config);
      (monitor, battery, bus)
   }

   #[tokio::test]
   async fn test_start_without_battery() {
      let (monitor, _battery, _bus) = spawn_monitor();

      let err = monitor.start(80).await.unwrap_err();
      assert!(matches!(err, ChargeAlertError::NoBatterySource));
      assert_eq!(monitor.status().await.unwrap().state, SessionState::Idle);
   }

   #[tokio::test]
   async fn test_start_invalid_target() {
      let (monitor, battery, _bus) = spawn_monitor();
      battery.set(Some(BatteryReading::new(40, true)));

      let err = monitor.start(49).await.unwrap_err();
      assert!(matches!(err, ChargeAlertError::InvalidTarget(49)));
      assert!(!monitor.status().await.unwrap().running);
   }

   #[tokio::test]
   async fn test_start_and_stop() {
      let (monitor, battery, _bus) = spawn_monitor();
      battery.set(Some(BatteryReading::new(40, true)));

      let status = monitor.start(90).await.unwrap();
      assert!(status.running);
      assert_eq!(status.target, 90);
      assert_eq!(status.state, SessionState::WaitingForRate);

      let status = monitor.stop().await.unwrap();
      assert!(!status.running);
      assert_eq!(status.state, SessionState::Idle);

      // Stopping twice is harmless
      let status = monitor.stop().await.unwrap();
      assert_eq!(status.state, SessionState::Idle);
   }

   #[tokio::test]
   async fn test_polling_fires_and_resets_alert() {
      let (monitor, battery, bus) = spawn_monitor();
      battery.set(Some(BatteryReading::new(70, true)));
      monitor.start(80).await.unwrap();

      battery.set(Some(BatteryReading::new(82, true)));
      time::sleep(Duration::from_millis(100)).await;

      let fired = bus
         .events()
         .into_iter()
         .filter(|e| matches!(e, ChargeEvent::AlertFired { .. }))
         .count();
      assert_eq!(fired, 1);
      assert_eq!(monitor.status().await.unwrap().state, SessionState::Alerted);

      battery.set(Some(BatteryReading::new(82, false)));
      time::sleep(Duration::from_millis(100)).await;

      let events = bus.events();
      assert_eq!(events.last(), Some(&ChargeEvent::AlertReset));
      assert!(monitor.status().await.unwrap().alert_armed);
   }

   #[tokio::test]
   async fn test_no_polling_while_idle() {
      let (monitor, battery, bus) = spawn_monitor();
      battery.set(Some(BatteryReading::new(95, true)));

      time::sleep(Duration::from_millis(50)).await;
      assert!(bus.events().is_empty());
      assert_eq!(monitor.status().await.unwrap().samples, 0);
   }
}
