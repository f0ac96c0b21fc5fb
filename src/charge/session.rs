//! Charging session state machine.
//!
//! A [`MonitorSession`] is advanced only by explicit [`MonitorSession::ingest`]
//! calls. Each call returns at most one [`ChargeEvent`]; the caller decides how
//! to deliver it.

use std::{ops::RangeInclusive, time::Instant};

use log::{debug, info};
use serde::Serialize;

use crate::{
   charge::{
      BatteryReading,
      window::{DEFAULT_RECENT_SAMPLES, Sample, SampleWindow},
   },
   error::{ChargeAlertError, Result},
   event::ChargeEvent,
};

/// Accepted charge targets, in percent.
pub const TARGET_RANGE: RangeInclusive<u8> = 50..=100;
/// Target used until a session is started with an explicit one.
pub const DEFAULT_TARGET: u8 = 80;
/// Samples required in the window before a rate is considered meaningful.
pub const DEFAULT_MIN_HISTORY: usize = 6;

/// Observable state of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum SessionState {
   /// Not monitoring.
   Idle,
   /// Monitoring, but not enough charging history for a rate.
   WaitingForRate,
   /// Monitoring with a positive charge rate.
   Estimating,
   /// Charger connected, but the level is not rising.
   Stalled,
   /// Target reached while charging; the alert has fired.
   Alerted,
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
   pub state: SessionState,
   pub target: u8,
   pub running: bool,
   pub alert_armed: bool,
   pub estimate_minutes: Option<u32>,
   pub samples: usize,
   pub rate_per_minute: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MonitorSession {
   target: u8,
   running: bool,
   alert_armed: bool,
   last_estimate: Option<u32>,
   state: SessionState,
   plugged: Option<bool>,
   window: SampleWindow,
   recent_samples: usize,
   min_history: usize,
}

impl Default for MonitorSession {
   fn default() -> Self {
      Self::with_tuning(DEFAULT_RECENT_SAMPLES, DEFAULT_MIN_HISTORY)
   }
}

impl MonitorSession {
   /// Creates an idle session with custom rate estimation parameters.
   ///
   /// `recent_samples` is the trailing sub-window used for the slope and
   /// `min_history` the number of samples required before estimating.
   pub fn with_tuning(recent_samples: usize, min_history: usize) -> Self {
      Self {
         target: DEFAULT_TARGET,
         running: false,
         alert_armed: true,
         last_estimate: None,
         state: SessionState::Idle,
         plugged: None,
         window: SampleWindow::new(),
         recent_samples: recent_samples.max(2),
         min_history: min_history.max(2),
      }
   }

   pub const fn target(&self) -> u8 {
      self.target
   }

   pub const fn is_running(&self) -> bool {
      self.running
   }

   pub const fn is_alert_armed(&self) -> bool {
      self.alert_armed
   }

   pub const fn state(&self) -> SessionState {
      self.state
   }

   pub const fn last_estimate(&self) -> Option<u32> {
      self.last_estimate
   }

   pub const fn window(&self) -> &SampleWindow {
      &self.window
   }

   /// Starts monitoring towards `target` and ingests the initial reading.
   ///
   /// Fails without touching the session if the target is out of range, the
   /// session is already running, or no reading is available.
   pub fn start(
      &mut self,
      target: u8,
      reading: Option<BatteryReading>,
      at: Instant,
   ) -> Result<Option<ChargeEvent>> {
      if !TARGET_RANGE.contains(&target) {
         return Err(ChargeAlertError::InvalidTarget(target));
      }
      if self.running {
         return Err(ChargeAlertError::SessionRunning);
      }
      let reading = reading.ok_or(ChargeAlertError::NoBatterySource)?;

      self.target = target;
      self.running = true;
      self.alert_armed = true;
      self.last_estimate = None;
      self.plugged = None;
      self.window.clear();
      self.state = SessionState::WaitingForRate;
      info!("Monitoring started: target {target}%");

      Ok(self.ingest(reading, at))
   }

   /// Stops monitoring. Calling this on an idle session does nothing.
   pub fn stop(&mut self) {
      if !self.running {
         return;
      }
      self.running = false;
      self.alert_armed = true;
      self.last_estimate = None;
      self.plugged = None;
      self.window.clear();
      self.state = SessionState::Idle;
      info!("Monitoring stopped");
   }

   /// Advances the session with a new reading. Ignored while idle.
   pub fn ingest(&mut self, reading: BatteryReading, at: Instant) -> Option<ChargeEvent> {
      if !self.running {
         return None;
      }
      let BatteryReading { level, charging } = reading;

      if !charging {
         return self.on_unplugged(level);
      }

      if self.plugged != Some(true) {
         info!("Charger connected at {level}%");
         self.plugged = Some(true);
      }

      if level >= self.target {
         if !self.alert_armed {
            return None;
         }
         info!("Target {}% reached at {level}%", self.target);
         self.alert_armed = false;
         self.set_state(SessionState::Alerted);
         return Some(ChargeEvent::AlertFired {
            level,
            target: self.target,
         });
      }

      self.window.push(Sample::new(level, at));
      debug!("Charging sample #{}: {level}%", self.window.len());

      match self.current_rate() {
         Some(rate) if rate > 0.0 => {
            let remaining = f64::from(self.target - level);
            let eta = (remaining / rate).ceil().max(0.0) as u32;
            if self.last_estimate.is_none() {
               info!("Time to target now available: {eta} minutes");
            }
            self.last_estimate = Some(eta);
            self.set_state(SessionState::Estimating);
            Some(ChargeEvent::EstimateUpdated(eta))
         },
         Some(rate) => {
            debug!("Charge rate is not positive ({rate:.3}%/min)");
            self.set_state(SessionState::Stalled);
            None
         },
         None => {
            self.set_state(SessionState::WaitingForRate);
            None
         },
      }
   }

   /// Current charge rate in percent per minute, once enough history exists.
   pub fn current_rate(&self) -> Option<f64> {
      if self.window.len() < self.min_history {
         return None;
      }
      self
         .window
         .estimate_rate(self.recent_samples)
         .filter(|rate| rate.is_finite())
   }

   pub fn status(&self) -> SessionStatus {
      SessionStatus {
         state: self.state,
         target: self.target,
         running: self.running,
         alert_armed: self.alert_armed,
         estimate_minutes: self.last_estimate,
         samples: self.window.len(),
         rate_per_minute: self.current_rate(),
      }
   }

   fn on_unplugged(&mut self, level: u8) -> Option<ChargeEvent> {
      if self.plugged != Some(false) {
         info!("Charger disconnected at {level}%");
         self.plugged = Some(false);
      }

      let was_alerted = !self.alert_armed;
      self.window.clear();
      self.alert_armed = true;
      self.last_estimate = None;
      self.set_state(SessionState::WaitingForRate);

      if was_alerted {
         debug!("Alert re-armed for the next charge");
         Some(ChargeEvent::AlertReset)
      } else {
         None
      }
   }

   fn set_state(&mut self, next: SessionState) {
      // Stay alerted until the charger is removed
      let next = if self.alert_armed {
         next
      } else {
         SessionState::Alerted
      };
      if self.state != next {
         debug!("Session state: {} -> {next}", self.state);
         self.state = next;
      }
   }
}
