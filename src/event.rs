//! Event handling for charging session updates.
//!
//! The monitoring core returns events from each ingested reading; the host
//! forwards them to every subscriber through an [`EventBus`].

use std::sync::Arc;

/// Events produced by a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeEvent {
   /// A fresh time-to-target estimate, in minutes.
   EstimateUpdated(u32),
   /// The target level was reached while charging.
   AlertFired { level: u8, target: u8 },
   /// The charger was disconnected after the alert fired; the alert is armed again.
   AlertReset,
}

/// Trait for implementing event emission.
pub trait EventBus: Send + Sync {
   /// Emits an event to all registered listeners.
   fn emit(&self, event: ChargeEvent);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventBus>;
