//! Bounded history of charging samples.

use std::time::Instant;

use heapless::Deque;

/// Maximum number of samples kept in the window.
pub const WINDOW_CAPACITY: usize = 50;
/// Number of trailing samples used for the rate estimate.
pub const DEFAULT_RECENT_SAMPLES: usize = 10;

/// A battery level observed while charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
   pub level: u8,
   pub at: Instant,
}

impl Sample {
   pub const fn new(level: u8, at: Instant) -> Self {
      Self { level, at }
   }
}

/// Time-ordered ring buffer of charging samples.
///
/// Holds at most [`WINDOW_CAPACITY`] samples; pushing into a full window
/// evicts the oldest one.
#[derive(Debug, Clone, Default)]
pub struct SampleWindow {
   samples: Deque<Sample, WINDOW_CAPACITY>,
}

impl SampleWindow {
   pub const fn new() -> Self {
      Self {
         samples: Deque::new(),
      }
   }

   pub fn push(&mut self, sample: Sample) {
      if self.samples.is_full() {
         self.samples.pop_front();
      }
      // Cannot fail, a slot was freed above
      let _ = self.samples.push_back(sample);
   }

   pub fn len(&self) -> usize {
      self.samples.len()
   }

   pub fn is_empty(&self) -> bool {
      self.samples.is_empty()
   }

   pub fn clear(&mut self) {
      self.samples.clear();
   }

   /// Iterates samples from oldest to newest.
   pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + '_ {
      self.samples.iter()
   }

   pub fn last(&self) -> Option<&Sample> {
      self.samples.back()
   }

   /// Estimates the charge rate in percent per minute.
   ///
   /// Uses the slope between the first and last of the most recent
   /// `recent_count` samples. Returns `None` with fewer than two samples or
   /// when no time has elapsed between them.
   pub fn estimate_rate(&self, recent_count: usize) -> Option<f64> {
      let len = self.samples.len();
      let take = recent_count.min(len);
      if take < 2 {
         return None;
      }

      let first = self.samples.iter().nth(len - take)?;
      let last = self.samples.back()?;

      let minutes = last.at.saturating_duration_since(first.at).as_secs_f64() / 60.0;
      if minutes <= 0.0 {
         return None;
      }

      Some((f64::from(last.level) - f64::from(first.level)) / minutes)
   }
}

#[cfg(test)]
mod tests {
   use std::time::Duration;

   use super::*;

   fn minutes(m: u64) -> Duration {
      Duration::from_secs(m * 60)
   }

   #[test]
   fn test_window_evicts_oldest() {
      let mut window = SampleWindow::new();
      let base = Instant::now();

      for i in 0..80u64 {
         window.push(Sample::new((i % 100) as u8, base + minutes(i)));
      }

      assert_eq!(window.len(), WINDOW_CAPACITY);

      let levels: Vec<_> = window.iter().map(|s| s.level).collect();
      let expected: Vec<_> = (30..80).map(|i| i as u8).collect();
      assert_eq!(levels, expected);
      assert_eq!(window.last().map(|s| s.level), Some(79));
   }

   #[test]
   fn test_rate_two_point_slope() {
      let mut window = SampleWindow::new();
      let base = Instant::now();
      window.push(Sample::new(50, base));
      window.push(Sample::new(60, base + minutes(10)));

      let rate = window.estimate_rate(DEFAULT_RECENT_SAMPLES).expect("rate was none");
      assert!((rate - 1.0).abs() < 1e-9, "Rate was: {rate}");
   }

   #[test]
   fn test_rate_uses_trailing_samples_only() {
      let mut window = SampleWindow::new();
      let base = Instant::now();

      // Slow start followed by a faster charger
      for i in 0..10u64 {
         window.push(Sample::new(20 + i as u8, base + minutes(i * 2)));
      }
      for i in 0..10u64 {
         window.push(Sample::new(30 + 2 * i as u8, base + minutes(20 + i)));
      }

      let rate = window.estimate_rate(10).expect("rate was none");
      assert!((rate - 2.0).abs() < 1e-9, "Rate was: {rate}");
   }

   #[test]
   fn test_rate_needs_two_samples() {
      let mut window = SampleWindow::new();
      assert!(window.estimate_rate(10).is_none());

      window.push(Sample::new(40, Instant::now()));
      assert!(window.estimate_rate(10).is_none());
   }

   #[test]
   fn test_rate_none_without_elapsed_time() {
      let mut window = SampleWindow::new();
      let now = Instant::now();
      window.push(Sample::new(40, now));
      window.push(Sample::new(45, now));

      assert!(window.estimate_rate(10).is_none());
   }

   #[test]
   fn test_rate_can_be_negative() {
      let mut window = SampleWindow::new();
      let base = Instant::now();
      window.push(Sample::new(60, base));
      window.push(Sample::new(58, base + minutes(4)));

      let rate = window.estimate_rate(10).expect("rate was none");
      assert!((rate + 0.5).abs() < 1e-9, "Rate was: {rate}");
   }

   #[test]
   fn test_clear() {
      let mut window = SampleWindow::new();
      window.push(Sample::new(40, Instant::now()));
      window.clear();

      assert!(window.is_empty());
      assert!(window.last().is_none());
   }
}
