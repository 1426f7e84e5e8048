//! Load generations, cancellation and deadlines
//!
//! Every load gets a generation number and a [`LoadToken`]. Starting a new
//! load cancels the previous token, and results carrying an older generation
//! are dropped by the controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use crate::error::LoadError;

/// Wall-clock milliseconds, since `std::time::Instant` panics in the browser
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Instant(f64);

#[cfg(target_arch = "wasm32")]
impl Instant {
    fn now() -> Self {
        Self(js_sys::Date::now())
    }

    fn checked_add(self, duration: Duration) -> Option<Self> {
        let ms = self.0 + duration.as_secs_f64() * 1000.0;
        ms.is_finite().then_some(Self(ms))
    }
}

/// Cancellation flag plus optional deadline, checked between pipeline stages
#[derive(Debug, Clone)]
pub struct LoadToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    timeout_secs: u64,
}

impl LoadToken {
    /// Token that expires `timeout` from now (never when `None`, or when the
    /// deadline is unrepresentable)
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
            timeout_secs: timeout.map_or(0, |t| t.as_secs()),
        }
    }

    /// Token that never expires
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err` if the load should stop now
    pub fn check(&self) -> Result<(), LoadError> {
        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(LoadError::TimedOut(self.timeout_secs))
            }
            _ => Ok(()),
        }
    }
}

/// A started load
#[derive(Debug, Clone)]
pub struct LoadTicket {
    pub generation: u64,
    pub token: LoadToken,
}

/// Tracks the single load whose result may reach the viewer
#[derive(Debug, Default)]
pub struct LoadController {
    generation: u64,
    active: Option<LoadTicket>,
}

impl LoadController {
    /// Create a controller with no load in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load, superseding the one in flight
    pub fn begin(&mut self, timeout: Option<Duration>) -> LoadTicket {
        if let Some(previous) = self.active.take() {
            tracing::debug!(generation = previous.generation, "Superseding load");
            previous.token.cancel();
        }
        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
            token: LoadToken::new(timeout),
        };
        self.active = Some(ticket.clone());
        ticket
    }

    /// Check if `generation` is the load in flight
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|ticket| ticket.generation == generation)
    }

    /// Mark a load as finished. Returns `false` for a stale generation.
    pub fn finish(&mut self, generation: u64) -> bool {
        if self.is_current(generation) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Check if a load is in flight
    pub fn in_flight(&self) -> bool {
        self.active.is_some()
    }

    /// Cancel the load in flight, if any
    pub fn cancel(&mut self) {
        if let Some(ticket) = self.active.take() {
            ticket.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_passes() {
        assert_eq!(LoadToken::unbounded().check(), Ok(()));
        assert_eq!(
            LoadToken::new(Some(Duration::from_secs(60))).check(),
            Ok(())
        );
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = LoadToken::unbounded();
        let clone = token.clone();
        token.cancel();
        assert_eq!(clone.check(), Err(LoadError::Cancelled));
    }

    #[test]
    fn test_expired_deadline() {
        let token = LoadToken::new(Some(Duration::ZERO));
        assert_eq!(token.check(), Err(LoadError::TimedOut(0)));
    }

    #[test]
    fn test_deadline_expires_after_timeout() {
        let token = LoadToken::new(Some(Duration::from_millis(20)));
        assert_eq!(token.check(), Ok(()));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(token.check(), Err(LoadError::TimedOut(0)));
    }

    #[test]
    fn test_huge_timeout_never_expires() {
        let token = LoadToken::new(Some(Duration::MAX));
        assert_eq!(token.check(), Ok(()));
    }

    #[test]
    fn test_new_load_supersedes_previous() {
        let mut controller = LoadController::new();
        let first = controller.begin(None);
        let second = controller.begin(None);

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert!(second.generation > first.generation);

        assert!(!controller.finish(first.generation));
        assert!(controller.in_flight());
        assert!(controller.finish(second.generation));
        assert!(!controller.in_flight());
    }

    #[test]
    fn test_cancel_clears_in_flight() {
        let mut controller = LoadController::new();
        let ticket = controller.begin(None);
        controller.cancel();
        assert!(ticket.token.is_cancelled());
        assert!(!controller.finish(ticket.generation));
    }
}
