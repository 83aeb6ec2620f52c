//! Wall-clock time for the move guard
//!
//! The frame loop's `dt` only moves while a host keeps calling `advance`, so
//! the guard also checks real elapsed time through a [`Clock`].

use std::cell::Cell;
use std::rc::Rc;

/// Seconds since some fixed origin. Only differences are meaningful.
pub trait Clock {
    fn now_secs(&self) -> f64;
}

/// Monotonic clock natively, `Date.now()` in the browser
#[derive(Debug, Clone)]
pub struct SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    origin: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            origin: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    #[cfg(target_arch = "wasm32")]
    fn now_secs(&self) -> f64 {
        js_sys::Date::now() / 1000.0
    }
}

/// Clock moved by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<f64>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f64) {
        self.0.set(self.0.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(1.5);
        clock.advance(2.0);
        assert_eq!(view.now_secs(), 3.5);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::default();
        let a = clock.now_secs();
        let b = clock.now_secs();
        assert!(b >= a);
    }
}
