//! Trailing-window coalescing for outgoing updates.
//!
//! The first value offered into an idle throttle arms a deadline one window
//! ahead. Everything offered before the deadline folds into the pending
//! value, which is released once when the deadline passes. The throttle is
//! driven by the caller's clock, so it needs no timer task and cancels by
//! being dropped.

use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use vodon_core::DocumentDelta;

/// Values that can absorb a later value into their net effect.
pub trait Coalesce {
    fn coalesce(&mut self, later: Self);
}

impl Coalesce for DocumentDelta {
    fn coalesce(&mut self, later: Self) {
        DocumentDelta::coalesce(self, later);
    }
}

/// Presence fields: later keys overwrite earlier ones.
impl Coalesce for BTreeMap<String, Value> {
    fn coalesce(&mut self, later: Self) {
        self.extend(later);
    }
}

#[derive(Debug)]
pub struct Throttle<T> {
    window: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T: Coalesce> Throttle<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
        }
    }

    /// Buffer `value`, arming the window if idle.
    pub fn offer(&mut self, value: T, now: Instant) {
        match self.pending.as_mut() {
            Some(pending) => pending.coalesce(value),
            None => self.pending = Some(value),
        }
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
    }

    /// Put back a value that failed to go out. It is older than anything
    /// offered since, so later values still win.
    pub fn requeue(&mut self, earlier: T, now: Instant) {
        let merged = match self.pending.take() {
            Some(later) => {
                let mut merged = earlier;
                merged.coalesce(later);
                merged
            }
            None => earlier,
        };
        self.pending = Some(merged);
        self.deadline.get_or_insert(now + self.window);
    }

    /// Release the pending value if its window has closed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if deadline <= now => self.flush_now(),
            _ => None,
        }
    }

    /// Release the pending value immediately.
    pub fn flush_now(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending = None;
    }

    /// The value waiting for the window to close.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
