//! Match presentation helpers and latest-result tracking.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend only returns a similarity score; views classify it, format
//! it, and must tolerate requests completing out of order. `LatestSlot`
//! correlates each completion with the request that started it, the same
//! way a pending request id is matched against a response's parent id.

use std::sync::{Mutex, PoisonError};

use crate::net::types::Image;

pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.95;
pub const PROBABLE_THRESHOLD: f64 = 0.90;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchConfidence {
    High,
    Probable,
    Low,
}

impl MatchConfidence {
    #[must_use]
    pub fn classify(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE_THRESHOLD {
            Self::High
        } else if score >= PROBABLE_THRESHOLD {
            Self::Probable
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High Confidence Match",
            Self::Probable => "Probable Match",
            Self::Low => "Low Confidence Match",
        }
    }
}

/// Score as a percentage with two decimals (`0.97` -> `"97.00%"`).
#[must_use]
pub fn format_score(score: f64) -> String {
    format!("{:.2}%", score * 100.0)
}

/// Images that can be submitted for matching (non-reference only).
#[must_use]
pub fn query_images(images: Vec<Image>) -> Vec<Image> {
    images.into_iter().filter(|img| !img.is_reference).collect()
}

// =============================================================================
// LATEST SLOT
// =============================================================================

/// Identifies one request issued for a [`LatestSlot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotTicket(u64);

/// Holds the result of the most recently issued request for one logical slot.
#[derive(Debug)]
pub struct LatestSlot<T> {
    inner: Mutex<SlotInner<T>>,
}

#[derive(Debug)]
struct SlotInner<T> {
    issued: u64,
    value: Option<T>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self { inner: Mutex::new(SlotInner { issued: 0, value: None }) }
    }
}

impl<T: Clone> LatestSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request; any earlier ticket becomes stale.
    pub fn begin(&self) -> SlotTicket {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.issued = inner.issued.wrapping_add(1);
        SlotTicket(inner.issued)
    }

    /// Store `value` if `ticket` is still the latest. Returns whether it was applied.
    pub fn fulfill(&self, ticket: SlotTicket, value: T) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if ticket.0 != inner.issued {
            return false;
        }
        inner.value = Some(value);
        true
    }

    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.issued = inner.issued.wrapping_add(1);
        inner.value = None;
    }
}

#[cfg(test)]
#[path = "matching_test.rs"]
mod matching_test;
