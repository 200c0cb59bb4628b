//! Round-robin image selection
//!
//! The cursor starts before the first element. Each [`ImageRotator::next`]
//! moves it one step forward, wrapping at the end of the list. The step is a
//! single atomic read-modify-write, so concurrent reply tasks each get their
//! own position and none is skipped.

use snapback_core::{ImageDescriptor, Result, SnapbackError};
use std::sync::atomic::{AtomicUsize, Ordering};

const BEFORE_FIRST: usize = usize::MAX;

/// Process-lifetime rotation cursor
#[derive(Debug)]
pub struct ImageRotator {
    cursor: AtomicUsize,
}

impl ImageRotator {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(BEFORE_FIRST),
        }
    }

    /// Advance over a list of `len` entries and return the new position
    ///
    /// Returns `None` for an empty list; the cursor is left untouched.
    pub fn advance(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let step = |current: usize| {
            if current == BEFORE_FIRST {
                0
            } else {
                (current + 1) % len
            }
        };

        let previous = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some(step(c)))
        {
            Ok(previous) | Err(previous) => previous,
        };

        Some(step(previous))
    }

    /// Pick the next image from `images`
    pub fn next<'a>(&self, images: &'a [ImageDescriptor]) -> Result<&'a ImageDescriptor> {
        self.advance(images.len())
            .and_then(|index| images.get(index))
            .ok_or_else(|| {
                SnapbackError::ResourceUnavailable("Image manifest is empty".to_string())
            })
    }

    /// Current position, `None` before the first pick
    pub fn position(&self) -> Option<usize> {
        match self.cursor.load(Ordering::Acquire) {
            BEFORE_FIRST => None,
            position => Some(position),
        }
    }
}

impl Default for ImageRotator {
    fn default() -> Self {
        Self::new()
    }
}
