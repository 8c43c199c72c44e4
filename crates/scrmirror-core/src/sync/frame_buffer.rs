//! Two-slot handoff between the decoder thread and the render thread.
//!
//! The decoder produces frames faster or slower than the renderer consumes
//! them. `FrameBuffer` keeps exactly two frame storages, one being written
//! by the decoder and one waiting to be drawn, and swaps their roles each
//! time a frame is offered. The storages are reused in place, so steady-state
//! operation allocates nothing.
//!
//! Two policies control what happens when a new frame arrives before the
//! previous one was rendered:
//!
//! - [`FramePolicy::DropOldest`]: the unrendered frame is replaced and the
//!   skipped counter increments. The decoder never waits.
//! - [`FramePolicy::BlockUntilConsumed`]: the decoder waits until the
//!   renderer has taken the previous frame (or the buffer is interrupted).

use std::mem;
use std::ops::Deref;
use std::sync::{Condvar, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// What `offer` does when the previous frame has not been rendered yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicy {
    #[default]
    DropOldest,
    BlockUntilConsumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameBufferError {
    /// The buffer was interrupted; no frame was delivered.
    #[error("frame buffer interrupted")]
    Interrupted,
}

struct Slots<F> {
    decoding: F,
    rendering: F,
    render_consumed: bool,
    interrupted: bool,
    skipped: u64,
}

/// Single-producer / single-consumer frame handoff.
pub struct FrameBuffer<F> {
    slots: Mutex<Slots<F>>,
    consumed: Condvar,
    policy: FramePolicy,
}

/// Lock-scoped access to the frame being rendered.
///
/// The frame cannot outlive the guard, and the decoder cannot swap slots
/// while the guard is alive.
pub struct RenderGuard<'a, F> {
    slots: MutexGuard<'a, Slots<F>>,
}

impl<F> Deref for RenderGuard<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.slots.rendering
    }
}

impl<F: Default> FrameBuffer<F> {
    pub fn new(policy: FramePolicy) -> Self {
        Self {
            slots: Mutex::new(Slots {
                decoding: F::default(),
                rendering: F::default(),
                // nothing to render yet, so nothing to skip
                render_consumed: true,
                interrupted: false,
                skipped: 0,
            }),
            consumed: Condvar::new(),
            policy,
        }
    }
}

impl<F> FrameBuffer<F> {
    /// Publishes `frame` as the newest frame to render.
    ///
    /// `frame` is swapped into the decode slot and the slot roles toggle; on
    /// return `frame` holds a recycled storage the caller may overwrite.
    ///
    /// Returns `true` when the previous frame was never rendered and has been
    /// dropped. In that case a render request for it is still pending, so the
    /// caller does not need to signal a new one.
    ///
    /// # Errors
    ///
    /// [`FrameBufferError::Interrupted`] once [`interrupt`](Self::interrupt)
    /// has been called; `frame` is left untouched.
    pub fn offer(&self, frame: &mut F) -> Result<bool, FrameBufferError> {
        let mut slots = self.lock();

        if self.policy == FramePolicy::BlockUntilConsumed {
            while !slots.render_consumed && !slots.interrupted {
                slots = self
                    .consumed
                    .wait(slots)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        }
        if slots.interrupted {
            return Err(FrameBufferError::Interrupted);
        }

        let slots = &mut *slots;
        mem::swap(frame, &mut slots.decoding);
        mem::swap(&mut slots.decoding, &mut slots.rendering);

        let previous_skipped = !slots.render_consumed;
        if previous_skipped {
            slots.skipped += 1;
            trace!(skipped = slots.skipped, "unrendered frame replaced");
        }
        slots.render_consumed = false;
        Ok(previous_skipped)
    }

    /// Takes the latest frame for rendering.
    ///
    /// Returns `None` when no new frame has been offered since the last call.
    pub fn acquire_for_render(&self) -> Option<RenderGuard<'_, F>> {
        let mut slots = self.lock();
        if slots.render_consumed {
            return None;
        }
        slots.render_consumed = true;
        if self.policy == FramePolicy::BlockUntilConsumed {
            self.consumed.notify_one();
        }
        Some(RenderGuard { slots })
    }

    /// Wakes a producer blocked in [`offer`](Self::offer) and makes every
    /// later offer fail.
    pub fn interrupt(&self) {
        self.lock().interrupted = true;
        self.consumed.notify_all();
    }

    /// Number of frames dropped because a newer one replaced them.
    pub fn skipped_frames(&self) -> u64 {
        self.lock().skipped
    }

    pub fn policy(&self) -> FramePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Slots<F>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
