//! Request/response scratch buffers and the concurrency mode that owns them.
//!
//! # Design
//! In `Exclusive` mode the bot keeps one request buffer and one response
//! buffer for its whole lifetime and every call borrows both through a
//! `Lease`. The pair sits behind a single mutex, so a send and an upload on
//! the same bot can never write into the same buffer at once; concurrent
//! callers simply queue. In `Shared` mode each lease allocates a fresh pair
//! and no lock is taken.
//!
//! A lease clears the pooled buffers when dropped, which covers every exit
//! path of a call including early returns through `?`.

use std::ops::{Deref, DerefMut};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pooled buffers larger than this are shrunk back after a call so one big
/// upload does not pin memory for the lifetime of the bot.
const MAX_RETAINED_CAPACITY: usize = 1 << 20;

/// How a bot allocates request and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Reuse one buffer pair per bot. Calls on the same bot are serialized.
    #[default]
    Exclusive,
    /// Allocate buffers per call. Calls on the same bot run concurrently.
    Shared,
}

#[derive(Debug, Default)]
pub(crate) struct Scratch {
    pub(crate) request: Vec<u8>,
    pub(crate) response: Vec<u8>,
}

impl Scratch {
    fn reset(&mut self) {
        self.request.clear();
        self.response.clear();
        for buf in [&mut self.request, &mut self.response] {
            if buf.capacity() > MAX_RETAINED_CAPACITY {
                debug!(capacity = buf.capacity(), "shrinking scratch buffer");
                buf.shrink_to(MAX_RETAINED_CAPACITY);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) enum ScratchSpace {
    Exclusive(Mutex<Scratch>),
    Shared,
}

impl ScratchSpace {
    pub(crate) fn new(mode: ConcurrencyMode) -> Self {
        match mode {
            ConcurrencyMode::Exclusive => ScratchSpace::Exclusive(Mutex::new(Scratch::default())),
            ConcurrencyMode::Shared => ScratchSpace::Shared,
        }
    }

    pub(crate) fn mode(&self) -> ConcurrencyMode {
        match self {
            ScratchSpace::Exclusive(_) => ConcurrencyMode::Exclusive,
            ScratchSpace::Shared => ConcurrencyMode::Shared,
        }
    }

    pub(crate) fn lease(&self) -> Lease<'_> {
        match self {
            ScratchSpace::Exclusive(pool) => Lease::Pooled(pool.lock()),
            ScratchSpace::Shared => Lease::Fresh(Scratch::default()),
        }
    }

    /// Lengths of the pooled request and response buffers.
    #[cfg(test)]
    pub(crate) fn pooled_lens(&self) -> Option<(usize, usize)> {
        match self {
            ScratchSpace::Exclusive(pool) => {
                let scratch = pool.lock();
                Some((scratch.request.len(), scratch.response.len()))
            }
            ScratchSpace::Shared => None,
        }
    }
}

/// Buffers borrowed for the duration of one call.
pub(crate) enum Lease<'a> {
    Pooled(MutexGuard<'a, Scratch>),
    Fresh(Scratch),
}

impl Deref for Lease<'_> {
    type Target = Scratch;

    fn deref(&self) -> &Scratch {
        match self {
            Lease::Pooled(guard) => &**guard,
            Lease::Fresh(scratch) => scratch,
        }
    }
}

impl DerefMut for Lease<'_> {
    fn deref_mut(&mut self) -> &mut Scratch {
        match self {
            Lease::Pooled(guard) => &mut **guard,
            Lease::Fresh(scratch) => scratch,
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Lease::Pooled(guard) = self {
            guard.reset();
        }
    }
}
