//! A non-owning view of the sancov guard table, and the guard increment itself.

use core::{mem::size_of, ptr, ptr::NonNull, slice};

/// The bounds of a table of `u32` edge counters, as handed out by the sancov module constructor.
///
/// The table is owned by the loaded module that contains the instrumented code.
/// This struct only remembers where it lives, it never allocates or frees anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardTable {
    start: *mut u32,
    stop: *mut u32,
}

impl Default for GuardTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardTable {
    /// An uninitialized table, without any guards.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start: ptr::null_mut(),
            stop: ptr::null_mut(),
        }
    }

    /// Records `[start, stop)` as the current table and zeroes every guard in it.
    ///
    /// An empty range (`start == stop`, including two null pointers) leaves the
    /// previously recorded table untouched and returns `false`.
    ///
    /// # Safety
    /// `start` and `stop` must delimit a writable, contiguous region of `u32`s with `start <= stop`.
    pub unsafe fn init(&mut self, start: *mut u32, stop: *mut u32) -> bool {
        if start == stop {
            return false;
        }

        self.start = start;
        self.stop = stop;

        let mut guard = start;
        while guard < stop {
            guard.write(0);
            guard = guard.add(1);
        }
        true
    }

    /// Number of guards in the table, `0` before the first initialization.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.stop() as usize).saturating_sub(self.start as usize) / size_of::<u32>()
    }

    /// `true` as long as no guards are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first guard of the table, or `None` before the first initialization.
    #[must_use]
    pub fn start(&self) -> Option<NonNull<u32>> {
        NonNull::new(self.start)
    }

    /// One past the last guard.
    #[must_use]
    pub(crate) fn stop(&self) -> *mut u32 {
        self.stop
    }

    /// Returns the index of `guard` inside this table, if it points to one of its slots.
    #[must_use]
    pub fn slot_index(&self, guard: *const u32) -> Option<usize> {
        let offset = (guard as usize).checked_sub(self.start as usize)?;
        if offset % size_of::<u32>() != 0 {
            return None;
        }
        let idx = offset / size_of::<u32>();
        (idx < self.len()).then_some(idx)
    }

    /// The guards as a slice.
    ///
    /// # Safety
    /// The module owning the table must still be loaded for the whole lifetime `'a`,
    /// and nobody may increment guards while the slice is alive.
    #[must_use]
    pub unsafe fn as_slice<'a>(&self) -> &'a [u32] {
        match self.start() {
            Some(start) => slice::from_raw_parts(start.as_ptr(), self.len()),
            None => &[],
        }
    }
}

/// Increments the guard at `guard` by one, wrapping on overflow.
///
/// Without the `atomic_guards` feature this is a plain read-modify-write:
/// two threads hitting the same edge at the same time may lose a count.
///
/// # Safety
/// `guard` must point to a valid, writable `u32`.
#[inline]
pub unsafe fn increment_guard(guard: *mut u32) {
    #[cfg(not(feature = "atomic_guards"))]
    {
        guard.write(guard.read().wrapping_add(1));
    }
    #[cfg(feature = "atomic_guards")]
    {
        use core::sync::atomic::{AtomicU32, Ordering};
        // `fetch_add` wraps on overflow
        AtomicU32::from_ptr(guard).fetch_add(1, Ordering::Relaxed);
    }
}
