//! Raw shared views over buffers owned by the calling stage.
//!
//! The parallel phases of the engine write disjoint index ranges of large
//! vectors from many threads at once, with barriers separating writers from
//! readers. These views carry the pointer and length only; callers guarantee
//! disjointness within a phase and publication across the barrier.

use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mutable view into a buffer that outlives the worker scope using it.
pub(crate) struct SharedSliceMut<T> {
    ptr: *mut T,
    len: usize,
}

unsafe impl<T> Send for SharedSliceMut<T> {}
unsafe impl<T> Sync for SharedSliceMut<T> {}

impl<T> Clone for SharedSliceMut<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            len: self.len,
        }
    }
}
impl<T> Copy for SharedSliceMut<T> {}

#[allow(dead_code)]
impl<T> SharedSliceMut<T> {
    pub(crate) fn of(buf: &mut [T]) -> Self {
        Self {
            ptr: buf.as_mut_ptr(),
            len: buf.len(),
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub(crate) fn get(&self, idx: usize) -> &T {
        assert!(idx < self.len);
        unsafe { &*self.ptr.add(idx) }
    }

    #[inline(always)]
    pub(crate) fn get_mut(&mut self, idx: usize) -> &mut T {
        assert!(idx < self.len);
        unsafe { &mut *self.ptr.add(idx) }
    }
}

/// Append-only frontier queue over borrowed storage.
///
/// Pushes reserve a block with an atomic cursor and may run concurrently;
/// reads are only valid after the barrier that ends the push phase.
#[derive(Clone)]
pub(crate) struct SharedQueueMut<T> {
    ptr: *mut T,
    cap: usize,
    write: Arc<AtomicUsize>,
}

unsafe impl<T> Send for SharedQueueMut<T> {}
unsafe impl<T> Sync for SharedQueueMut<T> {}

impl<T: Copy> SharedQueueMut<T> {
    pub(crate) fn of(slice: SharedSliceMut<T>) -> Self {
        Self {
            ptr: slice.ptr,
            cap: slice.len,
            write: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.write.load(Ordering::SeqCst).min(self.cap)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves a block and copies `items` in. None when capacity would be
    /// exceeded; the reservation is rolled back so later pushes still fit.
    pub(crate) fn push_slice(&mut self, items: &[T]) -> Option<usize> {
        let at = self.write.fetch_add(items.len(), Ordering::SeqCst);
        if at + items.len() <= self.cap {
            unsafe {
                std::ptr::copy_nonoverlapping(items.as_ptr(), self.ptr.add(at), items.len());
            }
            Some(at)
        } else {
            self.write.fetch_sub(items.len(), Ordering::SeqCst);
            None
        }
    }

    /// Contents pushed so far. Valid between the barrier ending the push
    /// phase and the next clear.
    pub(crate) fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len()) }
    }

    /// Resets the cursor. Every clone shares it, so one clear empties all.
    pub(crate) fn clear(self) -> Self {
        self.write.store(0, Ordering::SeqCst);
        self
    }
}
