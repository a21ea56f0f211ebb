//! Anonymous shared memory mappings.

use std::io;
use std::ptr;

use tracing::debug;

/// A fixed-length anonymous shared memory mapping.
///
/// The mapping is established with `MAP_SHARED | MAP_ANONYMOUS` so it stays
/// coherent across `fork()`, and is unmapped in `Drop` on every exit path.
/// A region is exclusively owned by one ring for its entire lifetime; the
/// owner coordinates concurrent access via atomics.
pub struct SharedRegion {
    base: *mut u8,
    len: usize,
}

// SAFETY: the region is plain bytes behind a raw pointer; the owner
// coordinates all concurrent access via acquire/release index pairs.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Map `len` bytes of anonymous shared memory, readable and writable.
    pub fn anonymous(len: usize) -> io::Result<Self> {
        assert!(len > 0, "cannot map an empty region");

        // SAFETY: anonymous mapping with no fd; length is non-zero.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        debug!(len, "mapped anonymous shared region");
        Ok(Self {
            base: base as *mut u8,
            len,
        })
    }

    /// Length of the mapping in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: `anonymous` rejects zero-length mappings. Present
    /// only to pair with [`len`](Self::len).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw pointer at `offset`.
    ///
    /// # Safety
    ///
    /// `offset` must be within the mapping.
    #[inline]
    pub unsafe fn ptr_at(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset <= self.len);
        unsafe { self.base.add(offset) }
    }

    /// Borrow `len` bytes at `offset`.
    ///
    /// # Safety
    ///
    /// The range must lie within the mapping and must not be written while
    /// the slice is live.
    #[inline]
    pub unsafe fn slice_at(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len));
        unsafe { std::slice::from_raw_parts(self.ptr_at(offset), len) }
    }

    /// Mutably borrow `len` bytes at `offset`.
    ///
    /// # Safety
    ///
    /// The range must lie within the mapping and the caller must have
    /// exclusive access to it for the lifetime of the slice.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slice_mut_at(&self, offset: usize, len: usize) -> &mut [u8] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len));
        unsafe { std::slice::from_raw_parts_mut(self.ptr_at(offset), len) }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // SAFETY: base/len are the exact mapping established in `anonymous`.
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.len);
        }
        debug!(len = self.len, "unmapped shared region");
    }
}
