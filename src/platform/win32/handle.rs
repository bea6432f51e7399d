// ── Owned kernel handles ──────────────────────────────────────────────────────

use std::mem::ManuallyDrop;

use windows::Win32::Foundation::{CloseHandle, HANDLE};

/// A kernel object handle released with `CloseHandle` on drop.
pub(crate) struct OwnedHandle(HANDLE);

// SAFETY: kernel handles are process-wide; any thread may use or close them.
unsafe impl Send for OwnedHandle {}
// SAFETY: the wrapper never mutates the handle value.  Concurrent use of the
// underlying object is serialised by the kernel.
unsafe impl Sync for OwnedHandle {}

impl OwnedHandle {
    /// Take ownership of `handle`.
    ///
    /// # Safety
    ///
    /// `handle` must be a valid handle that nothing else will close, and it
    /// must be one `CloseHandle` accepts.
    pub(crate) unsafe fn from_raw(handle: HANDLE) -> Self {
        Self(handle)
    }

    pub(crate) fn raw(&self) -> HANDLE {
        self.0
    }

    /// Close now and report the outcome, instead of on drop.
    pub(crate) fn close(self) -> windows::core::Result<()> {
        let this = ManuallyDrop::new(self);
        // SAFETY: this.0 is owned by us and, with Drop suppressed, is closed
        // exactly once.
        unsafe { CloseHandle(this.0) }
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: self.0 is owned by us and closed exactly once, here.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}
