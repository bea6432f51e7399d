// ── Recursive mutex ───────────────────────────────────────────────────────────
//
// A Win32 mutex object is already owner-tracked and recursive: the owning
// thread may wait on it again without blocking, and must release it once
// per successful wait.

use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{FALSE, WAIT_FAILED},
        System::Threading::{CreateMutexW, ReleaseMutex, WaitForSingleObject, INFINITE},
    },
};

use super::handle::OwnedHandle;
use crate::{
    error::{report, BackendError, Result},
    platform::PlatformMutex,
};

pub struct Win32Mutex {
    handle: OwnedHandle,
}

impl Win32Mutex {
    pub(crate) fn create() -> Result<Self> {
        // SAFETY: default security, initially unowned, unnamed.
        let raw = unsafe { CreateMutexW(None, FALSE, PCWSTR::null()) }?;
        // SAFETY: raw is a fresh mutex handle owned by nobody else.
        let handle = unsafe { OwnedHandle::from_raw(raw) };
        Ok(Self { handle })
    }
}

impl PlatformMutex for Win32Mutex {
    fn acquire(&self) -> Result<()> {
        // SAFETY: the handle is a live mutex for the lifetime of `self`.
        let rc = unsafe { WaitForSingleObject(self.handle.raw(), INFINITE) };
        if rc == WAIT_FAILED {
            return report(Err(BackendError::from(windows::core::Error::from_win32())));
        }
        Ok(())
    }

    fn release(&self) {
        // SAFETY: the handle is a live mutex; releasing from a thread that
        // does not own it fails harmlessly.
        unsafe {
            let _ = ReleaseMutex(self.handle.raw());
        }
    }

    fn destroy(self) {
        let _ = self.handle.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
