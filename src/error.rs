// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in the backend return `error::Result<T>`.  No
// panics in production paths; a failure is recorded in the per-thread error
// channel at the point of detection and handed back to the caller as `Err`.

use std::cell::RefCell;

use thiserror::Error;

/// Every error that the backend can produce.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An allocation sized from native data could not be satisfied.
    #[error("out of memory")]
    OutOfMemory,

    /// A null, empty, or otherwise unusable argument.
    #[error("invalid argument")]
    InvalidArgument,

    /// A Win32 call reported failure.
    #[error("{function} failed: {message}")]
    Os {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// The raw Win32 error code (`GetLastError()` value) or HRESULT.
        code: u32,
        /// The system's description of `code`.
        message: String,
    },

    /// The executable's module path contains no separator.
    #[error("could not determine the executable's directory")]
    NoDirectory,

    /// An optional OS entry point was not resolved and has no fallback.
    #[error("{0} is not available on this system")]
    Unsupported(&'static str),

    /// A doubling buffer reached its configured ceiling.
    #[error("native string exceeds {limit} units")]
    BufferLimit {
        /// Capacity, in elements, at which growth stopped.
        limit: usize,
    },

    /// A calendar time could not be mapped onto the epoch.
    #[error("timestamp cannot be represented as epoch seconds")]
    InvalidTime,

    /// A standard I/O error (configuration file read, …).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for `BackendConfig`.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

// Convert a windows-crate error (HRESULT) directly into a BackendError so that
// `?` can be used on `windows::core::Result<T>` throughout the platform module.
#[cfg(windows)]
impl From<windows::core::Error> for BackendError {
    fn from(e: windows::core::Error) -> Self {
        // HRESULT.0 is i32; reinterpret bits as u32 for display purposes.
        // Win32 errors appear as 0x8007xxxx HRESULTs.
        Self::Os {
            function: "windows",
            code: e.code().0 as u32,
            message: e.message(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackendError>;

// ── Error channel ─────────────────────────────────────────────────────────────
//
// The portable dispatcher polls for "the last error" after a sentinel return.
// Each thread sees only the failures it caused; a new failure overwrites the
// previous message.

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record `err` as this thread's most recent failure.
pub fn set_last_error(err: &BackendError) {
    let message = err.to_string();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// The message of this thread's most recent failure, if any.
///
/// Returns an owned copy; the slot itself is overwritten by the next failure.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Forget this thread's most recent failure.
pub fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Record the error of a failed result in the channel and pass it through.
pub(crate) fn report<T>(result: Result<T>) -> Result<T> {
    result.inspect_err(set_last_error)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
