// ── Doubling buffer helper ────────────────────────────────────────────────────
//
// Several Win32 queries (module file name, search path) write into a caller
// buffer and report a length that is ≥ the capacity when the buffer was too
// small.  `fill_doubling` retries with twice the capacity until the reported
// length fits, up to a hard ceiling.

use crate::error::{BackendError, Result};

/// Repeatedly call `fill` with a zeroed buffer of growing capacity.
///
/// `fill` returns the length the native call reported.  When that length is
/// strictly less than the buffer's capacity the buffer is truncated to it and
/// returned; otherwise the capacity doubles.  Growth past `max` fails with
/// [`BackendError::BufferLimit`].
pub fn fill_doubling<T, F>(initial: usize, max: usize, mut fill: F) -> Result<Vec<T>>
where
    T: Copy + Default,
    F: FnMut(&mut [T]) -> Result<usize>,
{
    if initial == 0 || max < initial {
        return Err(BackendError::InvalidArgument);
    }

    let mut buf: Vec<T> = Vec::new();
    let mut capacity = initial;
    loop {
        buf.clear();
        buf.try_reserve_exact(capacity)
            .map_err(|_| BackendError::OutOfMemory)?;
        buf.resize(capacity, T::default());

        let len = fill(&mut buf)?;
        if len < capacity {
            buf.truncate(len);
            return Ok(buf);
        }

        if capacity >= max {
            return Err(BackendError::BufferLimit { limit: max });
        }
        capacity = capacity.saturating_mul(2).min(max);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
