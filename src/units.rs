// ── Offsets and element counts ────────────────────────────────────────────────
//
// File positions are `u64` end to end; they are split into 32-bit halves only
// at the Win32 call boundary (`SetFilePointer`, `GetFileSize`).  Reads and
// writes are measured in whole elements of a caller-chosen size.

use crate::error::{BackendError, Result};

/// Split an offset into `(high, low)` 32-bit halves.
pub fn split_u64(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

/// Recombine `(high, low)` halves into an offset.
pub fn join_u64(high: u32, low: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

/// Byte length of a request for `count` elements of `size` bytes.
///
/// A zero element size, a request that does not fit the 32-bit transfer
/// length of `ReadFile`/`WriteFile`, or one larger than `available` bytes is
/// rejected.
pub fn request_bytes(size: u32, count: u32, available: usize) -> Result<u32> {
    if size == 0 {
        return Err(BackendError::InvalidArgument);
    }
    let bytes = size.checked_mul(count).ok_or(BackendError::InvalidArgument)?;
    if bytes as usize > available {
        return Err(BackendError::InvalidArgument);
    }
    Ok(bytes)
}

/// Whole elements covered by `bytes`; a trailing partial element is dropped.
pub fn elements_transferred(bytes: u32, size: u32) -> u64 {
    if size == 0 {
        0
    } else {
        u64::from(bytes / size)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join_cover_the_32_bit_boundary() {
        for v in [0, 1, u64::from(u32::MAX) - 1, u64::from(u32::MAX), 1 << 32, (1 << 32) + 5, u64::MAX] {
            let (hi, lo) = split_u64(v);
            assert_eq!(join_u64(hi, lo), v, "value {v:#x}");
        }
        assert_eq!(split_u64(0x1_0000_0002), (1, 2));
    }

    #[test]
    fn partial_elements_are_dropped() {
        assert_eq!(elements_transferred(10, 4), 2);
        assert_eq!(elements_transferred(12, 4), 3);
        assert_eq!(elements_transferred(3, 4), 0);
        assert_eq!(elements_transferred(5, 0), 0);
    }

    #[test]
    fn request_bytes_validates() {
        assert_eq!(request_bytes(4, 3, 12).expect("fits"), 12);
        assert!(matches!(request_bytes(0, 3, 12), Err(BackendError::InvalidArgument)));
        assert!(matches!(request_bytes(4, 4, 12), Err(BackendError::InvalidArgument)));
        assert!(matches!(
            request_bytes(u32::MAX, 2, usize::MAX),
            Err(BackendError::InvalidArgument)
        ));
    }
}
