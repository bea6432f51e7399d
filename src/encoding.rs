// ── UTF-8 ⇄ UTF-16 bridge ─────────────────────────────────────────────────────
//
// Every path crossing the backend boundary is UTF-8; every path handed to a
// Win32 `…W` entry point is a null-terminated UTF-16 buffer.  The conversions
// below are the only place the two meet.  No `unsafe`, no Win32 imports.

use crate::error::{BackendError, Result};

/// Scratch sizing for `widen`, in bytes of output per byte of input.
const WIDEN_BYTES_PER_INPUT_BYTE: usize = 4;

/// Result sizing for `narrow`, in bytes of output per UTF-16 unit.
const NARROW_BYTES_PER_UNIT: usize = 6;

/// Capacity, in UTF-16 units, of the scratch buffer for an input of
/// `narrow_len` bytes: `4 × len + 1` bytes rounded up to whole units.
pub fn widen_capacity(narrow_len: usize) -> usize {
    (narrow_len * WIDEN_BYTES_PER_INPUT_BYTE + 1).div_ceil(std::mem::size_of::<u16>())
}

/// Convert UTF-8 to a null-terminated UTF-16 buffer.
///
/// An interior NUL would silently cut the string short at the Win32 call, so
/// it is rejected with `InvalidArgument`.
pub fn widen(narrow: &str) -> Result<Vec<u16>> {
    if narrow.contains('\0') {
        return Err(BackendError::InvalidArgument);
    }
    let mut wide = Vec::with_capacity(widen_capacity(narrow.len()));
    wide.extend(narrow.encode_utf16());
    wide.push(0);
    Ok(wide)
}

/// Convert `wide` (no terminator expected) to an owned UTF-8 string.
///
/// The result buffer is reserved at its worst-case size and trimmed to the
/// converted length before it is returned.  Unpaired surrogates become
/// U+FFFD.
pub fn narrow(wide: &[u16]) -> Result<String> {
    let mut out = String::new();
    out.try_reserve_exact(wide.len() * NARROW_BYTES_PER_UNIT)
        .map_err(|_| BackendError::OutOfMemory)?;
    out.extend(
        char::decode_utf16(wide.iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
    out.shrink_to_fit();
    Ok(out)
}

/// Convert a UTF-16 buffer that is terminated by the first `0` unit (or by
/// its own end).
pub fn narrow_nul(buf: &[u16]) -> Result<String> {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    narrow(&buf[..len])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
