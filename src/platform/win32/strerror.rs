// ── Win32 error text ──────────────────────────────────────────────────────────
//
// Turns a `GetLastError` code into the system's one-line description.  The
// UTF-16 scratch buffer is per thread and reused (overwritten) by the next
// lookup; callers receive an owned UTF-8 copy.

use std::{cell::RefCell, ffi::c_void, ptr};

use windows::core::PWSTR;

use super::sys::{
    FormatMessageWFn, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS,
    LANG_NEUTRAL_SUBLANG_DEFAULT,
};
use crate::encoding::narrow;

thread_local! {
    static SCRATCH: RefCell<Vec<u16>> = const { RefCell::new(Vec::new()) };
}

/// Describe `code`.  Without `FormatMessageW` (or when it has no text for
/// the code) the numeric code is shown instead.
pub(crate) fn describe(format_message: Option<FormatMessageWFn>, code: u32, capacity: usize) -> String {
    let Some(format_message) = format_message else {
        return fallback(code);
    };

    SCRATCH.with(|scratch| {
        let mut buf = scratch.borrow_mut();
        buf.clear();
        buf.resize(capacity.max(1), 0);

        // SAFETY: buf holds `buf.len()` writable UTF-16 units and is not
        // touched by anything else during the call; FORMAT_MESSAGE_FROM_SYSTEM
        // with IGNORE_INSERTS reads no source or arguments.
        let len = unsafe {
            format_message(
                FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
                ptr::null::<c_void>(),
                code,
                LANG_NEUTRAL_SUBLANG_DEFAULT,
                PWSTR(buf.as_mut_ptr()),
                buf.len() as u32,
                ptr::null::<c_void>(),
            )
        } as usize;

        if len == 0 {
            return fallback(code);
        }
        match narrow(&buf[..len.min(buf.len())]) {
            Ok(text) => first_line(&text).to_owned(),
            Err(_) => fallback(code),
        }
    })
}

fn fallback(code: u32) -> String {
    format!("Win32 error {code:#010x}")
}

/// System messages end with CR LF; keep only the first line.
fn first_line(text: &str) -> &str {
    text.split(['\r', '\n']).next().unwrap_or("").trim_end()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
