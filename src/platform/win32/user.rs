// ── Process and user environment ──────────────────────────────────────────────
//
// Executable directory, profile (home) directory, user name, current
// directory and search-path lookup.  The string queries come in two shapes:
// doubling (the call truncates and reports a length ≥ capacity) and
// size-then-fill (a first call with no buffer reports the size needed).

use std::ptr;

use tracing::warn;
use windows::{
    core::{PCWSTR, PWSTR},
    Win32::{
        Foundation::{HANDLE, HMODULE},
        Security::TOKEN_QUERY,
        System::Threading::{GetCurrentProcess, OpenProcessToken},
    },
};

use super::{
    capabilities::{require, CapabilityTable},
    handle::OwnedHandle,
};
use crate::{
    buffer::fill_doubling,
    capability::Capability,
    config::BackendConfig,
    encoding::{narrow, narrow_nul, widen},
    error::{BackendError, Result},
    path::{directory_of, with_trailing_separator},
};

/// `buf.len()` as the `DWORD` capacity argument.
fn capacity_of(buf: &[u16]) -> u32 {
    u32::try_from(buf.len()).unwrap_or(u32::MAX)
}

/// A zeroed UTF-16 buffer of `len` units, or `OutOfMemory`.
fn wide_buffer(len: usize) -> Result<Vec<u16>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| BackendError::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Directory of the running executable, separator-terminated.
pub(crate) fn executable_directory(caps: &CapabilityTable, config: &BackendConfig) -> Result<String> {
    let get_module_file_name = require(caps.get_module_file_name_w, Capability::GetModuleFileNameW)?;
    let wide = fill_doubling(
        config.module_path_initial_capacity,
        config.module_path_max_capacity,
        |buf: &mut [u16]| {
            // SAFETY: a null module means the executable itself; buf is
            // writable for the capacity passed.
            let len = unsafe {
                get_module_file_name(HMODULE::default(), PWSTR(buf.as_mut_ptr()), capacity_of(buf))
            };
            if len == 0 {
                return Err(caps.last_error("GetModuleFileNameW"));
            }
            Ok(len as usize)
        },
    )?;
    let module_path = narrow(&wide)?;
    Ok(directory_of(&module_path)?.to_owned())
}

/// The user's profile directory, or the executable directory when the
/// profile cannot be determined.
pub(crate) fn home_directory(caps: &CapabilityTable, config: &BackendConfig) -> Result<String> {
    profile_directory(caps).or_else(|e| {
        warn!(error = %e, "no profile directory; using the executable directory");
        executable_directory(caps, config)
    })
}

fn profile_directory(caps: &CapabilityTable) -> Result<String> {
    let get_profile = require(caps.get_user_profile_directory_w, Capability::GetUserProfileDirectoryW)?;

    let mut raw = HANDLE::default();
    // SAFETY: the pseudo-handle from GetCurrentProcess needs no closing; raw
    // is a live local that receives the token.
    unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut raw) }
        .map_err(|e| caps.windows_error("OpenProcessToken", e))?;
    // SAFETY: raw is a fresh token handle owned by nobody else.
    let token = unsafe { OwnedHandle::from_raw(raw) };

    // The sizing call is expected to fail; only the reported size matters.
    let mut len = 0u32;
    // SAFETY: a null buffer with a zero size is the documented size query.
    let _ = unsafe { get_profile(token.raw(), PWSTR::null(), &mut len) };
    if len == 0 {
        return Err(caps.last_error("GetUserProfileDirectoryW"));
    }

    let mut buf = wide_buffer(len as usize)?;
    // SAFETY: buf holds `len` writable units; token is a live token handle.
    if !unsafe { get_profile(token.raw(), PWSTR(buf.as_mut_ptr()), &mut len) }.as_bool() {
        return Err(caps.last_error("GetUserProfileDirectoryW"));
    }
    narrow_nul(&buf)
}

/// Name of the user owning this process.
pub(crate) fn user_name(caps: &CapabilityTable) -> Result<String> {
    let get_user_name = require(caps.get_user_name_w, Capability::GetUserNameW)?;

    let mut len = 0u32;
    // SAFETY: a null buffer with a zero size is the documented size query.
    let _ = unsafe { get_user_name(PWSTR::null(), &mut len) };
    if len == 0 {
        return Err(caps.last_error("GetUserNameW"));
    }

    let mut buf = wide_buffer(len as usize)?;
    // SAFETY: buf holds `len` writable units.
    if !unsafe { get_user_name(PWSTR(buf.as_mut_ptr()), &mut len) }.as_bool() {
        return Err(caps.last_error("GetUserNameW"));
    }
    narrow_nul(&buf)
}

/// The process's current directory, separator-terminated.
pub(crate) fn current_directory(caps: &CapabilityTable, config: &BackendConfig) -> Result<String> {
    let get_current_directory =
        require(caps.get_current_directory_w, Capability::GetCurrentDirectoryW)?;
    let wide = fill_doubling(
        config.module_path_initial_capacity,
        config.module_path_max_capacity,
        |buf: &mut [u16]| {
            // SAFETY: buf is writable for the capacity passed.
            let len = unsafe { get_current_directory(capacity_of(buf), PWSTR(buf.as_mut_ptr())) };
            if len == 0 {
                return Err(caps.last_error("GetCurrentDirectoryW"));
            }
            Ok(len as usize)
        },
    )?;
    Ok(with_trailing_separator(narrow(&wide)?))
}

/// Full path of `file` found along the system search path.
pub(crate) fn search_path(caps: &CapabilityTable, config: &BackendConfig, file: &str) -> Result<String> {
    let search = require(caps.search_path_w, Capability::SearchPathW)?;
    let name = widen(file)?;
    let wide = fill_doubling(
        config.module_path_initial_capacity,
        config.module_path_max_capacity,
        |buf: &mut [u16]| {
            // SAFETY: name is null-terminated and outlives the call; a null
            // search path means the system default order, a null extension
            // means none, and the file-part pointer is not requested.
            let len = unsafe {
                search(
                    PCWSTR::null(),
                    PCWSTR(name.as_ptr()),
                    PCWSTR::null(),
                    capacity_of(buf),
                    PWSTR(buf.as_mut_ptr()),
                    ptr::null_mut(),
                )
            };
            if len == 0 {
                return Err(caps.last_error("SearchPathW"));
            }
            Ok(len as usize)
        },
    )?;
    narrow(&wide)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
