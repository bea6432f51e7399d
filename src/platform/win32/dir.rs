// ── Directory enumeration ─────────────────────────────────────────────────────

use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{GetLastError, ERROR_NO_MORE_FILES, HANDLE, INVALID_HANDLE_VALUE},
        Storage::FileSystem::{FindClose, WIN32_FIND_DATAW},
    },
};

use super::capabilities::{require, CapabilityTable};
use crate::{
    capability::Capability,
    encoding::{narrow_nul, widen},
    error::{set_last_error, Result},
    path::{is_pseudo_entry, wildcard_query},
};

/// Closes a search handle with `FindClose`.
struct FindGuard(HANDLE);

impl Drop for FindGuard {
    fn drop(&mut self) {
        // SAFETY: self.0 came from a successful FindFirstFileW and is closed
        // exactly once, here.
        unsafe {
            let _ = FindClose(self.0);
        }
    }
}

/// Call `callback(origin, name)` once per entry of `dir`, skipping `.` and
/// `..`.  Any failure is recorded in the error channel; entries delivered
/// before a failure stay delivered.
pub(crate) fn enumerate(
    caps: &CapabilityTable,
    dir: &str,
    origin: &str,
    callback: &mut dyn FnMut(&str, &str),
) {
    if let Err(e) = walk(caps, dir, origin, callback) {
        set_last_error(&e);
    }
}

fn walk(
    caps: &CapabilityTable,
    dir: &str,
    origin: &str,
    callback: &mut dyn FnMut(&str, &str),
) -> Result<()> {
    let find_first = require(caps.find_first_file_w, Capability::FindFirstFileW)?;
    let find_next = require(caps.find_next_file_w, Capability::FindNextFileW)?;

    let query = widen(&wildcard_query(dir)?)?;
    let mut entry = WIN32_FIND_DATAW::default();
    // SAFETY: query is null-terminated and outlives the call; entry is a
    // live, writable WIN32_FIND_DATAW.
    let handle = unsafe { find_first(PCWSTR(query.as_ptr()), &mut entry) };
    if handle == INVALID_HANDLE_VALUE {
        return Err(caps.last_error("FindFirstFileW"));
    }
    let guard = FindGuard(handle);

    loop {
        let name = narrow_nul(&entry.cFileName)?;
        if !is_pseudo_entry(&name) {
            callback(origin, &name);
        }

        // SAFETY: guard.0 is an open search handle; entry is writable.
        if !unsafe { find_next(guard.0, &mut entry) }.as_bool() {
            // SAFETY: reads this thread's error slot, set by FindNextFileW.
            let code = unsafe { GetLastError() };
            if code == ERROR_NO_MORE_FILES {
                return Ok(());
            }
            return Err(caps.os_error("FindNextFileW", code.0));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(all(test, windows))]
mod tests {
    use super::*;
    use crate::{config::BackendConfig, error::{clear_last_error, last_error}};

    fn list(caps: &CapabilityTable, dir: &str) -> Vec<String> {
        let mut names = Vec::new();
        enumerate(caps, dir, "ctx", &mut |origin, name| {
            assert_eq!(origin, "ctx");
            names.push(name.to_owned());
        });
        names.sort();
        names
    }

    #[test]
    fn lists_children_without_pseudo_entries() {
        let caps = CapabilityTable::resolve(&BackendConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a"), b"").expect("a");
        std::fs::create_dir(dir.path().join("b")).expect("b");

        let path = dir.path().to_string_lossy().into_owned();
        assert_eq!(list(&caps, &path), ["a", "b"]);
        // A trailing separator makes no difference.
        assert_eq!(list(&caps, &format!("{path}\\")), ["a", "b"]);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let caps = CapabilityTable::resolve(&BackendConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        clear_last_error();
        assert!(list(&caps, &dir.path().to_string_lossy()).is_empty());
        assert!(last_error().is_none());
    }

    #[test]
    fn missing_directory_reports_through_the_channel() {
        let caps = CapabilityTable::resolve(&BackendConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope").to_string_lossy().into_owned();
        clear_last_error();
        assert!(list(&caps, &missing).is_empty());
        assert!(last_error().is_some());
    }
}
