// ── Capability table ──────────────────────────────────────────────────────────
//
// Optional entry points are looked up once, with `GetProcAddress`, in DLLs the
// table itself keeps loaded.  Every entry is independently `None` when the OS
// does not export it (or configuration switched it off); callers consult the
// entry and fall back or fail with `Unsupported`, never branching on OS
// version.
//
// ── Lifetime model ────────────────────────────────────────────────────────────
//
// The typed function pointers are only valid while the `LoadedModule` that
// exported them is alive.  Both live in the same `CapabilityTable`, and
// `teardown` clears every pointer before it frees the modules, so no entry
// can outlive its DLL.  The backend shares the table with its open files
// through an `Arc`; a file opened before `deinit` keeps the old table (and
// its modules) alive until it is closed.

use tracing::debug;
use windows::{
    core::{PCSTR, PCWSTR},
    Win32::{
        Foundation::{GetLastError, HMODULE},
        System::LibraryLoader::{FreeLibrary, GetProcAddress, LoadLibraryW},
    },
};

use super::{strerror, sys::*};
use crate::{
    capability::{Capability, SystemModule},
    config::BackendConfig,
    encoding::widen,
    error::{BackendError, Result},
};

// ── LoadedModule ──────────────────────────────────────────────────────────────

/// RAII handle to one `LoadLibraryW` reference; `FreeLibrary` on drop.
struct LoadedModule {
    kind: SystemModule,
    handle: HMODULE,
}

// SAFETY: an HMODULE is a process-wide value, not tied to the loading thread;
// `FreeLibrary` may be called from any thread.
unsafe impl Send for LoadedModule {}
// SAFETY: the handle is never mutated after load; `GetProcAddress` is
// thread-safe.
unsafe impl Sync for LoadedModule {}

impl LoadedModule {
    fn load(kind: SystemModule) -> Option<Self> {
        let name = widen(kind.file_name()).ok()?;
        // SAFETY: name is a valid null-terminated UTF-16 string that outlives
        // the call.  These are system DLLs, resolved from the system
        // directory.
        match unsafe { LoadLibraryW(PCWSTR(name.as_ptr())) } {
            Ok(handle) => Some(Self { kind, handle }),
            Err(e) => {
                debug!(module = kind.file_name(), error = %e, "module not loaded");
                None
            }
        }
    }

    fn symbol(&self, cap: Capability) -> Option<RawProc> {
        let name = format!("{}\0", cap.name());
        // SAFETY: self.handle is a live module handle (freed only on drop);
        // name is a null-terminated ANSI string that outlives the call.
        unsafe { GetProcAddress(self.handle, PCSTR(name.as_ptr())) }
    }
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        // SAFETY: self.handle came from a successful LoadLibraryW and is
        // released exactly once, here.  The owning table has already cleared
        // every function pointer taken from this module.
        unsafe {
            let _ = FreeLibrary(self.handle);
        }
    }
}

// ── CapabilityTable ───────────────────────────────────────────────────────────

/// Typed, independently nullable entry points plus the modules backing them.
#[derive(Default)]
pub(crate) struct CapabilityTable {
    modules: Vec<LoadedModule>,
    message_capacity: usize,

    pub(crate) get_module_file_name_w: Option<GetModuleFileNameWFn>,
    pub(crate) format_message_w: Option<FormatMessageWFn>,
    pub(crate) find_first_file_w: Option<FindFirstFileWFn>,
    pub(crate) find_next_file_w: Option<FindNextFileWFn>,
    pub(crate) get_file_attributes_w: Option<GetFileAttributesWFn>,
    pub(crate) get_file_attributes_ex_w: Option<GetFileAttributesExWFn>,
    pub(crate) get_current_directory_w: Option<GetCurrentDirectoryWFn>,
    pub(crate) create_directory_w: Option<CreateDirectoryWFn>,
    pub(crate) remove_directory_w: Option<RemoveDirectoryWFn>,
    pub(crate) create_file_w: Option<CreateFileWFn>,
    pub(crate) delete_file_w: Option<DeleteFileWFn>,
    pub(crate) search_path_w: Option<SearchPathWFn>,
    pub(crate) system_time_to_tz_specific_local_time: Option<SystemTimeToTzSpecificLocalTimeFn>,
    pub(crate) get_user_profile_directory_w: Option<GetUserProfileDirectoryWFn>,
    pub(crate) get_user_name_w: Option<GetUserNameWFn>,
}

impl CapabilityTable {
    /// Load the system modules and bind every entry point.  A missing module
    /// or symbol leaves the affected entries `None`; nothing here fails.
    pub(crate) fn resolve(config: &BackendConfig) -> Self {
        let modules: Vec<LoadedModule> = SystemModule::ALL
            .into_iter()
            .filter_map(LoadedModule::load)
            .collect();
        let find = |cap| lookup(&modules, cap, config);

        macro_rules! bind {
            ($cap:ident, $ty:ty) => {
                find(Capability::$cap).map(|f| {
                    // SAFETY: `$ty` is the documented signature of the
                    // exported symbol `$cap`; fn pointers share one size and
                    // representation, and the pointer stays valid while the
                    // table holds its DLL.
                    unsafe { std::mem::transmute::<RawProc, $ty>(f) }
                })
            };
        }

        Self {
            message_capacity: config.error_message_capacity,
            get_module_file_name_w: bind!(GetModuleFileNameW, GetModuleFileNameWFn),
            format_message_w: bind!(FormatMessageW, FormatMessageWFn),
            find_first_file_w: bind!(FindFirstFileW, FindFirstFileWFn),
            find_next_file_w: bind!(FindNextFileW, FindNextFileWFn),
            get_file_attributes_w: bind!(GetFileAttributesW, GetFileAttributesWFn),
            get_file_attributes_ex_w: bind!(GetFileAttributesExW, GetFileAttributesExWFn),
            get_current_directory_w: bind!(GetCurrentDirectoryW, GetCurrentDirectoryWFn),
            create_directory_w: bind!(CreateDirectoryW, CreateDirectoryWFn),
            remove_directory_w: bind!(RemoveDirectoryW, RemoveDirectoryWFn),
            create_file_w: bind!(CreateFileW, CreateFileWFn),
            delete_file_w: bind!(DeleteFileW, DeleteFileWFn),
            search_path_w: bind!(SearchPathW, SearchPathWFn),
            system_time_to_tz_specific_local_time: bind!(
                SystemTimeToTzSpecificLocalTime,
                SystemTimeToTzSpecificLocalTimeFn
            ),
            get_user_profile_directory_w: bind!(GetUserProfileDirectoryW, GetUserProfileDirectoryWFn),
            get_user_name_w: bind!(GetUserNameW, GetUserNameWFn),
            modules,
        }
    }

    /// Clear every entry, then release the modules that backed them.
    pub(crate) fn teardown(&mut self) {
        let modules = std::mem::take(&mut self.modules);
        *self = Self::default();
        drop(modules);
    }

    /// Whether `cap` resolved.
    pub(crate) fn is_available(&self, cap: Capability) -> bool {
        match cap {
            Capability::GetModuleFileNameW => self.get_module_file_name_w.is_some(),
            Capability::FormatMessageW => self.format_message_w.is_some(),
            Capability::FindFirstFileW => self.find_first_file_w.is_some(),
            Capability::FindNextFileW => self.find_next_file_w.is_some(),
            Capability::GetFileAttributesW => self.get_file_attributes_w.is_some(),
            Capability::GetFileAttributesExW => self.get_file_attributes_ex_w.is_some(),
            Capability::GetCurrentDirectoryW => self.get_current_directory_w.is_some(),
            Capability::CreateDirectoryW => self.create_directory_w.is_some(),
            Capability::RemoveDirectoryW => self.remove_directory_w.is_some(),
            Capability::CreateFileW => self.create_file_w.is_some(),
            Capability::DeleteFileW => self.delete_file_w.is_some(),
            Capability::SearchPathW => self.search_path_w.is_some(),
            Capability::SystemTimeToTzSpecificLocalTime => {
                self.system_time_to_tz_specific_local_time.is_some()
            }
            Capability::GetUserProfileDirectoryW => self.get_user_profile_directory_w.is_some(),
            Capability::GetUserNameW => self.get_user_name_w.is_some(),
        }
    }

    /// Number of modules currently held.
    pub(crate) fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Capture the current Win32 last-error code and wrap it in a
    /// `BackendError`.
    ///
    /// Call immediately after a Win32 function that signals failure.
    /// `GetLastError` reads thread-local state that can be overwritten by any
    /// subsequent API call.
    pub(crate) fn last_error(&self, function: &'static str) -> BackendError {
        // SAFETY: GetLastError reads thread-local state set by the last Win32
        // call.  It is always safe to call and never fails.
        let code = unsafe { GetLastError() }.0;
        self.os_error(function, code)
    }

    /// Wrap an error returned by a windows-crate binding.
    pub(crate) fn windows_error(&self, function: &'static str, e: windows::core::Error) -> BackendError {
        self.os_error(function, win32_code(e.code().0))
    }

    /// Wrap an explicit error code.
    pub(crate) fn os_error(&self, function: &'static str, code: u32) -> BackendError {
        let message = strerror::describe(self.format_message_w, code, self.message_capacity);
        debug!(function, code, %message, "native call failed");
        BackendError::Os {
            function,
            code,
            message,
        }
    }
}

/// Recover the Win32 code from an `HRESULT_FROM_WIN32` value.
fn win32_code(hresult: i32) -> u32 {
    let bits = hresult as u32;
    if bits & 0xFFFF_0000 == 0x8007_0000 {
        bits & 0xFFFF
    } else {
        bits
    }
}

fn lookup(modules: &[LoadedModule], cap: Capability, config: &BackendConfig) -> Option<RawProc> {
    if config.is_disabled(cap) {
        debug!(capability = %cap, "disabled by configuration");
        return None;
    }
    let found = modules
        .iter()
        .find(|m| m.kind == cap.module())
        .and_then(|m| m.symbol(cap));
    if found.is_none() {
        debug!(capability = %cap, module = cap.module().file_name(), "entry point absent");
    }
    found
}

/// `entry`, or `Unsupported` naming `cap`.
pub(crate) fn require<T>(entry: Option<T>, cap: Capability) -> Result<T> {
    entry.ok_or(BackendError::Unsupported(cap.name()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(all(test, windows))]
mod tests {
    use super::*;

    #[test]
    fn kernel32_entries_resolve() {
        let table = CapabilityTable::resolve(&BackendConfig::default());
        assert!(table.module_count() >= 1);
        assert!(table.is_available(Capability::CreateFileW));
        assert!(table.is_available(Capability::GetModuleFileNameW));
        assert!(table.is_available(Capability::FindFirstFileW));
    }

    #[test]
    fn disabled_entry_is_absent_and_others_are_not() {
        let config = BackendConfig::default().with_disabled(Capability::GetUserProfileDirectoryW);
        let table = CapabilityTable::resolve(&config);
        assert!(!table.is_available(Capability::GetUserProfileDirectoryW));
        assert!(table.is_available(Capability::GetModuleFileNameW));
        assert!(table.is_available(Capability::CreateFileW));
    }

    #[test]
    fn repeated_resolution_holds_one_reference_per_module() {
        let config = BackendConfig::default();
        let first = CapabilityTable::resolve(&config);
        let second = CapabilityTable::resolve(&config);
        assert_eq!(first.module_count(), second.module_count());
        assert!(first.module_count() <= SystemModule::ALL.len());
        drop(first);
        assert!(second.is_available(Capability::CreateFileW));
    }

    #[test]
    fn hresult_codes_unwrap_to_win32() {
        assert_eq!(win32_code(0x8007_0002_u32 as i32), 2);
        assert_eq!(win32_code(0x8000_4005_u32 as i32), 0x8000_4005);
    }

    #[test]
    fn teardown_clears_everything() {
        let mut table = CapabilityTable::resolve(&BackendConfig::default());
        table.teardown();
        assert_eq!(table.module_count(), 0);
        assert!(Capability::ALL.iter().all(|&c| !table.is_available(c)));
    }

    #[test]
    fn require_names_missing_capability() {
        let table = CapabilityTable::default();
        let err = require(table.search_path_w, Capability::SearchPathW).unwrap_err();
        assert!(matches!(err, BackendError::Unsupported("SearchPathW")));
    }
}
