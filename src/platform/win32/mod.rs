// ── Win32 platform implementation ─────────────────────────────────────────────
//
// This is the only module in the codebase where `unsafe` code is permitted.
// Every `unsafe` block MUST carry a `// SAFETY:` comment that states:
//   • which invariant makes the operation sound, and
//   • what the caller is responsible for maintaining.
//
// Nothing in this module is `pub` beyond what callers genuinely need; keep the
// unsafe surface as small as possible.

#![allow(unsafe_code)]

// ── Sub-modules ───────────────────────────────────────────────────────────────

pub(crate) mod capabilities; // runtime-resolved entry points
mod dir; // FindFirstFileW / FindNextFileW enumeration
mod file; // CreateFileW handles, 64-bit positioning
mod handle; // CloseHandle RAII
mod mutex; // recursive kernel mutex
mod strerror; // FormatMessageW
mod sys; // fn-pointer types and constants
mod time; // FILETIME → epoch seconds
mod user; // exe / profile / cwd / user name / search path

pub use file::Win32File;
pub use mutex::Win32Mutex;

use std::sync::Arc;

use tracing::{debug, info};
use windows::{core::PCWSTR, Win32::System::Threading::GetCurrentThreadId};

use self::{
    capabilities::{require, CapabilityTable},
    sys::{FILE_ATTRIBUTE_DIRECTORY, INVALID_FILE_ATTRIBUTES},
};
use crate::{
    cache::HomeDirCache,
    capability::Capability,
    config::BackendConfig,
    encoding::widen,
    error::{report, set_last_error, Result},
    path,
    platform::{OpenMode, Platform},
};

// ── Win32Backend ──────────────────────────────────────────────────────────────

/// The Windows backend: resolved entry points, configuration and the
/// memoised home directory, with one init/deinit lifetime.
pub struct Win32Backend {
    config: BackendConfig,
    caps: Arc<CapabilityTable>,
    home: HomeDirCache,
}

impl Win32Backend {
    /// Validate `config` and resolve every optional entry point.
    pub fn init(config: BackendConfig) -> Result<Self> {
        report(config.validate())?;
        let caps = CapabilityTable::resolve(&config);
        info!(
            modules = caps.module_count(),
            available = Capability::ALL.iter().filter(|&&c| caps.is_available(c)).count(),
            "win32 backend initialised"
        );
        Ok(Self {
            config,
            caps: Arc::new(caps),
            home: HomeDirCache::new(),
        })
    }

    /// `init` with the configuration named by `WINVFS_CONFIG`, or defaults.
    pub fn from_env() -> Result<Self> {
        Self::init(report(BackendConfig::from_env())?)
    }

    /// Tear down, then resolve again under `config`.
    pub fn reinit(&mut self, config: BackendConfig) -> Result<()> {
        report(config.validate())?;
        self.deinit();
        self.caps = Arc::new(CapabilityTable::resolve(&config));
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Whether the OS exported `cap` and configuration left it enabled.
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.caps.is_available(cap)
    }

    /// Full path of `file` along the system search path.
    pub fn search_path(&self, file: &str) -> Result<String> {
        report(user::search_path(&self.caps, &self.config, file))
    }

    /// Attribute bits of `path`.
    fn attributes(&self, path: &str) -> Result<u32> {
        let get_attributes = require(self.caps.get_file_attributes_w, Capability::GetFileAttributesW)?;
        let wide = widen(path)?;
        // SAFETY: wide is null-terminated and outlives the call.
        let attrs = unsafe { get_attributes(PCWSTR(wide.as_ptr())) };
        if attrs == INVALID_FILE_ATTRIBUTES {
            return Err(self.caps.last_error("GetFileAttributesW"));
        }
        Ok(attrs)
    }

    fn create_directory(&self, path: &str) -> Result<()> {
        let create = require(self.caps.create_directory_w, Capability::CreateDirectoryW)?;
        let wide = widen(path)?;
        // SAFETY: wide is null-terminated and outlives the call; null
        // security attributes mean the defaults.
        if !unsafe { create(PCWSTR(wide.as_ptr()), std::ptr::null()) }.as_bool() {
            return Err(self.caps.last_error("CreateDirectoryW"));
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        let is_dir = self.attributes(path)? & FILE_ATTRIBUTE_DIRECTORY != 0;
        let wide = widen(path)?;
        if is_dir {
            let remove_dir = require(self.caps.remove_directory_w, Capability::RemoveDirectoryW)?;
            // SAFETY: wide is null-terminated and outlives the call.
            if !unsafe { remove_dir(PCWSTR(wide.as_ptr())) }.as_bool() {
                return Err(self.caps.last_error("RemoveDirectoryW"));
            }
        } else {
            let delete_file = require(self.caps.delete_file_w, Capability::DeleteFileW)?;
            // SAFETY: wide is null-terminated and outlives the call.
            if !unsafe { delete_file(PCWSTR(wide.as_ptr())) }.as_bool() {
                return Err(self.caps.last_error("DeleteFileW"));
            }
        }
        Ok(())
    }
}

impl Platform for Win32Backend {
    type File = Win32File;
    type Mutex = Win32Mutex;

    fn deinit(&mut self) {
        match Arc::get_mut(&mut self.caps) {
            Some(caps) => caps.teardown(),
            // Files still open keep their own reference; they release the
            // old table when they close.
            None => self.caps = Arc::new(CapabilityTable::default()),
        }
        debug!(home_cached = self.home.is_populated(), "win32 backend torn down");
        self.home.clear();
    }

    fn exists(&self, path: &str) -> bool {
        self.attributes(path).inspect_err(set_last_error).is_ok()
    }

    fn is_directory(&self, path: &str) -> bool {
        self.attributes(path)
            .inspect_err(set_last_error)
            .is_ok_and(|attrs| attrs & FILE_ATTRIBUTE_DIRECTORY != 0)
    }

    fn is_symlink(&self, _path: &str) -> bool {
        false
    }

    fn real_path(&self, path: &str) -> Result<String> {
        report(path::canonicalize(path, || {
            user::current_directory(&self.caps, &self.config)
        }))
    }

    fn enumerate_files(&self, dir: &str, origin: &str, callback: &mut dyn FnMut(&str, &str)) {
        dir::enumerate(&self.caps, dir, origin, callback);
    }

    fn current_dir(&self) -> Result<String> {
        report(user::current_directory(&self.caps, &self.config))
    }

    fn join(&self, prepend: Option<&str>, dir: &str, append: Option<&str>) -> String {
        path::join(prepend, dir, append)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        report(self.create_directory(path))
    }

    fn delete(&self, path: &str) -> Result<()> {
        report(self.remove(path))
    }

    fn open(&self, path: &str, mode: OpenMode) -> Result<Win32File> {
        report(Win32File::open(&self.caps, path, mode))
    }

    fn last_modified(&self, path: &str) -> Result<i64> {
        report(time::last_modified(&self.caps, path))
    }

    fn base_dir(&self, argv0: Option<&str>) -> Result<Option<String>> {
        if argv0.is_some_and(|a| a.contains(['\\', '/'])) {
            return Ok(None);
        }
        report(user::executable_directory(&self.caps, &self.config)).map(Some)
    }

    fn user_name(&self) -> Result<String> {
        report(user::user_name(&self.caps))
    }

    fn user_dir(&self) -> Result<String> {
        report(
            self.home
                .get_or_compute(|| user::home_directory(&self.caps, &self.config)),
        )
    }

    fn thread_id(&self) -> u64 {
        // SAFETY: GetCurrentThreadId has no preconditions.
        u64::from(unsafe { GetCurrentThreadId() })
    }

    fn create_mutex(&self) -> Result<Win32Mutex> {
        report(Win32Mutex::create())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(all(test, windows))]
mod tests {
    use super::*;
    use crate::{
        error::{clear_last_error, last_error, BackendError},
        platform::{PlatformFile, PlatformMutex},
    };

    fn backend() -> Win32Backend {
        Win32Backend::init(BackendConfig::default()).expect("init")
    }

    fn native(p: &std::path::Path) -> String {
        p.to_string_lossy().into_owned()
    }

    #[test]
    fn existence_and_kind() {
        let b = backend();
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"x").expect("write");

        assert!(b.exists(&native(&file)));
        assert!(!b.is_directory(&native(&file)));
        assert!(b.is_directory(&native(dir.path())));
        assert!(!b.is_symlink(&native(&file)));

        clear_last_error();
        assert!(!b.exists(&native(&dir.path().join("absent"))));
        assert!(last_error().is_some());
    }

    #[test]
    fn mkdir_then_delete_dispatches_on_kind() {
        let b = backend();
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = native(&dir.path().join("sub"));
        let file = dir.path().join("sub").join("f.bin");

        b.mkdir(&sub).expect("mkdir");
        assert!(b.is_directory(&sub));
        std::fs::write(&file, b"x").expect("write");

        // Not empty yet.
        assert!(b.delete(&sub).is_err());
        b.delete(&native(&file)).expect("delete file");
        b.delete(&sub).expect("delete dir");
        assert!(!b.exists(&sub));
    }

    #[test]
    fn open_failure_reaches_the_channel() {
        let b = backend();
        let dir = tempfile::tempdir().expect("tempdir");
        clear_last_error();
        assert!(b.open(&native(&dir.path().join("absent")), OpenMode::Read).is_err());
        assert!(last_error().expect("recorded").starts_with("CreateFileW failed"));
    }

    #[test]
    fn embedded_nul_never_reaches_the_file_system() {
        let b = backend();
        let dir = tempfile::tempdir().expect("tempdir");
        let kept = dir.path().join("x");
        std::fs::write(&kept, b"keep").expect("write");
        let truncated_to_kept = format!("{}\0.bak", native(&kept));

        clear_last_error();
        assert!(matches!(b.delete(&truncated_to_kept), Err(BackendError::InvalidArgument)));
        assert!(last_error().is_some());
        assert!(kept.exists());
        assert!(!b.exists(&truncated_to_kept));
        assert!(matches!(
            b.open(&truncated_to_kept, OpenMode::Write),
            Err(BackendError::InvalidArgument)
        ));
        assert_eq!(std::fs::read(&kept).expect("read"), b"keep");
    }

    #[test]
    fn real_path_is_absolute_and_clean() {
        let b = backend();
        let cwd = b.current_dir().expect("cwd");
        assert!(cwd.ends_with('\\'));
        let resolved = b.real_path("a/./b/../c").expect("real path");
        assert_eq!(resolved, format!("{cwd}a\\c"));
    }

    #[test]
    fn base_dir_defers_to_argv0_with_a_directory() {
        let b = backend();
        assert_eq!(b.base_dir(Some("C:\\games\\app.exe")).expect("base"), None);
        let dir = b.base_dir(Some("app.exe")).expect("base").expect("some");
        assert!(dir.ends_with('\\'));
        assert_eq!(b.base_dir(None).expect("base"), Some(dir));
    }

    #[test]
    fn user_dir_is_memoised_and_copied() {
        let b = backend();
        let mut first = b.user_dir().expect("first");
        let second = b.user_dir().expect("second");
        assert_eq!(first, second);
        first.push_str("mutated");
        assert_eq!(b.user_dir().expect("third"), second);
    }

    #[test]
    fn profile_absence_degrades_only_the_home_directory() {
        let config = BackendConfig::default().with_disabled(Capability::GetUserProfileDirectoryW);
        let b = Win32Backend::init(config).expect("init");
        assert!(!b.has_capability(Capability::GetUserProfileDirectoryW));
        assert!(b.has_capability(Capability::CreateFileW));
        let home = b.user_dir().expect("home");
        assert_eq!(Some(home), b.base_dir(None).expect("base"));
    }

    #[test]
    fn deinit_clears_everything_and_reinit_restores() {
        let mut b = backend();
        b.user_dir().expect("home");
        assert!(b.home.is_populated());
        b.deinit();
        assert!(!b.home.is_populated());
        assert!(Capability::ALL.iter().all(|&c| !b.has_capability(c)));
        assert!(matches!(
            b.current_dir(),
            Err(BackendError::Unsupported("GetCurrentDirectoryW"))
        ));

        b.reinit(BackendConfig::default()).expect("reinit");
        assert!(b.has_capability(Capability::CreateFileW));
        assert!(b.current_dir().is_ok());
    }

    #[test]
    fn open_file_outlives_deinit() {
        let mut b = backend();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = native(&dir.path().join("kept.txt"));
        let mut f = b.open(&path, OpenMode::Write).expect("open");
        b.deinit();
        assert_eq!(f.write(b"ok", 1, 2).expect("write"), 2);
        f.close().expect("close");
    }

    #[test]
    fn enumerate_through_the_backend() {
        let b = backend();
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a"), b"").expect("a");
        std::fs::write(dir.path().join("b"), b"").expect("b");
        let mut names = Vec::new();
        b.enumerate_files(&native(dir.path()), "origin", &mut |_, n| names.push(n.to_owned()));
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn last_modified_of_a_fresh_file_is_recent() {
        let b = backend();
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("t");
        std::fs::write(&file, b"x").expect("write");
        let stamp = b.last_modified(&native(&file)).expect("mtime");
        assert!(stamp > 1_600_000_000);
    }

    #[test]
    fn thread_ids_differ_between_threads() {
        let b = backend();
        let here = b.thread_id();
        let there = std::thread::spawn(|| {
            // SAFETY: GetCurrentThreadId has no preconditions.
            u64::from(unsafe { GetCurrentThreadId() })
        })
        .join()
        .expect("join");
        assert_ne!(here, there);
    }

    #[test]
    fn mutex_through_the_backend() {
        let b = backend();
        let m = b.create_mutex().expect("mutex");
        m.acquire().expect("acquire");
        m.acquire().expect("reenter");
        m.release();
        m.release();
        m.destroy();
        assert!(!b.overrides_allocator());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BackendConfig {
            version: 7,
            ..BackendConfig::default()
        };
        assert!(Win32Backend::init(config).is_err());
    }
}
