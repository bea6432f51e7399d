// ── Platform abstraction layer ────────────────────────────────────────────────
//
// This module defines the capability surface a portable dispatcher uses to
// talk to the OS.  No `unsafe` lives here; all Win32 FFI is confined to the
// `win32` sub-module and never leaks outward.  Every path crossing these
// traits is UTF-8, and every path they return uses `\` exclusively.

#[cfg(windows)]
pub mod win32;

use crate::error::Result;

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, read access only.
    Read,
    /// Create or truncate, write access.
    Write,
    /// Open or create, write access, positioned at end of file.
    Append,
}

impl OpenMode {
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Read)
    }
}

/// Backend entry points consumed by the portable layer.
///
/// Fallible operations also record their failure in the per-thread error
/// channel (`crate::error::last_error`).
pub trait Platform {
    type File: PlatformFile;
    type Mutex: PlatformMutex;

    /// Release every resolved entry point and cached value.
    fn deinit(&mut self);

    fn exists(&self, path: &str) -> bool;
    fn is_directory(&self, path: &str) -> bool;
    fn is_symlink(&self, path: &str) -> bool;

    /// Absolute, separator-normalized form of `path` with no `.`/`..`.
    fn real_path(&self, path: &str) -> Result<String>;

    /// Call `callback(origin, name)` for each entry of `dir` other than `.`
    /// and `..`.  Failures are reported only through the error channel.
    fn enumerate_files(&self, dir: &str, origin: &str, callback: &mut dyn FnMut(&str, &str));

    /// The current directory, always separator-terminated.
    fn current_dir(&self) -> Result<String>;

    /// Concatenate and convert `/` to the native separator.
    fn join(&self, prepend: Option<&str>, dir: &str, append: Option<&str>) -> String;

    fn mkdir(&self, path: &str) -> Result<()>;
    fn delete(&self, path: &str) -> Result<()>;
    fn open(&self, path: &str, mode: OpenMode) -> Result<Self::File>;

    /// Last modification time in Unix epoch seconds.
    fn last_modified(&self, path: &str) -> Result<i64>;

    /// `None` when `argv0` already carries a directory.
    fn base_dir(&self, argv0: Option<&str>) -> Result<Option<String>>;
    fn user_name(&self) -> Result<String>;
    fn user_dir(&self) -> Result<String>;

    fn thread_id(&self) -> u64;
    fn create_mutex(&self) -> Result<Self::Mutex>;

    /// Whether the backend supplies its own allocator.
    fn overrides_allocator(&self) -> bool {
        false
    }
}

/// One open file.
pub trait PlatformFile: Sized {
    /// Read up to `count` elements of `size` bytes into `buf`; returns whole
    /// elements read.
    fn read(&mut self, buf: &mut [u8], size: u32, count: u32) -> Result<u64>;
    /// Write `count` elements of `size` bytes from `buf`; returns whole
    /// elements written.
    fn write(&mut self, buf: &[u8], size: u32, count: u32) -> Result<u64>;
    /// Move to absolute byte offset `pos`.
    fn seek(&mut self, pos: u64) -> Result<()>;
    fn tell(&self) -> Result<u64>;
    fn length(&self) -> Result<u64>;
    fn eof(&self) -> Result<bool>;
    fn flush(&mut self) -> Result<()>;
    fn close(self) -> Result<()>;
}

/// A recursive, thread-owned lock.
pub trait PlatformMutex: Sized {
    /// Block until the calling thread owns the lock.
    fn acquire(&self) -> Result<()>;
    /// Give up one level of ownership held by the calling thread.
    fn release(&self);
    fn destroy(self);
}
