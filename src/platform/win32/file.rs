// ── File handles ──────────────────────────────────────────────────────────────
//
// Positions are full 64-bit values; `SetFilePointer` and `GetFileSize` take
// and return them as two 32-bit halves.  Both of those calls signal failure
// with 0xFFFF_FFFF in the low half, which is also a legal position, so the
// thread's error code is cleared first and consulted afterwards.

use std::{ptr, sync::Arc};

use tracing::trace;
use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{GetLastError, SetLastError, HANDLE, INVALID_HANDLE_VALUE, NO_ERROR},
        Storage::FileSystem::{
            FlushFileBuffers, GetFileSize, ReadFile, SetFilePointer, WriteFile, FILE_BEGIN,
            FILE_CURRENT, FILE_END, SET_FILE_POINTER_MOVE_METHOD,
        },
    },
};

use super::{
    capabilities::{require, CapabilityTable},
    handle::OwnedHandle,
    sys::{
        CREATE_ALWAYS, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, GENERIC_READ, GENERIC_WRITE,
        INVALID_SET_FILE_POINTER, OPEN_ALWAYS, OPEN_EXISTING,
    },
};
use crate::{
    capability::Capability,
    encoding::widen,
    error::{report, Result},
    platform::{OpenMode, PlatformFile},
    units::{elements_transferred, join_u64, request_bytes, split_u64},
};

/// One open file.  Not meant for concurrent use; the portable layer
/// serialises access to each handle.
pub struct Win32File {
    handle: OwnedHandle,
    read_only: bool,
    caps: Arc<CapabilityTable>,
}

impl Win32File {
    pub(crate) fn open(caps: &Arc<CapabilityTable>, path: &str, mode: OpenMode) -> Result<Self> {
        let create_file = require(caps.create_file_w, Capability::CreateFileW)?;
        let (access, disposition) = match mode {
            OpenMode::Read => (GENERIC_READ, OPEN_EXISTING),
            OpenMode::Write => (GENERIC_WRITE, CREATE_ALWAYS),
            OpenMode::Append => (GENERIC_WRITE, OPEN_ALWAYS),
        };

        let wide = widen(path)?;
        // SAFETY: wide is null-terminated and outlives the call; a null
        // security-attributes pointer and a null template handle are both
        // accepted.
        let raw = unsafe {
            create_file(
                PCWSTR(wide.as_ptr()),
                access,
                FILE_SHARE_READ,
                ptr::null(),
                disposition,
                FILE_ATTRIBUTE_NORMAL,
                HANDLE::default(),
            )
        };
        if raw == INVALID_HANDLE_VALUE {
            return Err(caps.last_error("CreateFileW"));
        }

        let file = Self {
            // SAFETY: raw is a fresh handle from CreateFileW owned by nobody
            // else.
            handle: unsafe { OwnedHandle::from_raw(raw) },
            read_only: mode.is_read_only(),
            caps: Arc::clone(caps),
        };

        // On failure `file` drops here and the handle is closed.
        if mode == OpenMode::Append {
            file.move_pointer(0, FILE_END)?;
        }

        trace!(path, ?mode, "file opened");
        Ok(file)
    }

    /// Move the file pointer and return its new absolute position.
    fn move_pointer(&self, distance: u64, method: SET_FILE_POINTER_MOVE_METHOD) -> Result<u64> {
        let (high, low) = split_u64(distance);
        let mut high = high as i32;

        // SAFETY: SetLastError only writes this thread's error slot.
        unsafe { SetLastError(NO_ERROR) };
        // SAFETY: the handle is open for the lifetime of `self`; `high` is a
        // live local the call may overwrite with the new high half.
        let low = unsafe {
            SetFilePointer(self.handle.raw(), low as i32, Some(&mut high as *mut i32), method)
        };
        if low == INVALID_SET_FILE_POINTER {
            // SAFETY: reads this thread's error slot, set by SetFilePointer.
            let code = unsafe { GetLastError() }.0;
            if code != NO_ERROR.0 {
                return Err(self.caps.os_error("SetFilePointer", code));
            }
        }
        Ok(join_u64(high as u32, low))
    }

    fn read_elements(&mut self, buf: &mut [u8], size: u32, count: u32) -> Result<u64> {
        let bytes = request_bytes(size, count, buf.len())? as usize;
        let mut read = 0u32;
        // SAFETY: the slice is valid for `bytes` writes; `read` is a live
        // local; synchronous I/O, so no OVERLAPPED.
        unsafe {
            ReadFile(
                self.handle.raw(),
                Some(&mut buf[..bytes]),
                Some(&mut read as *mut u32),
                None,
            )
        }
        .map_err(|e| self.caps.windows_error("ReadFile", e))?;
        Ok(elements_transferred(read, size))
    }

    fn write_elements(&mut self, buf: &[u8], size: u32, count: u32) -> Result<u64> {
        let bytes = request_bytes(size, count, buf.len())? as usize;
        let mut written = 0u32;
        // SAFETY: the slice is valid for `bytes` reads; `written` is a live
        // local; synchronous I/O, so no OVERLAPPED.
        unsafe {
            WriteFile(
                self.handle.raw(),
                Some(&buf[..bytes]),
                Some(&mut written as *mut u32),
                None,
            )
        }
        .map_err(|e| self.caps.windows_error("WriteFile", e))?;
        Ok(elements_transferred(written, size))
    }

    fn file_length(&self) -> Result<u64> {
        let mut high = 0u32;
        // SAFETY: SetLastError only writes this thread's error slot.
        unsafe { SetLastError(NO_ERROR) };
        // SAFETY: the handle is open; `high` is a live local.
        let low = unsafe { GetFileSize(self.handle.raw(), Some(&mut high as *mut u32)) };
        if low == INVALID_SET_FILE_POINTER {
            // SAFETY: reads this thread's error slot, set by GetFileSize.
            let code = unsafe { GetLastError() }.0;
            if code != NO_ERROR.0 {
                return Err(self.caps.os_error("GetFileSize", code));
            }
        }
        Ok(join_u64(high, low))
    }

    fn flush_buffers(&mut self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        // SAFETY: the handle is open for writing.
        unsafe { FlushFileBuffers(self.handle.raw()) }
            .map_err(|e| self.caps.windows_error("FlushFileBuffers", e))
    }
}

impl PlatformFile for Win32File {
    fn read(&mut self, buf: &mut [u8], size: u32, count: u32) -> Result<u64> {
        report(self.read_elements(buf, size, count))
    }

    fn write(&mut self, buf: &[u8], size: u32, count: u32) -> Result<u64> {
        report(self.write_elements(buf, size, count))
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        report(self.move_pointer(pos, FILE_BEGIN).map(drop))
    }

    fn tell(&self) -> Result<u64> {
        report(self.move_pointer(0, FILE_CURRENT))
    }

    fn length(&self) -> Result<u64> {
        report(self.file_length())
    }

    fn eof(&self) -> Result<bool> {
        let pos = self.tell()?;
        let len = self.length()?;
        Ok(pos == len)
    }

    fn flush(&mut self) -> Result<()> {
        report(self.flush_buffers())
    }

    fn close(self) -> Result<()> {
        let Self { handle, caps, .. } = self;
        report(handle.close().map_err(|e| caps.windows_error("CloseHandle", e)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(all(test, windows))]
mod tests {
    use super::*;
    use crate::{config::BackendConfig, error::BackendError};

    fn table() -> Arc<CapabilityTable> {
        Arc::new(CapabilityTable::resolve(&BackendConfig::default()))
    }

    fn temp_path(dir: &tempfile::TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn write_then_read_back() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "data.bin");

        let mut out = Win32File::open(&caps, &path, OpenMode::Write).expect("open write");
        assert_eq!(out.write(b"abcdefgh", 4, 2).expect("write"), 2);
        out.flush().expect("flush");
        out.close().expect("close");

        let mut input = Win32File::open(&caps, &path, OpenMode::Read).expect("open read");
        assert_eq!(input.length().expect("length"), 8);
        let mut buf = [0u8; 8];
        assert_eq!(input.read(&mut buf, 2, 4).expect("read"), 4);
        assert_eq!(&buf, b"abcdefgh");
        assert!(input.eof().expect("eof"));
        input.close().expect("close");
    }

    #[test]
    fn multi_byte_elements_count_the_same_both_ways() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "records.bin");
        let records = b"rgbRGBxyzXYZ";

        let mut out = Win32File::open(&caps, &path, OpenMode::Write).expect("open write");
        assert_eq!(out.write(records, 3, 4).expect("write"), 4);
        let words = 0x0102_0304_0506_0708u64.to_le_bytes().repeat(2);
        assert_eq!(out.write(&words, 8, 2).expect("write words"), 2);
        out.close().expect("close");

        let mut input = Win32File::open(&caps, &path, OpenMode::Read).expect("open read");
        let mut buf = [0u8; 12];
        assert_eq!(input.read(&mut buf, 3, 4).expect("read"), 4);
        assert_eq!(&buf, records);
        let mut wide = [0u8; 24];
        // Only two of the three requested words exist.
        assert_eq!(input.read(&mut wide, 8, 3).expect("read words"), 2);
        assert_eq!(&wide[..16], &words[..]);
        assert!(input.eof().expect("eof"));
    }

    #[test]
    fn partial_trailing_element_is_not_counted() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "odd.bin");
        std::fs::write(&path, b"12345").expect("seed");

        let mut file = Win32File::open(&caps, &path, OpenMode::Read).expect("open");
        let mut buf = [0u8; 8];
        assert_eq!(file.read(&mut buf, 2, 4).expect("read"), 2);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "small.bin");
        std::fs::write(&path, b"xy").expect("seed");

        let mut file = Win32File::open(&caps, &path, OpenMode::Read).expect("open");
        let mut buf = [0u8; 2];
        assert!(matches!(file.read(&mut buf, 4, 1), Err(BackendError::InvalidArgument)));
        assert!(matches!(file.read(&mut buf, 0, 1), Err(BackendError::InvalidArgument)));
    }

    #[test]
    fn empty_file_is_at_eof() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "empty.bin");

        let file = Win32File::open(&caps, &path, OpenMode::Write).expect("create");
        assert_eq!(file.tell().expect("tell"), 0);
        assert!(file.eof().expect("eof"));
    }

    #[test]
    fn append_starts_at_end_and_keeps_contents() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "log.txt");
        std::fs::write(&path, b"one").expect("seed");

        let mut file = Win32File::open(&caps, &path, OpenMode::Append).expect("append");
        assert_eq!(file.tell().expect("tell"), 3);
        file.write(b"two", 1, 3).expect("write");
        file.close().expect("close");
        assert_eq!(std::fs::read(&path).expect("read"), b"onetwo");
    }

    #[test]
    fn write_mode_truncates() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "trunc.txt");
        std::fs::write(&path, b"previous").expect("seed");

        let file = Win32File::open(&caps, &path, OpenMode::Write).expect("open");
        assert_eq!(file.length().expect("length"), 0);
    }

    #[test]
    fn opening_missing_file_for_read_fails_with_os_error() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Win32File::open(&caps, &temp_path(&dir, "absent"), OpenMode::Read)
            .err()
            .expect("must fail");
        assert!(matches!(err, BackendError::Os { function: "CreateFileW", .. }));
    }

    #[test]
    fn seek_and_tell_cross_the_32_bit_boundary() {
        let caps = table();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = temp_path(&dir, "sparse.bin");

        let mut file = Win32File::open(&caps, &path, OpenMode::Write).expect("open");
        for pos in [0x7FFF_FFFF_u64, 0x8000_0000, 0xFFFF_FFFE, 0xFFFF_FFFF, 0x1_0000_0000, 0x1_0000_0005] {
            file.seek(pos).expect("seek");
            assert_eq!(file.tell().expect("tell"), pos, "position {pos:#x}");
        }
    }

    #[test]
    fn opening_without_create_file_is_unsupported() {
        let config = BackendConfig::default().with_disabled(Capability::CreateFileW);
        let caps = Arc::new(CapabilityTable::resolve(&config));
        let err = Win32File::open(&caps, "C:\\anything", OpenMode::Read)
            .err()
            .expect("must fail");
        assert!(matches!(err, BackendError::Unsupported("CreateFileW")));
    }
}
