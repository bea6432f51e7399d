// ── Raw Win32 declarations ────────────────────────────────────────────────────
//
// Signatures of the entry points resolved at runtime through
// `GetProcAddress`, plus the numeric constants passed to them.  The
// constants are declared locally because the resolved functions take plain
// `u32` flags rather than the windows-crate newtypes.

use std::ffi::c_void;

use windows::{
    core::{PCWSTR, PWSTR},
    Win32::{
        Foundation::{BOOL, HANDLE, HMODULE, SYSTEMTIME},
        Security::SECURITY_ATTRIBUTES,
        Storage::FileSystem::{WIN32_FILE_ATTRIBUTE_DATA, WIN32_FIND_DATAW},
        System::Time::TIME_ZONE_INFORMATION,
    },
};

// ── Entry-point signatures ────────────────────────────────────────────────────

/// The untyped shape `GetProcAddress` hands back.
pub(crate) type RawProc = unsafe extern "system" fn() -> isize;

pub(crate) type GetModuleFileNameWFn = unsafe extern "system" fn(HMODULE, PWSTR, u32) -> u32;
pub(crate) type FormatMessageWFn =
    unsafe extern "system" fn(u32, *const c_void, u32, u32, PWSTR, u32, *const c_void) -> u32;
pub(crate) type FindFirstFileWFn = unsafe extern "system" fn(PCWSTR, *mut WIN32_FIND_DATAW) -> HANDLE;
pub(crate) type FindNextFileWFn = unsafe extern "system" fn(HANDLE, *mut WIN32_FIND_DATAW) -> BOOL;
pub(crate) type GetFileAttributesWFn = unsafe extern "system" fn(PCWSTR) -> u32;
pub(crate) type GetFileAttributesExWFn =
    unsafe extern "system" fn(PCWSTR, u32, *mut WIN32_FILE_ATTRIBUTE_DATA) -> BOOL;
pub(crate) type GetCurrentDirectoryWFn = unsafe extern "system" fn(u32, PWSTR) -> u32;
pub(crate) type CreateDirectoryWFn =
    unsafe extern "system" fn(PCWSTR, *const SECURITY_ATTRIBUTES) -> BOOL;
pub(crate) type RemoveDirectoryWFn = unsafe extern "system" fn(PCWSTR) -> BOOL;
pub(crate) type CreateFileWFn = unsafe extern "system" fn(
    PCWSTR,
    u32,
    u32,
    *const SECURITY_ATTRIBUTES,
    u32,
    u32,
    HANDLE,
) -> HANDLE;
pub(crate) type DeleteFileWFn = unsafe extern "system" fn(PCWSTR) -> BOOL;
pub(crate) type SearchPathWFn =
    unsafe extern "system" fn(PCWSTR, PCWSTR, PCWSTR, u32, PWSTR, *mut PWSTR) -> u32;
pub(crate) type SystemTimeToTzSpecificLocalTimeFn = unsafe extern "system" fn(
    *const TIME_ZONE_INFORMATION,
    *const SYSTEMTIME,
    *mut SYSTEMTIME,
) -> BOOL;
pub(crate) type GetUserProfileDirectoryWFn = unsafe extern "system" fn(HANDLE, PWSTR, *mut u32) -> BOOL;
pub(crate) type GetUserNameWFn = unsafe extern "system" fn(PWSTR, *mut u32) -> BOOL;

// ── Constants ─────────────────────────────────────────────────────────────────

pub(crate) const GENERIC_READ: u32 = 0x8000_0000;
pub(crate) const GENERIC_WRITE: u32 = 0x4000_0000;
pub(crate) const FILE_SHARE_READ: u32 = 0x0000_0001;

pub(crate) const CREATE_ALWAYS: u32 = 2;
pub(crate) const OPEN_EXISTING: u32 = 3;
pub(crate) const OPEN_ALWAYS: u32 = 4;

pub(crate) const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x0000_0010;
pub(crate) const FILE_ATTRIBUTE_NORMAL: u32 = 0x0000_0080;
pub(crate) const INVALID_FILE_ATTRIBUTES: u32 = 0xFFFF_FFFF;

/// `SetFilePointer` / `GetFileSize` failure marker; only a failure when
/// `GetLastError` is non-zero.
pub(crate) const INVALID_SET_FILE_POINTER: u32 = 0xFFFF_FFFF;

/// `GET_FILEEX_INFO_LEVELS::GetFileExInfoStandard`.
pub(crate) const GET_FILE_EX_INFO_STANDARD: u32 = 0;

pub(crate) const FORMAT_MESSAGE_IGNORE_INSERTS: u32 = 0x0000_0200;
pub(crate) const FORMAT_MESSAGE_FROM_SYSTEM: u32 = 0x0000_1000;
/// `MAKELANGID(LANG_NEUTRAL, SUBLANG_DEFAULT)`.
pub(crate) const LANG_NEUTRAL_SUBLANG_DEFAULT: u32 = 0x0400;

pub(crate) const TIME_ZONE_ID_INVALID: u32 = 0xFFFF_FFFF;
