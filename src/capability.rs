// ── Optional OS entry points ──────────────────────────────────────────────────
//
// Names every Win32 function the backend looks up at runtime rather than
// linking against.  Absence of any of them is a valid state; the Win32
// capability table records which ones resolved.  No `unsafe`, no Win32
// imports.

/// A system DLL that optional entry points are looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemModule {
    Kernel32,
    UserEnv,
    AdvApi32,
}

impl SystemModule {
    pub const ALL: [SystemModule; 3] = [Self::Kernel32, Self::UserEnv, Self::AdvApi32];

    /// File name passed to `LoadLibraryW`.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Kernel32 => "kernel32.dll",
            Self::UserEnv => "userenv.dll",
            Self::AdvApi32 => "advapi32.dll",
        }
    }
}

/// One optional entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GetModuleFileNameW,
    FormatMessageW,
    FindFirstFileW,
    FindNextFileW,
    GetFileAttributesW,
    GetFileAttributesExW,
    GetCurrentDirectoryW,
    CreateDirectoryW,
    RemoveDirectoryW,
    CreateFileW,
    DeleteFileW,
    SearchPathW,
    SystemTimeToTzSpecificLocalTime,
    GetUserProfileDirectoryW,
    GetUserNameW,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Self::GetModuleFileNameW,
        Self::FormatMessageW,
        Self::FindFirstFileW,
        Self::FindNextFileW,
        Self::GetFileAttributesW,
        Self::GetFileAttributesExW,
        Self::GetCurrentDirectoryW,
        Self::CreateDirectoryW,
        Self::RemoveDirectoryW,
        Self::CreateFileW,
        Self::DeleteFileW,
        Self::SearchPathW,
        Self::SystemTimeToTzSpecificLocalTime,
        Self::GetUserProfileDirectoryW,
        Self::GetUserNameW,
    ];

    /// Exported symbol name.
    pub fn name(self) -> &'static str {
        match self {
            Self::GetModuleFileNameW => "GetModuleFileNameW",
            Self::FormatMessageW => "FormatMessageW",
            Self::FindFirstFileW => "FindFirstFileW",
            Self::FindNextFileW => "FindNextFileW",
            Self::GetFileAttributesW => "GetFileAttributesW",
            Self::GetFileAttributesExW => "GetFileAttributesExW",
            Self::GetCurrentDirectoryW => "GetCurrentDirectoryW",
            Self::CreateDirectoryW => "CreateDirectoryW",
            Self::RemoveDirectoryW => "RemoveDirectoryW",
            Self::CreateFileW => "CreateFileW",
            Self::DeleteFileW => "DeleteFileW",
            Self::SearchPathW => "SearchPathW",
            Self::SystemTimeToTzSpecificLocalTime => "SystemTimeToTzSpecificLocalTime",
            Self::GetUserProfileDirectoryW => "GetUserProfileDirectoryW",
            Self::GetUserNameW => "GetUserNameW",
        }
    }

    /// The DLL that exports this entry point.
    pub fn module(self) -> SystemModule {
        match self {
            Self::GetUserProfileDirectoryW => SystemModule::UserEnv,
            Self::GetUserNameW => SystemModule::AdvApi32,
            _ => SystemModule::Kernel32,
        }
    }

    /// Parse an exported symbol name (case-sensitive, as exported).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
