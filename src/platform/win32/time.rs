// ── Modification times ────────────────────────────────────────────────────────

use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{FILETIME, HANDLE, INVALID_HANDLE_VALUE, SYSTEMTIME},
        Storage::FileSystem::{GetFileTime, WIN32_FILE_ATTRIBUTE_DATA},
        System::Time::{FileTimeToSystemTime, GetTimeZoneInformation, TIME_ZONE_INFORMATION},
    },
};

use super::{
    capabilities::{require, CapabilityTable},
    handle::OwnedHandle,
    sys::{
        FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, GENERIC_READ, GET_FILE_EX_INFO_STANDARD,
        OPEN_EXISTING, TIME_ZONE_ID_INVALID,
    },
};
use crate::{
    capability::Capability,
    encoding::widen,
    error::Result,
    time::{bias_between, effective_bias, shift_by_bias, CalendarTime, ZoneState},
    units::{join_u64, split_u64},
};

/// Last write time of `path`, in Unix epoch seconds.
pub(crate) fn last_modified(caps: &CapabilityTable, path: &str) -> Result<i64> {
    let written = match attribute_write_time(caps, path)? {
        Some(ft) => ft,
        None => handle_write_time(caps, path)?,
    };
    to_epoch(caps, &written)
}

/// The write time from the attribute query, or `None` when the query is
/// unavailable or reports a zero timestamp.
fn attribute_write_time(caps: &CapabilityTable, path: &str) -> Result<Option<FILETIME>> {
    let Some(get_attributes) = caps.get_file_attributes_ex_w else {
        return Ok(None);
    };
    let wide = widen(path)?;
    let mut data = WIN32_FILE_ATTRIBUTE_DATA::default();
    // SAFETY: wide is null-terminated and outlives the call; data is a live
    // WIN32_FILE_ATTRIBUTE_DATA, the structure GetFileExInfoStandard fills.
    if !unsafe { get_attributes(PCWSTR(wide.as_ptr()), GET_FILE_EX_INFO_STANDARD, &mut data) }
        .as_bool()
    {
        return Err(caps.last_error("GetFileAttributesExW"));
    }
    let ft = data.ftLastWriteTime;
    if ft.dwHighDateTime == 0 && ft.dwLowDateTime == 0 {
        Ok(None)
    } else {
        Ok(Some(ft))
    }
}

fn handle_write_time(caps: &CapabilityTable, path: &str) -> Result<FILETIME> {
    let create_file = require(caps.create_file_w, Capability::CreateFileW)?;
    let wide = widen(path)?;
    // SAFETY: wide is null-terminated and outlives the call; null security
    // attributes and template are accepted.
    let raw = unsafe {
        create_file(
            PCWSTR(wide.as_ptr()),
            GENERIC_READ,
            FILE_SHARE_READ,
            std::ptr::null(),
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            HANDLE::default(),
        )
    };
    if raw == INVALID_HANDLE_VALUE {
        return Err(caps.last_error("CreateFileW"));
    }
    // SAFETY: raw is a fresh handle owned by nobody else; it closes when
    // `file` drops, on every path out of this function.
    let file = unsafe { OwnedHandle::from_raw(raw) };

    let mut written = FILETIME::default();
    // SAFETY: the handle is open for reading; `written` is a live local and
    // the other two times are not requested.
    unsafe { GetFileTime(file.raw(), None, None, Some(&mut written as *mut FILETIME)) }
        .map_err(|e| caps.windows_error("GetFileTime", e))?;
    Ok(written)
}

fn to_system_time(caps: &CapabilityTable, ft: &FILETIME) -> Result<SYSTEMTIME> {
    let mut st = SYSTEMTIME::default();
    // SAFETY: both pointers reference live locals.
    unsafe { FileTimeToSystemTime(ft, &mut st) }
        .map_err(|e| caps.windows_error("FileTimeToSystemTime", e))?;
    Ok(st)
}

fn calendar(st: &SYSTEMTIME) -> CalendarTime {
    CalendarTime {
        year: st.wYear,
        month: st.wMonth,
        day: st.wDay,
        hour: st.wHour,
        minute: st.wMinute,
        second: st.wSecond,
    }
}

/// Express a UTC FILETIME as local calendar time, then as epoch seconds.
fn to_epoch(caps: &CapabilityTable, ft: &FILETIME) -> Result<i64> {
    let mut zone = TIME_ZONE_INFORMATION::default();
    // SAFETY: zone is a live, writable TIME_ZONE_INFORMATION.
    let id = unsafe { GetTimeZoneInformation(&mut zone) };
    if id == TIME_ZONE_ID_INVALID {
        return Err(caps.last_error("GetTimeZoneInformation"));
    }

    if let Some(to_local) = caps.system_time_to_tz_specific_local_time {
        let utc = to_system_time(caps, ft)?;
        let mut local = SYSTEMTIME::default();
        // SAFETY: all three pointers reference live locals.
        if !unsafe { to_local(&zone, &utc, &mut local) }.as_bool() {
            return Err(caps.last_error("SystemTimeToTzSpecificLocalTime"));
        }
        let (local, utc) = (calendar(&local), calendar(&utc));
        return local.to_epoch_seconds(bias_between(&local, &utc)?);
    }

    // Without the zone-aware conversion only the bias in force now is known.
    let state = ZoneState::from_zone_id(id).unwrap_or(ZoneState::Unknown);
    let bias = effective_bias(zone.Bias, zone.StandardBias, zone.DaylightBias, state);
    let ticks = shift_by_bias(join_u64(ft.dwHighDateTime, ft.dwLowDateTime), bias)?;
    let (high, low) = split_u64(ticks);
    let local = to_system_time(
        caps,
        &FILETIME {
            dwLowDateTime: low,
            dwHighDateTime: high,
        },
    )?;
    calendar(&local).to_epoch_seconds(bias)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(all(test, windows))]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_secs() as i64
    }

    fn fresh_file(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("stamp.txt");
        std::fs::write(&path, b"x").expect("write");
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn fresh_file_is_close_to_now() {
        let caps = CapabilityTable::resolve(&BackendConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        let stamp = last_modified(&caps, &fresh_file(&dir)).expect("mtime");
        assert!((stamp - now()).abs() < 120, "stamp {stamp} vs now {}", now());
    }

    #[test]
    fn both_lookup_paths_agree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = fresh_file(&dir);
        let full = CapabilityTable::resolve(&BackendConfig::default());
        let reduced = CapabilityTable::resolve(
            &BackendConfig::default().with_disabled(Capability::GetFileAttributesExW),
        );
        let a = last_modified(&full, &path).expect("attributes");
        let b = last_modified(&reduced, &path).expect("handle");
        assert_eq!(a, b);
    }

    #[test]
    fn both_conversion_paths_agree() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = fresh_file(&dir);
        let full = CapabilityTable::resolve(&BackendConfig::default());
        let manual = CapabilityTable::resolve(
            &BackendConfig::default().with_disabled(Capability::SystemTimeToTzSpecificLocalTime),
        );
        let a = last_modified(&full, &path).expect("tz-aware");
        let b = last_modified(&manual, &path).expect("manual");
        // The manual shift uses the bias in effect now rather than on the
        // file's date; for a fresh file the two coincide.
        assert_eq!(a, b);
    }

    #[test]
    fn half_year_old_file_reports_its_exact_instant() {
        let caps = CapabilityTable::resolve(&BackendConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("old.txt");
        std::fs::write(&path, b"x").expect("write");

        // Six months back usually sits across a daylight transition from today.
        let target = now() - 182 * 24 * 60 * 60;
        let stamp = UNIX_EPOCH + std::time::Duration::from_secs(target as u64);
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("reopen")
            .set_modified(stamp)
            .expect("set mtime");

        let seen = last_modified(&caps, &path.to_string_lossy()).expect("mtime");
        assert_eq!(seen, target);
    }

    #[test]
    fn missing_file_fails() {
        let caps = CapabilityTable::resolve(&BackendConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent").to_string_lossy().into_owned();
        assert!(last_modified(&caps, &missing).is_err());
    }
}
