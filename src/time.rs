// ── Timestamp arithmetic ──────────────────────────────────────────────────────
//
// Win32 reports modification times as FILETIME: 100-nanosecond ticks since
// 1601-01-01 UTC.  The Win32 layer turns that into a local calendar time (via
// `SystemTimeToTzSpecificLocalTime` when available, otherwise by shifting the
// raw ticks by the zone bias computed here); `CalendarTime::to_epoch_seconds`
// then maps the local calendar time onto Unix epoch seconds, using the bias
// the conversion actually applied (`bias_between`) when it is known.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{BackendError, Result};

/// FILETIME ticks in one minute.
pub const TICKS_PER_MINUTE: i64 = 600_000_000;

/// Which half of the zone's rules is in effect, as reported by
/// `GetTimeZoneInformation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    /// The zone has no daylight-saving rules.
    Unknown,
    Standard,
    Daylight,
}

impl ZoneState {
    /// Map the `TIME_ZONE_ID_*` return value; `None` for
    /// `TIME_ZONE_ID_INVALID` or anything unrecognised.
    pub fn from_zone_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Unknown),
            1 => Some(Self::Standard),
            2 => Some(Self::Daylight),
            _ => None,
        }
    }
}

/// Minutes to add to local time to obtain UTC, including the standard or
/// daylight adjustment currently in effect.
pub fn effective_bias(bias: i32, standard_bias: i32, daylight_bias: i32, state: ZoneState) -> i32 {
    match state {
        ZoneState::Standard => bias + standard_bias,
        ZoneState::Daylight => bias + daylight_bias,
        ZoneState::Unknown => bias,
    }
}

/// Shift raw FILETIME ticks from UTC to local time.
pub fn shift_by_bias(ticks: u64, bias_minutes: i32) -> Result<u64> {
    let offset = i64::from(bias_minutes) * TICKS_PER_MINUTE;
    let shifted = i128::from(ticks) - i128::from(offset);
    u64::try_from(shifted).map_err(|_| BackendError::InvalidTime)
}

/// A broken-down calendar time, as carried by `SYSTEMTIME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub year: u16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

impl CalendarTime {
    fn naive(&self) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .and_then(|d| {
            d.and_hms_opt(
                u32::from(self.hour),
                u32::from(self.minute),
                u32::from(self.second),
            )
        })
        .ok_or(BackendError::InvalidTime)
    }

    /// Interpret `self` as local time in a zone `bias_minutes` behind UTC and
    /// return Unix epoch seconds.
    pub fn to_epoch_seconds(&self, bias_minutes: i32) -> Result<i64> {
        Ok(self.naive()?.and_utc().timestamp() + i64::from(bias_minutes) * 60)
    }
}

/// Minutes between `local` and the `utc` instant it was converted from.
///
/// This is the bias in force on that date, which differs from the zone's
/// current bias whenever the date falls on the other side of a daylight
/// transition.
pub fn bias_between(local: &CalendarTime, utc: &CalendarTime) -> Result<i32> {
    let seconds = (utc.naive()? - local.naive()?).num_seconds();
    i32::try_from(seconds / 60).map_err(|_| BackendError::InvalidTime)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
