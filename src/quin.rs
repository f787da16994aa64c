//! Conversions between the RISC OS "quin" timestamp, calendar time, and the
//! load/exec address pair that carries a quin inside a ZIP extra field.
//!
//! A quin is a 40-bit count of centiseconds since 1900-01-01 00:00:00 UTC.
//! When a load address's top 12 bits equal `0xFFF`, the pair is "typed": the
//! low byte of the load address and the whole exec address together hold a
//! quin, and the next 12 bits of the load address hold a filetype.
//! Otherwise the pair is an opaque pair of absolute addresses.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::result::DateTimeRangeError;

/// The filetype value the public API reports for a directory.
pub const DIRECTORY_FILETYPE: i32 = 0x1000;
/// The filetype actually stored in a directory's load address.
pub const DIRECTORY_FILETYPE_INTERNAL: u32 = 0xFFD;

const UNIX_TO_RISCOS_EPOCH_SECONDS: i64 = 2_208_988_800;

/// Seconds-since-1970 for a quin of zero, i.e. `-UNIX_TO_RISCOS_EPOCH_SECONDS`.
const fn quin_to_epoch_centiseconds(quin: u64) -> i64 {
    quin as i64 - UNIX_TO_RISCOS_EPOCH_SECONDS * 100
}

const fn epoch_centiseconds_to_quin(centiseconds: i64) -> u64 {
    (centiseconds + UNIX_TO_RISCOS_EPOCH_SECONDS * 100) as u64
}

/// Extract the quin from a typed load/exec pair, or `None` if it is untyped.
pub const fn loadexec_to_quin(loadaddr: u32, execaddr: u32) -> Option<u64> {
    if loadaddr & 0xFFF0_0000 == 0xFFF0_0000 {
        Some((((loadaddr & 0xFF) as u64) << 32) | execaddr as u64)
    } else {
        None
    }
}

/// Build a typed load/exec pair from a quin and a filetype.
///
/// `0x1000` (the external "directory" filetype) is translated to
/// [`DIRECTORY_FILETYPE_INTERNAL`] before being packed in, matching the
/// internal representation RISC OS itself uses for directory timestamps.
pub fn quin_to_loadexec(quin: u64, filetype: i32) -> (u32, u32) {
    let filetype = if filetype == DIRECTORY_FILETYPE {
        DIRECTORY_FILETYPE_INTERNAL
    } else {
        filetype as u32 & 0xFFF
    };
    let loadaddr = (((quin >> 32) & 0xFF) as u32) | 0xFFF0_0000 | (filetype << 8);
    let execaddr = (quin & 0xFFFF_FFFF) as u32;
    (loadaddr, execaddr)
}

/// A RISC OS calendar timestamp, accurate to centiseconds.
///
/// Unlike the zip-format `date_time`, seconds and centiseconds are carried as
/// separate integers rather than a single float, so there is no rounding
/// ambiguity when normalising back to a quin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiscosDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub centisecond: u8,
}

impl RiscosDateTime {
    /// Construct from components, clamping centiseconds and seconds into
    /// their valid ranges rather than accepting a sub-second float.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        centisecond: u8,
    ) -> Self {
        RiscosDateTime {
            year,
            month,
            day,
            hour,
            minute,
            second: second.min(59),
            centisecond: centisecond.min(99),
        }
    }

    /// Decode a quin into its calendar representation (UTC, no timezone applied).
    pub fn from_quin(quin: u64) -> Result<Self, DateTimeRangeError> {
        let total_cs = quin_to_epoch_centiseconds(quin);
        let seconds = total_cs.div_euclid(100);
        let centisecond = total_cs.rem_euclid(100) as u8;
        let naive = DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or(DateTimeRangeError)?
            .naive_utc();
        Ok(RiscosDateTime {
            year: naive.year().try_into().map_err(|_| DateTimeRangeError)?,
            month: naive.month() as u8,
            day: naive.day() as u8,
            hour: naive.hour() as u8,
            minute: naive.minute() as u8,
            second: naive.second() as u8,
            centisecond,
        })
    }

    /// Encode the calendar representation back into a quin.
    pub fn to_quin(self) -> Result<u64, DateTimeRangeError> {
        let date = NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())
            .ok_or(DateTimeRangeError)?;
        let time = NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
            .ok_or(DateTimeRangeError)?;
        let naive = NaiveDateTime::new(date, time);
        let seconds = naive.and_utc().timestamp();
        let total_cs = seconds * 100 + i64::from(self.centisecond);
        Ok(epoch_centiseconds_to_quin(total_cs))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loadexec_typed_roundtrip() {
        for filetype in [0x000, 0xFFF, 0x1C9, 0xA91] {
            let quin = 0x0000_00C7_5242_00u64;
            let (load, exec) = quin_to_loadexec(quin, filetype);
            assert_eq!(loadexec_to_quin(load, exec), Some(quin));
            let readback_filetype = (load >> 8) & 0xFFF;
            let expected = if filetype == DIRECTORY_FILETYPE {
                DIRECTORY_FILETYPE_INTERNAL
            } else {
                filetype as u32
            };
            assert_eq!(readback_filetype, expected);
        }
    }

    #[test]
    fn loadexec_untyped_is_opaque() {
        assert_eq!(loadexec_to_quin(0x1234_5678, 0x8765_4321), None);
    }

    #[test]
    fn default_archive_creation_date() {
        // 1980-01-01 00:00:00 is the DOS epoch; a freshly created archive
        // member with no explicit timestamp synthesises
        // loadaddr=0xFFFFFD3A, execaddr=0xC7524200 from it.
        let dt = RiscosDateTime::new(1980, 1, 1, 0, 0, 0, 0);
        let quin = dt.to_quin().unwrap();
        let (load, exec) = quin_to_loadexec(quin, 0xFFD);
        assert_eq!(load, 0xFFFF_FD3A);
        assert_eq!(exec, 0xC752_4200);
    }

    #[test]
    fn quin_roundtrips_through_calendar() {
        let dt = RiscosDateTime::new(2018, 11, 17, 10, 38, 30, 0);
        let quin = dt.to_quin().unwrap();
        let back = RiscosDateTime::from_quin(quin).unwrap();
        assert_eq!(dt, back);
    }
}
