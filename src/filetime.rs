//! Windows FILETIME timestamps, as embedded in NTLMv2 responses.


use chrono::Utc;


/// The Unix epoch (1970-01-01) in 100-nanosecond intervals since 1601-01-01.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

/// 100-nanosecond intervals per second.
const TICKS_PER_SECOND: i64 = 10_000_000;


/// A count of 100-nanosecond intervals since 1601-01-01 00:00 UTC, split into 32-bit halves.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FileTime {
    pub low: u32,
    pub high: u32,
}
impl FileTime {
    fn from_ticks(ticks: i64) -> Self {
        Self {
            low: (ticks & 0xFFFF_FFFF) as u32,
            high: ((ticks >> 32) & 0xFFFF_FFFF) as u32,
        }
    }

    /// Converts nanoseconds since the Unix epoch.
    ///
    /// Precision below 100 nanoseconds is truncated.
    pub fn from_unix_nanos(nsec: i64) -> Self {
        Self::from_ticks(nsec / 100 + UNIX_EPOCH_TICKS)
    }

    /// The current time.
    pub fn now() -> Self {
        let now = Utc::now();
        let ticks = now.timestamp() * TICKS_PER_SECOND
            + i64::from(now.timestamp_subsec_nanos() / 100)
            + UNIX_EPOCH_TICKS;
        Self::from_ticks(ticks)
    }

    /// The timestamp as a single 64-bit value.
    pub fn as_u64(&self) -> u64 {
        (u64::from(self.high) << 32) | u64::from(self.low)
    }

    /// Serializes the timestamp as it appears on the wire: low half, then high half, both
    /// little-endian.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut ret = [0u8; 8];
        ret[0..4].copy_from_slice(&self.low.to_le_bytes());
        ret[4..8].copy_from_slice(&self.high.to_le_bytes());
        ret
    }
}
