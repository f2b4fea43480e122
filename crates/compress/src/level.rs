//! Abstract compression levels shared by every backend.

use crate::error::{CompressError, CompressResult};

/// Highest raw level value accepted by [`CompressionLevel::from_raw`].
pub const MAX_RAW_LEVEL: i32 = 9;

/// Speed/size tradeoff requested for a compressor.
///
/// Backends map the four named levels onto their own numeric quality settings.
/// Raw values `4..=9` are accepted but carry no named meaning, so backends fall
/// back to their library default for them.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum CompressionLevel {
    /// Compress well even if it takes longer.
    #[default]
    Optimal,
    /// Finish as quickly as possible.
    Fastest,
    /// Store the data without compressing it.
    NoCompression,
    /// Produce the smallest possible output.
    SmallestSize,
    /// A raw level in `4..=9` with no named mapping.
    Other(RawLevel),
}

/// Raw level in `4..=9` carried by [`CompressionLevel::Other`].
///
/// Only [`CompressionLevel::from_raw`] builds one, so an unnamed level can
/// never hold a value that belongs to a named level.
///
/// ```compile_fail
/// use compress::{CompressionLevel, RawLevel};
///
/// let brotli_fastest_in_disguise = CompressionLevel::Other(RawLevel(2));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RawLevel(u8);

impl RawLevel {
    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl CompressionLevel {
    /// Validates a raw level received over the ABI.
    ///
    /// # Errors
    ///
    /// Returns [`CompressError::CompLevelNotSupported`] when `raw` falls outside
    /// `0..=9`.
    pub fn from_raw(raw: i32) -> CompressResult<Self> {
        match raw {
            0 => Ok(Self::Optimal),
            1 => Ok(Self::Fastest),
            2 => Ok(Self::NoCompression),
            3 => Ok(Self::SmallestSize),
            4..=MAX_RAW_LEVEL => Ok(Self::Other(RawLevel(raw as u8))),
            _ => Err(CompressError::CompLevelNotSupported),
        }
    }

    /// Returns the raw value used on the ABI.
    #[must_use]
    pub const fn raw(self) -> i32 {
        match self {
            Self::Optimal => 0,
            Self::Fastest => 1,
            Self::NoCompression => 2,
            Self::SmallestSize => 3,
            Self::Other(value) => value.0 as i32,
        }
    }
}

impl TryFrom<i32> for CompressionLevel {
    type Error = CompressError;

    fn try_from(raw: i32) -> CompressResult<Self> {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_levels_round_trip_through_raw_values() {
        for raw in 0..=3 {
            let level = CompressionLevel::from_raw(raw).expect("named level");
            assert_eq!(level.raw(), raw);
        }
    }

    #[test]
    fn unnamed_levels_are_preserved() {
        let level = CompressionLevel::from_raw(7).expect("valid level");
        assert!(matches!(level, CompressionLevel::Other(value) if value.get() == 7));
        assert_eq!(level.raw(), 7);
    }

    #[test]
    fn only_unnamed_raw_values_become_other() {
        for raw in 0..=MAX_RAW_LEVEL {
            let level = CompressionLevel::from_raw(raw).expect("valid level");
            assert_eq!(
                matches!(level, CompressionLevel::Other(_)),
                raw > 3,
                "raw level {raw}"
            );
        }
    }

    #[test]
    fn out_of_range_levels_are_rejected() {
        assert_eq!(
            CompressionLevel::from_raw(15),
            Err(CompressError::CompLevelNotSupported)
        );
        assert_eq!(
            CompressionLevel::try_from(-1),
            Err(CompressError::CompLevelNotSupported)
        );
        assert_eq!(
            CompressionLevel::from_raw(10),
            Err(CompressError::CompLevelNotSupported)
        );
    }
}
