//! Compressor type flags and the set of algorithms compiled into this build.

use core::fmt;
use core::ops::BitOr;
use core::str::FromStr;

/// Compression algorithms a state can host.
///
/// The discriminants are bit flags so several algorithms can be combined into
/// a [`CompressorSet`], although an allocated compressor always holds exactly
/// one of them.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum CompressorType {
    /// No compressor attached.
    #[default]
    None = 0x00,
    /// Deflate wrapped in gzip framing.
    Gzip = 0x01,
    /// Raw deflate without framing.
    Deflate = 0x02,
    /// Brotli.
    Brotli = 0x04,
    /// Zstandard.
    Zstd = 0x08,
}

impl CompressorType {
    /// Every concrete algorithm, in flag order.
    pub const ALL: [CompressorType; 4] = [
        CompressorType::Gzip,
        CompressorType::Deflate,
        CompressorType::Brotli,
        CompressorType::Zstd,
    ];

    /// Returns the flag value used on the C ABI.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Resolves a single flag value. Combined or unknown flags yield `None`.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Gzip),
            0x02 => Some(Self::Deflate),
            0x04 => Some(Self::Brotli),
            0x08 => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Returns the canonical display name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Brotli => "brotli",
            Self::Zstd => "zstd",
        }
    }

    /// Reports whether the backend for this algorithm is compiled in.
    #[must_use]
    pub fn is_supported(self) -> bool {
        self != Self::None && CompressorSet::supported().contains(self)
    }
}

impl fmt::Display for CompressorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bitmask of [`CompressorType`] flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct CompressorSet(u32);

impl CompressorSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Returns the algorithms whose backends were compiled into this build.
    #[must_use]
    pub const fn supported() -> Self {
        let mut bits = 0;
        if cfg!(any(feature = "zlib-rs", feature = "zlib-ng")) {
            bits |= CompressorType::Gzip.bits() | CompressorType::Deflate.bits();
        }
        if cfg!(feature = "zstd") {
            bits |= CompressorType::Zstd.bits();
        }
        if cfg!(feature = "brotli") {
            bits |= CompressorType::Brotli.bits();
        }
        Self(bits)
    }

    /// Returns the raw mask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reports whether `kind` is a member of the set.
    #[must_use]
    pub const fn contains(self, kind: CompressorType) -> bool {
        let bits = kind.bits();
        bits != 0 && self.0 & bits == bits
    }

    /// Iterates over the members of the set in flag order.
    pub fn iter(self) -> impl Iterator<Item = CompressorType> {
        CompressorType::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl BitOr<CompressorType> for CompressorSet {
    type Output = Self;

    fn bitor(self, rhs: CompressorType) -> Self {
        Self(self.0 | rhs.bits())
    }
}

impl From<CompressorType> for CompressorSet {
    fn from(kind: CompressorType) -> Self {
        Self(kind.bits())
    }
}

/// Error returned when attempting to parse an unsupported algorithm name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompressorTypeParseError {
    input: String,
}

impl CompressorTypeParseError {
    /// Creates a parse error capturing the original input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for CompressorTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported compressor type: {}", self.input)
    }
}

impl std::error::Error for CompressorTypeParseError {}

impl FromStr for CompressorType {
    type Err = CompressorTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "deflate" => Ok(Self::Deflate),
            "br" | "brotli" => Ok(Self::Brotli),
            "zstd" => Ok(Self::Zstd),
            other => Err(CompressorTypeParseError::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values_match_the_abi() {
        assert_eq!(CompressorType::None.bits(), 0);
        assert_eq!(CompressorType::Gzip.bits(), 1);
        assert_eq!(CompressorType::Deflate.bits(), 2);
        assert_eq!(CompressorType::Brotli.bits(), 4);
        assert_eq!(CompressorType::Zstd.bits(), 8);
    }

    #[test]
    fn combined_flags_do_not_resolve_to_a_single_type() {
        assert_eq!(CompressorType::from_bits(0x03), None);
        assert_eq!(CompressorType::from_bits(0x10), None);
        assert_eq!(CompressorType::from_bits(0x04), Some(CompressorType::Brotli));
    }

    #[test]
    fn none_is_never_supported() {
        assert!(!CompressorType::None.is_supported());
        assert!(!CompressorSet::supported().contains(CompressorType::None));
    }

    #[cfg(any(feature = "zlib-rs", feature = "zlib-ng"))]
    #[test]
    fn zlib_backend_provides_gzip_and_deflate() {
        let supported = CompressorSet::supported();
        assert!(supported.contains(CompressorType::Gzip));
        assert!(supported.contains(CompressorType::Deflate));
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_is_reported_when_feature_enabled() {
        assert!(CompressorType::Zstd.is_supported());
    }

    #[cfg(not(feature = "brotli"))]
    #[test]
    fn brotli_is_absent_when_feature_disabled() {
        assert!(!CompressorType::Brotli.is_supported());
    }

    #[test]
    fn set_iteration_follows_flag_order() {
        let set = CompressorSet::EMPTY | CompressorType::Zstd | CompressorType::Gzip;
        let members: Vec<_> = set.iter().collect();
        assert_eq!(members, vec![CompressorType::Gzip, CompressorType::Zstd]);
        assert_eq!(set.bits(), 0x09);
    }

    #[test]
    fn parsing_accepts_known_algorithms() {
        assert_eq!("gzip".parse::<CompressorType>(), Ok(CompressorType::Gzip));
        assert_eq!(" BR ".parse::<CompressorType>(), Ok(CompressorType::Brotli));
        assert_eq!("Zstd".parse::<CompressorType>(), Ok(CompressorType::Zstd));
    }

    #[test]
    fn parsing_rejects_unknown_algorithms() {
        let err = "lz4"
            .parse::<CompressorType>()
            .expect_err("lz4 unsupported");
        assert_eq!(err.input(), "lz4");
        assert!(err.to_string().contains("lz4"));
    }
}
