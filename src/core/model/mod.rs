use crate::core::error::ConfigError;
use serde::{Serialize, Serializer};
use std::fmt;

pub const DEFAULT_PHRED_OFFSET: u8 = 33;

/// Highest decodable quality score; scores live in `0..=MAX_Q`.
pub const MAX_Q: u8 = 41;
pub const QSCORE_SIZE: usize = MAX_Q as usize + 1;

/// Number of tiles a read's high-quality fraction is scaled to. 100%, 95% and 90%
/// land on the exact indices 200, 190 and 180.
pub const TILE_RESOLUTION: usize = 200;
pub const TILE_COUNT: usize = TILE_RESOLUTION + 1;

pub const GC_BUCKETS: usize = 101;

pub type QualHist = [u64; QSCORE_SIZE];
pub type TileHist = [u64; TILE_COUNT];
pub type GcHist = [u64; GC_BUCKETS];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Encoding {
    Sanger,
    Illumina15,
}

impl Encoding {
    pub fn from_offset(offset: u8) -> Self {
        if offset == 64 {
            Encoding::Illumina15
        } else {
            Encoding::Sanger
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Sanger => "Sanger / Illumina 1.9",
            Encoding::Illumina15 => "Illumina 1.5",
        }
    }
}

/// What to do with a quality code that decodes outside `0..=MAX_Q`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPolicy {
    #[default]
    Reject,
    Clamp,
}

/// Decodes one quality code. `None` means the code is outside `0..=MAX_Q` and the
/// policy is [`QualityPolicy::Reject`].
#[inline]
pub fn decode_qual(code: u8, offset: u8, policy: QualityPolicy) -> Option<u8> {
    match code.checked_sub(offset) {
        Some(q) if q <= MAX_Q => Some(q),
        Some(_) => match policy {
            QualityPolicy::Reject => None,
            QualityPolicy::Clamp => Some(MAX_Q),
        },
        None => match policy {
            QualityPolicy::Reject => None,
            QualityPolicy::Clamp => Some(0),
        },
    }
}

/// How a sequence symbol counts toward GC content.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GcClass {
    Strong,
    Weak,
    Ambiguous,
}

/// One byte of a sequence line.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Symbol(pub u8);

impl Symbol {
    pub const N: Symbol = Symbol(b'N');

    /// Only uppercase bases count; soft-masked `g`/`c`/`a`/`t` are ambiguous.
    pub fn gc_class(self) -> GcClass {
        match self.0 {
            b'G' | b'C' => GcClass::Strong,
            b'A' | b'T' => GcClass::Weak,
            _ => GcClass::Ambiguous,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "{}", self.0 as char)
        } else {
            write!(f, "\\x{:02x}", self.0)
        }
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Occurrence counts for every byte value seen in sequence lines.
#[derive(Clone, Debug)]
pub struct AlphabetHist {
    counts: [u64; 256],
}

impl Default for AlphabetHist {
    fn default() -> Self {
        Self { counts: [0u64; 256] }
    }
}

impl AlphabetHist {
    #[inline]
    pub fn add(&mut self, symbol: Symbol) {
        self.counts[symbol.0 as usize] += 1;
    }

    /// Symbols with a non-zero count, in byte order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(b, &c)| (Symbol(b as u8), c))
    }

    /// Count of uppercase G and C symbols.
    pub fn gc(&self) -> u64 {
        self.iter()
            .filter(|(s, _)| s.gc_class() == GcClass::Strong)
            .map(|(_, c)| c)
            .sum()
    }
}

/// Parameters of one scan. Build with [`ScanConfig::validate`] before handing it to
/// the aggregator.
#[derive(Clone, Debug, Serialize)]
pub struct ScanConfig {
    pub phred_offset: u8,
    /// High-quality thresholds in report order; one tile histogram each.
    pub thresholds: Vec<u8>,
    /// Threshold behind the high-quality read count and the 95%/90% points.
    pub strict_threshold: u8,
    /// Threshold behind the poor-quality read count.
    pub lenient_threshold: u8,
    pub quality_policy: QualityPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            phred_offset: DEFAULT_PHRED_OFFSET,
            thresholds: vec![15, 20],
            strict_threshold: 20,
            lenient_threshold: 15,
            quality_policy: QualityPolicy::Reject,
        }
    }
}

#[cfg(test)]
impl AlphabetHist {
    pub fn count(&self, symbol: Symbol) -> u64 {
        self.counts[symbol.0 as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

impl ScanConfig {
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.phred_offset != 33 && self.phred_offset != 64 {
            return Err(ConfigError::UnsupportedPhredOffset(self.phred_offset));
        }
        let mut seen = [false; QSCORE_SIZE];
        let mut thresholds = Vec::with_capacity(self.thresholds.len());
        for &t in &self.thresholds {
            if t > MAX_Q {
                return Err(ConfigError::ThresholdOutOfRange(t));
            }
            if !seen[t as usize] {
                seen[t as usize] = true;
                thresholds.push(t);
            }
        }
        if thresholds.is_empty() {
            return Err(ConfigError::NoThresholds);
        }
        for t in [self.strict_threshold, self.lenient_threshold] {
            if t > MAX_Q || !seen[t as usize] {
                return Err(ConfigError::UnknownCoverageThreshold(t));
            }
        }
        if self.strict_threshold < self.lenient_threshold {
            return Err(ConfigError::StrictBelowLenient {
                strict: self.strict_threshold,
                lenient: self.lenient_threshold,
            });
        }
        self.thresholds = thresholds;
        Ok(self)
    }

    pub fn threshold_index(&self, threshold: u8) -> Option<usize> {
        self.thresholds.iter().position(|&t| t == threshold)
    }
}

pub struct FinalizeContext {
    pub phred_offset: u8,
    pub encoding: Encoding,
    pub file_name: String,
    pub sample_name: String,
}

#[inline]
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
