use thiserror::Error;

/// Structural problems in the four-line record format. Line numbers are 1-based and
/// count every physical line of the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("FASTQ format error at line {line}: identifier line must start with '@'")]
    MissingIdentifierMarker { line: u64 },

    #[error("FASTQ format error at line {line}: separator line must start with '+'")]
    MissingSeparatorMarker { line: u64 },

    #[error(
        "FASTQ format error at line {line}: quality length {qual_len} does not match sequence length {seq_len}"
    )]
    QualityLengthMismatch {
        line: u64,
        seq_len: usize,
        qual_len: usize,
    },

    #[error("FASTQ format error at line {line}: input ended inside a record")]
    TruncatedRecord { line: u64 },

    #[error(
        "FASTQ format error at line {line}: quality code {code:?} of read {read} decodes outside 0..=41 with offset {offset}"
    )]
    QualityOutOfRange {
        line: u64,
        read: String,
        code: char,
        offset: u8,
    },
}

/// Anything that aborts a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read input")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one quality threshold is required")]
    NoThresholds,

    #[error("quality threshold {0} is outside 0..=41")]
    ThresholdOutOfRange(u8),

    #[error("coverage threshold {0} is not one of the configured thresholds")]
    UnknownCoverageThreshold(u8),

    #[error("phred offset must be 33 or 64, got {0}")]
    UnsupportedPhredOffset(u8),

    #[error("strict threshold {strict} is below lenient threshold {lenient}")]
    StrictBelowLenient { strict: u8, lenient: u8 },
}
