use crate::core::error::{ConfigError, FormatError};
use crate::core::fastq::ReadView;
use crate::core::model::{
    AlphabetHist, FinalizeContext, GC_BUCKETS, GcClass, GcHist, QSCORE_SIZE, QualHist,
    QualityPolicy, ScanConfig, Symbol, TILE_COUNT, TileHist, decode_qual, percent,
};
use serde::Serialize;

mod alphabet;
mod basic;
mod coverage;
mod quality;

pub use alphabet::AlphabetTable;
pub use basic::BasicStats;
pub use coverage::{CoverageSummary, ThresholdCoverage, tile_index};
pub use quality::{MinQualityCumulative, QualityBands};

/// Running histograms for one scan. Fed one validated record at a time; never
/// retains a record.
#[derive(Clone, Debug)]
pub struct Agg {
    config: ScanConfig,
    pub total_reads: u64,
    pub total_bases: u64,
    pub min_len: usize,
    pub max_len: usize,
    pub empty_reads: u64,
    pub gc_undefined_reads: u64,
    pub alphabet: AlphabetHist,
    pub per_seq_gc_hist: GcHist,
    pub qual_hist: QualHist,
    pub min_qual_hist: QualHist,
    /// One histogram per entry of `config.thresholds`, same order.
    pub tile_hists: Vec<TileHist>,
}

impl Agg {
    /// Validates `config` first; every threshold indexes the quality histogram.
    pub fn new(config: ScanConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let tile_hists = vec![[0u64; TILE_COUNT]; config.thresholds.len()];
        Ok(Self {
            config,
            total_reads: 0,
            total_bases: 0,
            min_len: usize::MAX,
            max_len: 0,
            empty_reads: 0,
            gc_undefined_reads: 0,
            alphabet: AlphabetHist::default(),
            per_seq_gc_hist: [0u64; GC_BUCKETS],
            qual_hist: [0u64; QSCORE_SIZE],
            min_qual_hist: [0u64; QSCORE_SIZE],
            tile_hists,
        })
    }

    /// Folds one record into every histogram. Quality codes are decoded before any
    /// state changes, so a rejected record leaves the aggregate untouched.
    pub fn update_read(&mut self, read: &ReadView<'_>) -> Result<(), FormatError> {
        let len = read.len();
        debug_assert_eq!(len, read.qual.len());

        let read_qual = self.decode_read_qual(read)?;

        self.total_reads += 1;
        self.total_bases += len as u64;
        self.min_len = self.min_len.min(len);
        self.max_len = self.max_len.max(len);

        if read.is_empty() {
            self.empty_reads += 1;
            return Ok(());
        }

        let mut gc = 0u64;
        let mut at = 0u64;
        for &b in read.seq {
            let symbol = Symbol(b);
            self.alphabet.add(symbol);
            match symbol.gc_class() {
                GcClass::Strong => gc += 1,
                GcClass::Weak => at += 1,
                GcClass::Ambiguous => {}
            }
        }
        match gc_percent(gc, at) {
            Some(bucket) => self.per_seq_gc_hist[bucket] += 1,
            None => self.gc_undefined_reads += 1,
        }

        for (total, &count) in self.qual_hist.iter_mut().zip(read_qual.iter()) {
            *total += count;
        }
        let min_q = read_qual.iter().position(|&c| c > 0).unwrap_or(0);
        self.min_qual_hist[min_q] += 1;

        for (hist, &threshold) in self.tile_hists.iter_mut().zip(&self.config.thresholds) {
            let high_quality: u64 = read_qual[threshold as usize..].iter().sum();
            hist[tile_index(high_quality, len as u64)] += 1;
        }
        Ok(())
    }

    fn decode_read_qual(&self, read: &ReadView<'_>) -> Result<QualHist, FormatError> {
        let offset = self.config.phred_offset;
        let policy = self.config.quality_policy;
        let mut counts = [0u64; QSCORE_SIZE];
        for &code in read.qual {
            let q = decode_qual(code, offset, policy).ok_or_else(|| FormatError::QualityOutOfRange {
                line: read.qual_line(),
                read: String::from_utf8_lossy(read.id).into_owned(),
                code: code as char,
                offset,
            })?;
            counts[q as usize] += 1;
        }
        Ok(counts)
    }

    /// Derives the report snapshot. Pure: calling it again on the same aggregate
    /// yields the same snapshot.
    pub fn finalize(&self, ctx: &FinalizeContext) -> FinalMetrics {
        let (min_len, max_len) = if self.total_reads == 0 {
            (0, 0)
        } else {
            (self.min_len, self.max_len)
        };
        let avg_len = if self.total_reads == 0 {
            0.0
        } else {
            self.total_bases as f64 / self.total_reads as f64
        };

        let basic = BasicStats {
            encoding: ctx.encoding.as_str(),
            total_reads: self.total_reads,
            total_bases: self.total_bases,
            min_len,
            max_len,
            avg_len,
            gc_percent: percent(self.alphabet.gc(), self.total_bases),
            empty_reads: self.empty_reads,
            gc_undefined_reads: self.gc_undefined_reads,
        };

        let coverage: Vec<ThresholdCoverage> = self
            .config
            .thresholds
            .iter()
            .zip(&self.tile_hists)
            .map(|(&t, hist)| ThresholdCoverage::derive(t, hist, self.total_reads))
            .collect();
        let strict = self.config.threshold_index(self.config.strict_threshold);
        let lenient = self.config.threshold_index(self.config.lenient_threshold);
        let coverage_summary = match (strict, lenient) {
            (Some(s), Some(l)) => Some(CoverageSummary::derive(&coverage[s], &coverage[l])),
            _ => None,
        };

        FinalMetrics {
            input: InputInfo {
                file_name: ctx.file_name.clone(),
                sample_name: ctx.sample_name.clone(),
                phred_offset: ctx.phred_offset,
                quality_policy: self.config.quality_policy,
                thresholds: self.config.thresholds.clone(),
            },
            basic,
            alphabet: AlphabetTable::build(&self.alphabet, self.total_bases),
            per_seq_gc: self.per_seq_gc_hist.to_vec(),
            qual_hist: self.qual_hist.to_vec(),
            quality_bands: QualityBands::from_hist(&self.qual_hist, self.total_bases),
            min_qual_hist: self.min_qual_hist.to_vec(),
            min_quality: MinQualityCumulative::from_hist(&self.min_qual_hist, self.total_reads),
            coverage,
            coverage_summary,
        }
    }
}

/// `round(100 * gc / (gc + at))`, halves rounding up. `None` when the read has no
/// G/C/A/T base at all.
fn gc_percent(gc: u64, at: u64) -> Option<usize> {
    let denom = gc + at;
    if denom == 0 {
        return None;
    }
    Some(((gc * 100 + denom / 2) / denom) as usize)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputInfo {
    pub file_name: String,
    pub sample_name: String,
    pub phred_offset: u8,
    pub quality_policy: QualityPolicy,
    pub thresholds: Vec<u8>,
}

/// Read-only statistics snapshot handed to the report writers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinalMetrics {
    pub input: InputInfo,
    pub basic: BasicStats,
    pub alphabet: AlphabetTable,
    /// Reads per rounded GC%, buckets 0..=100.
    pub per_seq_gc: Vec<u64>,
    /// Bases per quality score, 0..=41.
    pub qual_hist: Vec<u64>,
    pub quality_bands: QualityBands,
    /// Reads per minimum base quality, 0..=41.
    pub min_qual_hist: Vec<u64>,
    pub min_quality: MinQualityCumulative,
    pub coverage: Vec<ThresholdCoverage>,
    /// Absent only when the aggregate was built from an unvalidated config.
    pub coverage_summary: Option<CoverageSummary>,
}
