use crate::core::model::{TILE_COUNT, TILE_RESOLUTION, TileHist};
use serde::Serialize;

const TILE_100: usize = TILE_RESOLUTION;
const TILE_95: usize = TILE_RESOLUTION * 95 / 100;
const TILE_90: usize = TILE_RESOLUTION * 90 / 100;

/// Tile a read falls into: `floor(TILE_RESOLUTION * high_quality / len)`.
///
/// Flooring biases every read downward, so a read reaches tile 200 only when all
/// of its bases pass the threshold. `len` must be non-zero.
#[inline]
pub fn tile_index(high_quality: u64, len: u64) -> usize {
    debug_assert!(len > 0 && high_quality <= len);
    (TILE_RESOLUTION as u64 * high_quality / len) as usize
}

/// Cumulative-from-the-top view of one threshold's tile histogram.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdCoverage {
    pub threshold: u8,
    pub total_reads: u64,
    pub tiles: Vec<u64>,
    /// `cumulative[i]`: reads whose high-quality fraction is at least tile `i`.
    pub cumulative: Vec<u64>,
    /// `cumulative` divided by total reads.
    pub fractions: Vec<f64>,
}

impl ThresholdCoverage {
    pub fn derive(threshold: u8, tiles: &TileHist, total_reads: u64) -> Self {
        let mut cumulative = vec![0u64; TILE_COUNT];
        let mut acc = 0u64;
        for tile in (0..TILE_COUNT).rev() {
            acc += tiles[tile];
            cumulative[tile] = acc;
        }
        let fractions = cumulative
            .iter()
            .map(|&c| {
                if total_reads == 0 {
                    0.0
                } else {
                    c as f64 / total_reads as f64
                }
            })
            .collect();
        Self {
            threshold,
            total_reads,
            tiles: tiles.to_vec(),
            cumulative,
            fractions,
        }
    }

    /// Fraction of reads at or above `tile`; zero past the top tile.
    pub fn fraction_at_tile(&self, tile: usize) -> f64 {
        self.fractions.get(tile).copied().unwrap_or(0.0)
    }
}

/// The named coverage figures, as percentages of all reads.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub strict_threshold: u8,
    pub lenient_threshold: u8,
    /// Every base at or above the strict threshold.
    pub high_quality_reads: f64,
    pub strict_at_95: f64,
    pub strict_at_90: f64,
    pub lenient_at_90: f64,
    /// More than 10% of bases below the lenient threshold.
    pub poor_quality_reads: f64,
    pub medium_quality_reads: f64,
}

impl CoverageSummary {
    pub fn derive(strict: &ThresholdCoverage, lenient: &ThresholdCoverage) -> Self {
        let high = strict.fraction_at_tile(TILE_100);
        let lenient_90 = lenient.fraction_at_tile(TILE_90);
        let (poor, medium) = if lenient.total_reads == 0 {
            (0.0, 0.0)
        } else {
            (1.0 - lenient_90, lenient_90 - high)
        };
        Self {
            strict_threshold: strict.threshold,
            lenient_threshold: lenient.threshold,
            high_quality_reads: 100.0 * high,
            strict_at_95: 100.0 * strict.fraction_at_tile(TILE_95),
            strict_at_90: 100.0 * strict.fraction_at_tile(TILE_90),
            lenient_at_90: 100.0 * lenient_90,
            poor_quality_reads: 100.0 * poor,
            medium_quality_reads: 100.0 * medium,
        }
    }
}
