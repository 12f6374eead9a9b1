use crate::core::model::{QualHist, percent};
use serde::Serialize;

/// Share of all bases per quality band, in percent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QualityBands {
    pub below_q15: f64,
    pub q15_to_q19: f64,
    pub q20_to_q29: f64,
    pub q30_and_above: f64,
}

impl QualityBands {
    pub fn from_hist(hist: &QualHist, total_bases: u64) -> Self {
        let band = |lo: usize, hi: usize| percent(hist[lo..hi].iter().sum(), total_bases);
        Self {
            below_q15: band(0, 15),
            q15_to_q19: band(15, 20),
            q20_to_q29: band(20, 30),
            q30_and_above: band(30, hist.len()),
        }
    }
}

/// Share of reads whose lowest base quality reaches each level, in percent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MinQualityCumulative {
    pub at_least_q10: f64,
    pub at_least_q15: f64,
    pub at_least_q20: f64,
}

impl MinQualityCumulative {
    pub fn from_hist(min_hist: &QualHist, total_reads: u64) -> Self {
        let from = |q: usize| percent(min_hist[q..].iter().sum(), total_reads);
        Self {
            at_least_q10: from(10),
            at_least_q15: from(15),
            at_least_q20: from(20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::QSCORE_SIZE;

    #[test]
    fn band_edges_are_half_open() {
        let mut hist = [0u64; QSCORE_SIZE];
        hist[14] = 1;
        hist[15] = 1;
        hist[19] = 1;
        hist[20] = 1;
        hist[29] = 1;
        hist[30] = 2;
        hist[41] = 1;
        let bands = QualityBands::from_hist(&hist, 8);
        assert_eq!(bands.below_q15, 12.5);
        assert_eq!(bands.q15_to_q19, 25.0);
        assert_eq!(bands.q20_to_q29, 25.0);
        assert_eq!(bands.q30_and_above, 37.5);
    }

    #[test]
    fn min_quality_levels_are_cumulative() {
        let mut hist = [0u64; QSCORE_SIZE];
        hist[5] = 1;
        hist[10] = 1;
        hist[17] = 1;
        hist[35] = 1;
        let cum = MinQualityCumulative::from_hist(&hist, 4);
        assert_eq!(cum.at_least_q10, 75.0);
        assert_eq!(cum.at_least_q15, 50.0);
        assert_eq!(cum.at_least_q20, 25.0);
    }

    #[test]
    fn zero_totals_yield_zero() {
        let hist = [0u64; QSCORE_SIZE];
        assert_eq!(QualityBands::from_hist(&hist, 0).below_q15, 0.0);
        assert_eq!(MinQualityCumulative::from_hist(&hist, 0).at_least_q10, 0.0);
    }
}
