use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BasicStats {
    pub encoding: &'static str,
    pub total_reads: u64,
    pub total_bases: u64,
    pub min_len: usize,
    pub max_len: usize,
    pub avg_len: f64,
    /// G+C over all bases of the dataset, as a percentage.
    pub gc_percent: f64,
    pub empty_reads: u64,
    pub gc_undefined_reads: u64,
}
