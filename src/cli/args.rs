use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "readqdist",
    version,
    about = "Quality distribution, GC content and high-quality coverage of a FASTQ file"
)]
pub struct Cli {
    /// FASTQ input (plain, gzip or BGZF); `-` reads standard input
    pub input: PathBuf,

    /// Output name prefix; writes <PREFIX>.json, <PREFIX>.txt and <PREFIX>.zip
    pub prefix: PathBuf,

    /// High-quality thresholds, one coverage curve each
    #[arg(long = "threshold", value_delimiter = ',', default_values_t = vec![15u8, 20])]
    pub thresholds: Vec<u8>,

    /// Threshold used for the high-quality read share and the 95%/90% points
    #[arg(long, default_value_t = 20)]
    pub strict_threshold: u8,

    /// Threshold used for the poor-quality read share
    #[arg(long, default_value_t = 15)]
    pub lenient_threshold: u8,

    #[arg(long, value_enum, default_value_t = PhredOffsetArg::P33)]
    pub phred_offset: PhredOffsetArg,

    /// What to do with quality codes outside Q0..Q41
    #[arg(long, value_enum, default_value_t = QualityPolicyArg::Reject)]
    pub quality_policy: QualityPolicyArg,

    /// Decompression threads for BGZF input
    #[arg(long, default_value_t = num_cpus::get())]
    pub threads: usize,

    #[arg(long)]
    pub sample_name: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_zip: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PhredOffsetArg {
    #[value(name = "33")]
    P33,
    #[value(name = "64")]
    P64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum QualityPolicyArg {
    #[value(name = "reject")]
    Reject,
    #[value(name = "clamp")]
    Clamp,
}
