use crate::core::error::ScanError;
use crate::core::fastq::FastqReader;
use crate::core::io::open_input;
use crate::core::metrics::Agg;
use crate::core::model::{Encoding, FinalizeContext, ScanConfig};
use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const PROGRESS_EVERY: u64 = 10_000_000;

pub struct RunConfig {
    pub input: PathBuf,
    pub sample_name: String,
    pub threads: usize,
    pub scan: ScanConfig,
}

pub struct RunOutput {
    pub agg: Agg,
    pub ctx: FinalizeContext,
}

pub fn run(cfg: RunConfig) -> Result<RunOutput> {
    let t_total = Instant::now();

    let file_name = if cfg.input.as_os_str() == "-" {
        "stdin".to_string()
    } else {
        cfg.input
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .context("failed to determine input filename")?
    };
    let ctx = FinalizeContext {
        phred_offset: cfg.scan.phred_offset,
        encoding: Encoding::from_offset(cfg.scan.phred_offset),
        file_name,
        sample_name: cfg.sample_name.clone(),
    };

    let t_open = Instant::now();
    let (input, kind) = open_input(&cfg.input, cfg.threads)?;
    log_stage("engine.input_open", t_open);
    debug!("input kind={kind:?}");

    let t_scan = Instant::now();
    let agg = scan(input, cfg.scan)
        .with_context(|| format!("failed to scan {}", cfg.input.display()))?;
    log_stage("engine.scan", t_scan);

    if agg.total_reads == 0 {
        bail!("input contains no records: {}", cfg.input.display());
    }
    log_stage("engine.total", t_total);

    Ok(RunOutput { agg, ctx })
}

/// Streams every record of `input` through a fresh aggregate. The first fatal error
/// ends the scan and discards everything counted so far.
pub fn scan<R: BufRead>(input: R, config: ScanConfig) -> Result<Agg, ScanError> {
    let mut reader = FastqReader::new(input);
    let mut agg = Agg::new(config)?;
    while let Some(read) = reader.next_record()? {
        agg.update_read(&read)?;
        if agg.total_reads % PROGRESS_EVERY == 0 {
            info!("processed {} reads", agg.total_reads);
        }
    }
    debug!(
        "scan done lines={} reads={} bases={}",
        reader.lines_read(),
        agg.total_reads,
        agg.total_bases
    );
    if agg.empty_reads > 0 {
        warn!(
            "{} zero-length reads were counted but left out of GC, minimum-quality and coverage statistics",
            agg.empty_reads
        );
    }
    if agg.gc_undefined_reads > 0 {
        warn!(
            "{} reads had no A/C/G/T bases and were left out of the GC distribution",
            agg.gc_undefined_reads
        );
    }
    Ok(agg)
}

pub(crate) fn log_stage(name: &str, t: Instant) {
    debug!("stage={} time={}", name, fmt_dur(t.elapsed()));
}

pub(crate) fn fmt_dur(d: Duration) -> String {
    if d.as_secs_f64() < 1.0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}
