use crate::cli::args::{Cli, PhredOffsetArg, QualityPolicyArg};
use crate::core::engine::{self, RunConfig, fmt_dur};
use crate::core::metrics::FinalMetrics;
use crate::core::model::{QualityPolicy, ScanConfig};
use crate::report;
use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, error, info};
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

const EXIT_USAGE: u8 = 1;
const EXIT_FAILURE: u8 = 2;

pub fn entry() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            err.chain()
                .skip(1)
                .for_each(|cause| error!("  because: {}", cause));
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(args: Cli) -> Result<()> {
    let t0 = Instant::now();

    stage("preflight", || {
        if args.input.as_os_str() != "-" {
            if !args.input.exists() {
                bail!("input file not found: {}", args.input.display());
            }
            if args.input.is_dir() {
                bail!("input is a directory: {}", args.input.display());
            }
        }
        if args.threads == 0 {
            bail!("--threads must be >= 1");
        }
        if args.prefix.as_os_str().is_empty() {
            bail!("output prefix must not be empty");
        }
        Ok(())
    })?;

    let sample_name = match args.sample_name {
        Some(s) => s,
        None if args.input.as_os_str() == "-" => "stdin".to_string(),
        None => sample_name_from_path(&args.input)
            .context("failed to determine sample name from input file")?,
    };

    let scan = ScanConfig {
        phred_offset: match args.phred_offset {
            PhredOffsetArg::P33 => 33,
            PhredOffsetArg::P64 => 64,
        },
        thresholds: args.thresholds.clone(),
        strict_threshold: args.strict_threshold,
        lenient_threshold: args.lenient_threshold,
        quality_policy: match args.quality_policy {
            QualityPolicyArg::Reject => QualityPolicy::Reject,
            QualityPolicyArg::Clamp => QualityPolicy::Clamp,
        },
    }
    .validate()
    .context("invalid quality settings")?;

    if let Some(parent) = args.prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir {}", parent.display()))?;
    }

    info!(
        "scanning {} (thresholds {:?}, offset {})",
        args.input.display(),
        scan.thresholds,
        scan.phred_offset
    );
    let t_engine = Instant::now();
    let output = engine::run(RunConfig {
        input: args.input.clone(),
        sample_name,
        threads: args.threads,
        scan,
    })?;
    engine::log_stage("engine", t_engine);

    let t_derive = Instant::now();
    let metrics = output.agg.finalize(&output.ctx);
    engine::log_stage("derive", t_derive);

    let json_path = with_suffix(&args.prefix, ".json");
    let txt_path = with_suffix(&args.prefix, ".txt");
    let zip_path = with_suffix(&args.prefix, ".zip");

    let t_reports = Instant::now();
    write_reports(&metrics, &json_path, &txt_path)?;
    engine::log_stage("reports", t_reports);
    log_size("json", &json_path);
    log_size("txt", &txt_path);

    let mut outputs = vec![json_path.clone(), txt_path.clone()];
    if !args.no_zip {
        let t_zip = Instant::now();
        report::zip::write_zip(&zip_path, &[json_path.as_path(), txt_path.as_path()])
            .with_context(|| "failed to create zip output")?;
        engine::log_stage("zip", t_zip);
        log_size("zip", &zip_path);
        outputs.push(zip_path);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::summary_txt::write(&mut out, &metrics, &outputs)?;
    out.flush()?;

    debug!("stage=total time={}", fmt_dur(t0.elapsed()));
    Ok(())
}

/// Writes both reports under `.tmp` names and renames them only once both exist, so
/// a failed write leaves neither behind.
fn write_reports(metrics: &FinalMetrics, json_path: &Path, txt_path: &Path) -> Result<()> {
    let json_tmp = with_suffix(json_path, ".tmp");
    let txt_tmp = with_suffix(txt_path, ".tmp");

    let staged = report::json::write(&json_tmp, metrics)
        .with_context(|| format!("failed to write {}", json_path.display()))
        .and_then(|_| {
            report::qdist_txt::write(&txt_tmp, metrics)
                .with_context(|| format!("failed to write {}", txt_path.display()))
        });
    if let Err(e) = staged {
        let _ = fs::remove_file(&json_tmp);
        let _ = fs::remove_file(&txt_tmp);
        return Err(e);
    }

    fs::rename(&json_tmp, json_path)
        .with_context(|| format!("failed to move report to {}", json_path.display()))?;
    if let Err(e) = fs::rename(&txt_tmp, txt_path) {
        let _ = fs::remove_file(&txt_tmp);
        let _ = fs::remove_file(json_path);
        return Err(e)
            .with_context(|| format!("failed to move report to {}", txt_path.display()));
    }
    Ok(())
}

fn sample_name_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name
        .strip_suffix(".gz")
        .or_else(|| name.strip_suffix(".bgz"))
        .unwrap_or(name);
    let stem = match stem.rfind('.') {
        Some(i) if i > 0 => &stem[..i],
        _ => stem,
    };
    Some(stem.to_string())
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn stage<F>(name: &str, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let t = Instant::now();
    let res = f();
    engine::log_stage(name, t);
    res
}

fn log_size(label: &str, path: &Path) {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    debug!("output {}={} bytes={}", label, path.display(), size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::scan;
    use crate::core::model::{Encoding, FinalizeContext};

    fn metrics() -> FinalMetrics {
        let agg = scan("@a\nACGT\n+\nIIII\n".as_bytes(), ScanConfig::default()).unwrap();
        agg.finalize(&FinalizeContext {
            phred_offset: 33,
            encoding: Encoding::Sanger,
            file_name: "a.fq".to_string(),
            sample_name: "a".to_string(),
        })
    }

    #[test]
    fn reports_are_renamed_into_place() {
        let dir = assert_fs::TempDir::new().unwrap();
        let json = dir.path().join("run.json");
        let txt = dir.path().join("run.txt");
        write_reports(&metrics(), &json, &txt).unwrap();
        assert!(json.is_file());
        assert!(txt.is_file());
        assert!(!dir.path().join("run.json.tmp").exists());
        assert!(!dir.path().join("run.txt.tmp").exists());
    }

    #[test]
    fn failed_text_report_leaves_no_json_behind() {
        let dir = assert_fs::TempDir::new().unwrap();
        let json = dir.path().join("run.json");
        let txt = dir.path().join("run.txt");
        // a directory in the way makes the text report fail after the JSON is written
        fs::create_dir(dir.path().join("run.txt.tmp")).unwrap();

        assert!(write_reports(&metrics(), &json, &txt).is_err());
        assert!(!json.exists());
        assert!(!dir.path().join("run.json.tmp").exists());
        assert!(!txt.exists());
    }

    #[test]
    fn sample_name_strips_fastq_and_gzip_extensions() {
        assert_eq!(
            sample_name_from_path(Path::new("/data/run1.fastq")).as_deref(),
            Some("run1")
        );
        assert_eq!(
            sample_name_from_path(Path::new("run1.fq.gz")).as_deref(),
            Some("run1")
        );
        assert_eq!(
            sample_name_from_path(Path::new("reads")).as_deref(),
            Some("reads")
        );
        assert_eq!(
            sample_name_from_path(Path::new(".hidden")).as_deref(),
            Some(".hidden")
        );
    }

    #[test]
    fn suffix_is_appended_to_prefix() {
        assert_eq!(
            with_suffix(Path::new("out/run.v1"), ".json"),
            PathBuf::from("out/run.v1.json")
        );
    }
}
