use crate::core::metrics::FinalMetrics;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;

/// The short run summary printed once the outputs are written.
pub fn write(w: &mut dyn Write, metrics: &FinalMetrics, outputs: &[PathBuf]) -> Result<()> {
    let basic = &metrics.basic;
    writeln!(w, "--- Summary of FASTQ ---")?;
    writeln!(w, "InputFile: {}", metrics.input.file_name)?;
    writeln!(w, "#Read: {}", basic.total_reads)?;
    writeln!(w, "#Base: {}", basic.total_bases)?;
    writeln!(w, "AvgReadLen: {:.2}", basic.avg_len)?;
    writeln!(w, "MinReadLen: {}", basic.min_len)?;
    writeln!(w, "MaxReadLen: {}", basic.max_len)?;
    if let Some(s) = &metrics.coverage_summary {
        writeln!(w, "HighQualityReads: {:.1}%", s.high_quality_reads)?;
        writeln!(w, "PoorQualityReads: {:.1}%", s.poor_quality_reads)?;
    }
    let names: Vec<String> = outputs.iter().map(|p| p.display().to_string()).collect();
    writeln!(w, "OutFile: {}", names.join(","))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::scan;
    use crate::core::model::{Encoding, FinalizeContext, ScanConfig};

    #[test]
    fn prints_counts_and_outputs() {
        let agg = scan(
            "@a\nACG\n+\nIII\n@b\nA\n+\n!\n".as_bytes(),
            ScanConfig::default().validate().unwrap(),
        )
        .unwrap();
        let metrics = agg.finalize(&FinalizeContext {
            phred_offset: 33,
            encoding: Encoding::Sanger,
            file_name: "x.fq".to_string(),
            sample_name: "x".to_string(),
        });
        let mut out = Vec::new();
        write(
            &mut out,
            &metrics,
            &[PathBuf::from("o.json"), PathBuf::from("o.txt")],
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("InputFile: x.fq\n"));
        assert!(text.contains("#Read: 2\n"));
        assert!(text.contains("#Base: 4\n"));
        assert!(text.contains("AvgReadLen: 2.00\n"));
        assert!(text.contains("MinReadLen: 1\n"));
        assert!(text.contains("MaxReadLen: 3\n"));
        assert!(text.contains("HighQualityReads: 50.0%\n"));
        assert!(text.contains("OutFile: o.json,o.txt\n"));
    }
}
