use crate::core::metrics::FinalMetrics;
use crate::core::model::TILE_RESOLUTION;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write(path: &Path, metrics: &FinalMetrics) -> Result<()> {
    let mut w = BufWriter::new(
        File::create(path).with_context(|| format!("create {} failed", path.display()))?,
    );
    render(&mut w, metrics)?;
    w.flush()?;
    Ok(())
}

pub fn render(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    write_basic(w, metrics)?;
    write_alphabet(w, metrics)?;
    write_per_seq_gc(w, metrics)?;
    write_base_quality(w, metrics)?;
    write_min_quality(w, metrics)?;
    write_coverage(w, metrics)?;
    write_coverage_curve(w, metrics)?;
    Ok(())
}

fn fraction(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn write_basic(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    let basic = &metrics.basic;
    writeln!(w, ">>Basic Statistics")?;
    writeln!(w, "#Measure\tValue")?;
    writeln!(w, "Filename\t{}", metrics.input.file_name)?;
    writeln!(w, "Encoding\t{}", basic.encoding)?;
    writeln!(w, "Reads\t{}", basic.total_reads)?;
    writeln!(w, "Bases\t{}", basic.total_bases)?;
    writeln!(w, "Average read length\t{:.2}", basic.avg_len)?;
    writeln!(w, "Minimum read length\t{}", basic.min_len)?;
    writeln!(w, "Maximum read length\t{}", basic.max_len)?;
    writeln!(w, "Empty reads\t{}", basic.empty_reads)?;
    writeln!(w, "Reads without A/C/G/T\t{}", basic.gc_undefined_reads)?;
    writeln!(w, ">>END_MODULE")?;
    Ok(())
}

fn write_alphabet(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    writeln!(w, ">>Alphabet Frequency")?;
    writeln!(w, "#Symbol\tCount\tPercent")?;
    for row in metrics.alphabet.iter() {
        writeln!(w, "{}\t{}\t{:.2}", row.symbol, row.count, row.percent)?;
    }
    writeln!(w, "GC%\t-\t{:.2}", metrics.basic.gc_percent)?;
    writeln!(w, ">>END_MODULE")?;
    Ok(())
}

fn write_per_seq_gc(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    let total = metrics.basic.total_reads;
    writeln!(w, ">>Per read GC content")?;
    writeln!(w, "#GC%\tCount\tFraction")?;
    for (gc, &count) in metrics.per_seq_gc.iter().enumerate() {
        writeln!(w, "{}\t{}\t{:.4}", gc, count, fraction(count, total))?;
    }
    writeln!(w, ">>END_MODULE")?;
    Ok(())
}

fn write_base_quality(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    let total = metrics.basic.total_bases;
    let bands = &metrics.quality_bands;
    writeln!(w, ">>Base quality distribution")?;
    writeln!(w, "#Quality\tCount\tFraction")?;
    for (q, &count) in metrics.qual_hist.iter().enumerate() {
        writeln!(w, "{}\t{}\t{:.4}", q, count, fraction(count, total))?;
    }
    writeln!(w, "#Band\tPercent")?;
    writeln!(w, "Q30 & above\t{:.1}", bands.q30_and_above)?;
    writeln!(w, "Q20-Q29\t{:.1}", bands.q20_to_q29)?;
    writeln!(w, "Q15-Q19\t{:.1}", bands.q15_to_q19)?;
    writeln!(w, "< Q15\t{:.1}", bands.below_q15)?;
    writeln!(w, ">>END_MODULE")?;
    Ok(())
}

fn write_min_quality(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    let total = metrics.basic.total_reads;
    let cum = &metrics.min_quality;
    writeln!(w, ">>Read minimum quality distribution")?;
    writeln!(w, "#MinQ\tCount\tFraction")?;
    for (q, &count) in metrics.min_qual_hist.iter().enumerate() {
        writeln!(w, "{}\t{}\t{:.4}", q, count, fraction(count, total))?;
    }
    writeln!(w, "#Reads with all bases at\tPercent")?;
    writeln!(w, "Q20 & above\t{:.1}", cum.at_least_q20)?;
    writeln!(w, "Q15 & above\t{:.1}", cum.at_least_q15)?;
    writeln!(w, "Q10 & above\t{:.1}", cum.at_least_q10)?;
    writeln!(w, ">>END_MODULE")?;
    Ok(())
}

fn write_coverage(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    let Some(s) = &metrics.coverage_summary else {
        return Ok(());
    };
    let (strict, lenient) = (s.strict_threshold, s.lenient_threshold);
    writeln!(w, ">>High quality coverage")?;
    writeln!(w, "#Measure\tPercent")?;
    writeln!(
        w,
        "High-quality reads (100% of bases Q{} & above)\t{:.1}",
        strict, s.high_quality_reads
    )?;
    writeln!(
        w,
        "Reads with >= 95% of bases Q{} & above\t{:.1}",
        strict, s.strict_at_95
    )?;
    writeln!(
        w,
        "Reads with >= 90% of bases Q{} & above\t{:.1}",
        strict, s.strict_at_90
    )?;
    writeln!(
        w,
        "Reads with >= 90% of bases Q{} & above\t{:.1}",
        lenient, s.lenient_at_90
    )?;
    writeln!(
        w,
        "Poor-quality reads (> 10% of bases below Q{})\t{:.1}",
        lenient, s.poor_quality_reads
    )?;
    writeln!(w, "Medium-quality reads\t{:.1}", s.medium_quality_reads)?;
    writeln!(w, ">>END_MODULE")?;
    Ok(())
}

fn write_coverage_curve(w: &mut dyn Write, metrics: &FinalMetrics) -> Result<()> {
    writeln!(w, ">>High quality coverage curve")?;
    write!(w, "#X%")?;
    for cov in &metrics.coverage {
        write!(w, "\tq={}", cov.threshold)?;
    }
    writeln!(w)?;
    for tile in (0..=TILE_RESOLUTION).rev() {
        write!(w, "{:.1}", tile as f64 * 100.0 / TILE_RESOLUTION as f64)?;
        for cov in &metrics.coverage {
            write!(w, "\t{:.4}", cov.fraction_at_tile(tile))?;
        }
        writeln!(w)?;
    }
    writeln!(w, ">>END_MODULE")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::scan;
    use crate::core::model::{Encoding, FinalizeContext, ScanConfig};

    fn metrics() -> FinalMetrics {
        let agg = scan(
            "@a\nGGCC\n+\nIIII\n@b\nATAN\n+\n!!!!\n".as_bytes(),
            ScanConfig::default().validate().unwrap(),
        )
        .unwrap();
        agg.finalize(&FinalizeContext {
            phred_offset: 33,
            encoding: Encoding::Sanger,
            file_name: "a.fq".to_string(),
            sample_name: "a".to_string(),
        })
    }

    fn rendered() -> String {
        let mut out = Vec::new();
        render(&mut out, &metrics()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn sections_are_balanced() {
        let text = rendered();
        let opens = text.lines().filter(|l| l.starts_with(">>") && *l != ">>END_MODULE").count();
        let closes = text.lines().filter(|l| *l == ">>END_MODULE").count();
        assert_eq!(opens, 7);
        assert_eq!(opens, closes);
    }

    #[test]
    fn basic_and_band_rows() {
        let text = rendered();
        assert!(text.contains("Reads\t2\n"));
        assert!(text.contains("Bases\t8\n"));
        assert!(text.contains("Average read length\t4.00\n"));
        assert!(text.contains("Q30 & above\t50.0\n"));
        assert!(text.contains("< Q15\t50.0\n"));
    }

    #[test]
    fn ambiguous_symbol_is_last_alphabet_row() {
        let text = rendered();
        let section: Vec<&str> = text
            .lines()
            .skip_while(|l| *l != ">>Alphabet Frequency")
            .take_while(|l| *l != ">>END_MODULE")
            .collect();
        assert_eq!(section[section.len() - 2], "N\t1\t12.50");
        assert!(section[section.len() - 1].starts_with("GC%\t-\t"));
    }

    #[test]
    fn curve_runs_from_top_tile_to_zero() {
        let text = rendered();
        let curve: Vec<&str> = text
            .lines()
            .skip_while(|l| *l != ">>High quality coverage curve")
            .skip(1)
            .take_while(|l| *l != ">>END_MODULE")
            .collect();
        assert_eq!(curve[0], "#X%\tq=15\tq=20");
        assert_eq!(curve[1], "100.0\t0.5000\t0.5000");
        assert_eq!(curve.last().copied(), Some("0.0\t1.0000\t1.0000"));
        assert_eq!(curve.len(), 1 + 201);
    }
}
