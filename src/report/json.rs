use crate::core::metrics::FinalMetrics;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the snapshot as pretty-printed JSON for downstream renderers.
pub fn write(path: &Path, metrics: &FinalMetrics) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("create {} failed", path.display()))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, metrics).context("failed to serialize statistics")?;
    writeln!(w)?;
    w.flush()?;
    Ok(())
}
