use anyhow::{Context, Result, anyhow};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Bundles `files` into `zip_path` under their file names. The archive is written to
/// a temporary sibling first so a failed run never leaves a partial bundle behind.
pub fn write_zip(zip_path: &Path, files: &[&Path]) -> Result<()> {
    let mut tmp_name = zip_path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let file = File::create(tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let result = write_zip_entries(&mut zip, files);

    match result.and_then(|_| zip.finish().with_context(|| "failed to finalize zip")) {
        Ok(_) => {
            fs::rename(tmp_path, zip_path)
                .with_context(|| format!("failed to move zip to {}", zip_path.display()))?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(tmp_path);
            Err(e)
        }
    }
}

fn write_zip_entries(zip: &mut ZipWriter<File>, files: &[&Path]) -> Result<()> {
    let epoch = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
        .map_err(|e| anyhow!("invalid zip timestamp: {e:?}"))?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(epoch);

    for src_path in files {
        let name = src_path
            .file_name()
            .and_then(|s| s.to_str())
            .with_context(|| format!("no file name in {}", src_path.display()))?;
        add_file(zip, src_path, name, options)
            .with_context(|| format!("failed to add {} to zip", name))?;
    }
    Ok(())
}

fn add_file(
    zip: &mut ZipWriter<File>,
    src_path: &Path,
    zip_path: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut file =
        File::open(src_path).with_context(|| format!("failed to open {}", src_path.display()))?;
    zip.start_file(zip_path, options)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        zip.write_all(&buf[..n])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::ZipArchive;

    #[test]
    fn bundles_files_by_name() {
        let dir = assert_fs::TempDir::new().unwrap();
        let a = dir.path().join("run.json");
        let b = dir.path().join("run.txt");
        fs::write(&a, b"{}").unwrap();
        fs::write(&b, b">>Basic Statistics\n").unwrap();
        let out = dir.path().join("run.zip");

        write_zip(&out, &[a.as_path(), b.as_path()]).unwrap();

        assert!(!dir.path().join("run.zip.tmp").exists());
        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut text = String::new();
        archive
            .by_name("run.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, ">>Basic Statistics\n");
    }

    #[test]
    fn missing_source_leaves_no_archive() {
        let dir = assert_fs::TempDir::new().unwrap();
        let out = dir.path().join("run.zip");
        let missing = dir.path().join("nope.json");
        assert!(write_zip(&out, &[missing.as_path()]).is_err());
        assert!(!out.exists());
        assert!(!dir.path().join("run.zip.tmp").exists());
    }
}
