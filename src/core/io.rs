use anyhow::{Context, Result, anyhow, bail};
use flate2::read::MultiGzDecoder;
use gzp::deflate::{Bgzf, Mgzip};
use gzp::par::decompress::ParDecompressBuilder;
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const GZIP_READ_BUF: usize = 8 * 1024 * 1024;

/// A read-only file mapping consumed front to back through `BufRead`.
pub struct MmapSource {
    mmap: Mmap,
    pos: usize,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        // SAFETY: read-only file mapping.
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| "mmap failed")?;
        #[cfg(unix)]
        if let Err(e) = mmap.advise(memmap2::Advice::Sequential) {
            log::debug!("madvise(sequential) failed: {e}");
        }
        log::debug!("mapped {} ({} bytes)", path.display(), mmap.len());
        Ok(Self { mmap, pos: 0 })
    }
}

impl Read for MmapSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (&self.mmap[self.pos..]).read(buf)?;
        self.pos += n;
        Ok(n)
    }
}

impl BufRead for MmapSource {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(&self.mmap[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.mmap.len());
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputKind {
    Plain,
    Gzip,
    Stdin,
    /// A named pipe or other non-regular file; read once, front to back.
    Stream,
}

/// Opens `path` as a buffered byte stream. `-` means standard input; gzip input is
/// recognised by extension or magic bytes. Non-regular files are never reopened, so
/// their gzip magic is peeked from the buffer.
pub fn open_input(path: &Path, threads: usize) -> Result<(Box<dyn BufRead>, InputKind)> {
    let kind = detect_input_kind(path)?;
    let reader: Box<dyn BufRead> = match kind {
        InputKind::Stdin => Box::new(BufReader::new(io::stdin().lock())),
        InputKind::Stream => open_stream(path)?,
        InputKind::Plain => {
            let size = fs::metadata(path)
                .with_context(|| format!("failed to stat {}", path.display()))?
                .len();
            if size == 0 {
                bail!("input file is empty: {}", path.display());
            }
            Box::new(MmapSource::open(path)?)
        }
        InputKind::Gzip => Box::new(BufReader::with_capacity(
            GZIP_READ_BUF,
            open_gzip_reader(path, threads)?,
        )),
    };
    Ok((reader, kind))
}

pub fn detect_input_kind(path: &Path) -> Result<InputKind> {
    if path.as_os_str() == "-" {
        return Ok(InputKind::Stdin);
    }
    let meta = fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    if meta.is_dir() {
        bail!("input is a directory: {}", path.display());
    }
    if !meta.is_file() {
        return Ok(InputKind::Stream);
    }
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if ext == "gz" || ext == "bgz" {
            return Ok(InputKind::Gzip);
        }
    }
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut magic = [0u8; 2];
    let n = file
        .read(&mut magic)
        .with_context(|| "failed to read magic bytes")?;
    if n == 2 && magic == [0x1f, 0x8b] {
        Ok(InputKind::Gzip)
    } else {
        Ok(InputKind::Plain)
    }
}

fn open_stream(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::with_capacity(GZIP_READ_BUF, file);
    let is_gzip = reader
        .fill_buf()
        .with_context(|| format!("failed to read {}", path.display()))?
        .starts_with(&[0x1f, 0x8b]);
    log::debug!("stream input gzip={is_gzip}");
    if is_gzip {
        Ok(Box::new(BufReader::with_capacity(
            GZIP_READ_BUF,
            MultiGzDecoder::new(reader),
        )))
    } else {
        Ok(Box::new(reader))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum GzipVariant {
    Standard,
    Mgzip,
    Bgzf,
}

fn detect_gzip_variant(path: &Path) -> Result<GzipVariant> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut header = [0u8; 20];
    let n = file
        .read(&mut header)
        .with_context(|| "failed to read gzip header")?;
    Ok(gzip_variant_from_header(&header[..n]))
}

fn gzip_variant_from_header(header: &[u8]) -> GzipVariant {
    if header.len() < 14 || header[0] != 0x1f || header[1] != 0x8b {
        return GzipVariant::Standard;
    }
    // FEXTRA flag; the subfield id tells blocked variants apart
    if header[3] & 4 == 0 {
        return GzipVariant::Standard;
    }
    match (header[12], header[13]) {
        (b'B', b'C') => GzipVariant::Bgzf,
        (b'I', b'G') => GzipVariant::Mgzip,
        _ => GzipVariant::Standard,
    }
}

/// Blocked gzip (BGZF/MGZIP) is inflated by a `gzp` worker pool when more than one
/// thread is allowed; everything else goes through a single `MultiGzDecoder`.
pub fn open_gzip_reader(path: &Path, threads: usize) -> Result<Box<dyn Read + Send>> {
    let variant = detect_gzip_variant(path)?;
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let reader: Box<dyn Read + Send> = match variant {
        GzipVariant::Bgzf if threads > 1 => Box::new(
            ParDecompressBuilder::<Bgzf>::new()
                .num_threads(threads)
                .map_err(|e| anyhow!("failed to configure BGZF decoder: {e:?}"))?
                .from_reader(reader),
        ),
        GzipVariant::Mgzip if threads > 1 => Box::new(
            ParDecompressBuilder::<Mgzip>::new()
                .num_threads(threads)
                .map_err(|e| anyhow!("failed to configure MGZIP decoder: {e:?}"))?
                .from_reader(reader),
        ),
        _ => Box::new(MultiGzDecoder::new(reader)),
    };
    log::debug!("gzip variant={variant:?} threads={threads}");
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn header_variants() {
        let mut bgzf = [0u8; 18];
        bgzf[0] = 0x1f;
        bgzf[1] = 0x8b;
        bgzf[3] = 4;
        bgzf[12] = b'B';
        bgzf[13] = b'C';
        assert_eq!(gzip_variant_from_header(&bgzf), GzipVariant::Bgzf);

        let mut mgzip = bgzf;
        mgzip[12] = b'I';
        mgzip[13] = b'G';
        assert_eq!(gzip_variant_from_header(&mgzip), GzipVariant::Mgzip);

        let mut plain = bgzf;
        plain[3] = 0;
        assert_eq!(gzip_variant_from_header(&plain), GzipVariant::Standard);
        assert_eq!(gzip_variant_from_header(&bgzf[..4]), GzipVariant::Standard);
    }

    #[test]
    fn detects_gzip_by_magic_and_reads_through() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("reads.fq");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        enc.finish().unwrap();

        assert_eq!(detect_input_kind(&path).unwrap(), InputKind::Gzip);
        let (mut reader, kind) = open_input(&path, 1).unwrap();
        assert_eq!(kind, InputKind::Gzip);
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "@r1\nACGT\n+\nIIII\n");
    }

    #[test]
    fn plain_file_is_memory_mapped() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("reads.fastq");
        std::fs::write(&path, b"@r1\nAC\n+\nII\n").unwrap();
        let (mut reader, kind) = open_input(&path, 4).unwrap();
        assert_eq!(kind, InputKind::Plain);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "@r1\n");
    }

    #[test]
    fn empty_plain_file_is_an_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("empty.fastq");
        std::fs::write(&path, b"").unwrap();
        assert!(open_input(&path, 1).is_err());
    }

    #[test]
    fn dash_means_stdin() {
        assert_eq!(detect_input_kind(Path::new("-")).unwrap(), InputKind::Stdin);
    }

    #[test]
    fn directory_is_rejected() {
        let dir = assert_fs::TempDir::new().unwrap();
        assert!(detect_input_kind(dir.path()).is_err());
    }

    #[cfg(unix)]
    fn make_fifo(path: &Path) {
        let status = std::process::Command::new("mkfifo")
            .arg(path)
            .status()
            .unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[test]
    fn named_pipe_is_streamed() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("reads.fq");
        make_fifo(&path);
        assert_eq!(detect_input_kind(&path).unwrap(), InputKind::Stream);

        let writer_path = path.clone();
        let writer = std::thread::spawn(move || fs::write(writer_path, b"@r1\nAC\n+\nII\n"));
        let (mut reader, kind) = open_input(&path, 1).unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        writer.join().unwrap().unwrap();
        assert_eq!(kind, InputKind::Stream);
        assert_eq!(text, "@r1\nAC\n+\nII\n");
    }

    #[cfg(unix)]
    #[test]
    fn gzip_through_named_pipe_is_decoded() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("reads.fq.gz");
        make_fifo(&path);

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        let bytes = enc.finish().unwrap();
        let writer_path = path.clone();
        let writer = std::thread::spawn(move || fs::write(writer_path, bytes));
        let (mut reader, kind) = open_input(&path, 4).unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        writer.join().unwrap().unwrap();
        assert_eq!(kind, InputKind::Stream);
        assert_eq!(text, "@r1\nACGT\n+\nIIII\n");
    }
}
