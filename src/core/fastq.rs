use crate::core::error::{FormatError, ScanError};
use memchr::memchr;
use std::io::{self, BufRead};

/// One validated record, borrowed from the reader's line buffers until the next call
/// to [`FastqReader::next_record`].
#[derive(Clone, Copy, Debug)]
pub struct ReadView<'a> {
    /// Identifier without the leading `@`.
    pub id: &'a [u8],
    pub seq: &'a [u8],
    pub qual: &'a [u8],
    /// Line number of the identifier line.
    pub line: u64,
}

impl ReadView<'_> {
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn qual_line(&self) -> u64 {
        self.line + 3
    }
}

/// Pulls four physical lines per record from a buffered stream and enforces the
/// FASTQ layout. Finite and non-restartable: once the stream ends or a record fails
/// validation, every further call yields `Ok(None)`.
pub struct FastqReader<R> {
    inner: R,
    id: Vec<u8>,
    seq: Vec<u8>,
    sep: Vec<u8>,
    qual: Vec<u8>,
    line: u64,
    finished: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            id: Vec::with_capacity(256),
            seq: Vec::with_capacity(1024),
            sep: Vec::with_capacity(256),
            qual: Vec::with_capacity(1024),
            line: 0,
            finished: false,
        }
    }

    /// Physical lines consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    pub fn next_record(&mut self) -> Result<Option<ReadView<'_>>, ScanError> {
        if self.finished {
            return Ok(None);
        }
        match self.fill_record() {
            Ok(true) => Ok(Some(ReadView {
                id: &self.id[1..],
                seq: &self.seq,
                qual: &self.qual,
                line: self.line - 3,
            })),
            Ok(false) => {
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    fn fill_record(&mut self) -> Result<bool, ScanError> {
        if !read_line(&mut self.inner, &mut self.id)? {
            return Ok(false);
        }
        self.line += 1;
        if self.id.first() != Some(&b'@') {
            return Err(FormatError::MissingIdentifierMarker { line: self.line }.into());
        }

        self.line += 1;
        if !read_line(&mut self.inner, &mut self.seq)? {
            return Err(FormatError::TruncatedRecord { line: self.line }.into());
        }

        self.line += 1;
        if !read_line(&mut self.inner, &mut self.sep)? {
            return Err(FormatError::TruncatedRecord { line: self.line }.into());
        }
        if self.sep.first() != Some(&b'+') {
            return Err(FormatError::MissingSeparatorMarker { line: self.line }.into());
        }

        self.line += 1;
        if !read_line(&mut self.inner, &mut self.qual)? {
            return Err(FormatError::TruncatedRecord { line: self.line }.into());
        }
        if self.qual.len() != self.seq.len() {
            return Err(FormatError::QualityLengthMismatch {
                line: self.line,
                seq_len: self.seq.len(),
                qual_len: self.qual.len(),
            }
            .into());
        }
        Ok(true)
    }
}

/// Reads one physical line into `buf` without its `\n` (or `\r\n`) terminator.
/// Returns `false` only when the stream is already exhausted.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    let mut consumed_any = false;
    loop {
        let (done, used) = {
            let available = match reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                (true, 0)
            } else if let Some(i) = memchr(b'\n', available) {
                buf.extend_from_slice(&available[..i]);
                (true, i + 1)
            } else {
                buf.extend_from_slice(available);
                (false, available.len())
            }
        };
        if used > 0 {
            consumed_any = true;
            reader.consume(used);
        }
        if done {
            break;
        }
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(consumed_any)
}
