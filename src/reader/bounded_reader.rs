use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Take};

/// Buffer size for forward decoding
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Forward stream over the byte range `[start, end)` of a seekable source.
///
/// Reads never go past `end`, even if the underlying file has grown since the
/// range was chosen, so a standard line reader can be used on a live file.
pub struct BoundedRangeReader<R> {
    inner: BufReader<Take<R>>,

    /// Absolute offset of the next unread byte
    position: u64,

    end: u64,
}

impl<R: Read + Seek> BoundedRangeReader<R> {
    /// Seek `source` to `start` and limit it to `end - start` bytes.
    pub fn new(mut source: R, start: u64, end: u64) -> io::Result<Self> {
        if start > end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("range start {} is past end {}", start, end),
            ));
        }

        source.seek(SeekFrom::Start(start))?;
        let inner = BufReader::with_capacity(READ_BUFFER_SIZE, source.take(end - start));

        Ok(Self {
            inner,
            position: start,
            end,
        })
    }
}

impl<R: Read> BoundedRangeReader<R> {
    /// Absolute offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left before the end of the range.
    pub fn remaining(&self) -> u64 {
        self.end - self.position
    }

    /// Read one raw line including its `\n` terminator (if any) into `buf`.
    ///
    /// Returns the number of bytes read; 0 means the range is exhausted.
    pub fn read_line_bytes(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        buf.clear();
        let n = self.inner.read_until(b'\n', buf)?;
        self.position += n as u64;
        Ok(n)
    }

    /// Iterate decoded lines with terminators stripped.
    pub fn decoded_lines(self) -> DecodedLines<R> {
        DecodedLines {
            reader: self,
            buf: Vec::new(),
        }
    }
}

impl<R: Read> Read for BoundedRangeReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(out)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read> BufRead for BoundedRangeReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.position += amt as u64;
    }
}

/// Iterator over lines of a [`BoundedRangeReader`].
pub struct DecodedLines<R> {
    reader: BoundedRangeReader<R>,
    buf: Vec<u8>,
}

impl<R: Read> DecodedLines<R> {
    /// Bytes of the range not yet decoded.
    pub fn remaining(&self) -> u64 {
        self.reader.remaining()
    }
}

impl<R: Read> Iterator for DecodedLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_line_bytes(&mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(decode_line(&self.buf))),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Strip a trailing `\n` (and a preceding `\r`) and decode lossily.
///
/// Invalid UTF-8 becomes U+FFFD rather than failing the whole batch.
pub fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
