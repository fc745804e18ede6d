use std::io::{self, Read};

use tracing::warn;

/// Chunk granularity of the windowed reader.
pub const CHUNK_SIZE: usize = 1 << 20;

/// What [BufferedCharSource::slice] hands back for zero-length requests
/// and for ranges that fell out of the retention window. Downstream code
/// compares against this literal.
pub const EMPTY_SLICE: &str = "<empty>";

/// Windowed random-access reader over a byte stream.
///
/// Bytes are pulled in fixed [CHUNK_SIZE] chunks so earlier input can be
/// quoted back (e.g. context in an error message) without keeping the
/// whole file. Chunks older than the previous one may be flushed to cap
/// memory; `slice` answers `"<empty>"` for flushed ranges.
///
/// Supports a one-byte push-back; pushing a second byte before reading
/// the first back is a programmer error.
pub struct BufferedCharSource<R: Read> {
    reader: R,
    /// Chunk `i` covers bytes `i * CHUNK_SIZE ..`; flushed chunks are
    /// replaced by empty vectors.
    chunks: Vec<Vec<u8>>,
    first_retained: usize,
    /// Absolute offset of the next byte [Self::get] returns.
    offset: u64,
    eof: bool,
    pushed_back: Option<u8>,
    line_start: bool,
    prev_line_start: bool,
}

impl<R: Read> BufferedCharSource<R> {
    /// Reads the first chunk eagerly; an empty input yields a single
    /// empty chunk. A UTF-8 byte-order-mark is skipped.
    pub fn new(reader: R) -> io::Result<Self> {
        let mut source = Self {
            reader,
            chunks: vec![],
            first_retained: 0,
            offset: 0,
            eof: false,
            pushed_back: None,
            line_start: true,
            prev_line_start: true,
        };
        source.fill_next_chunk()?;

        if source.chunks[0].starts_with(&[0xEF, 0xBB, 0xBF]) {
            source.offset = 3;
        }
        Ok(source)
    }

    /// Fills one more chunk, reading blocks until the chunk is full or
    /// the reader runs dry.
    fn fill_next_chunk(&mut self) -> io::Result<()> {
        if self.eof {
            return Ok(());
        }
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut filled = 0;
        while filled < CHUNK_SIZE {
            let n = self.reader.read(&mut chunk[filled..])?;
            if n == 0 {
                self.eof = true;
                break;
            }
            filled += n;
        }
        chunk.truncate(filled);
        self.chunks.push(chunk);
        Ok(())
    }

    fn byte_at_cursor(&mut self) -> u8 {
        loop {
            let chunk_index = (self.offset as usize) / CHUNK_SIZE;
            if chunk_index < self.chunks.len() {
                let within = (self.offset as usize) % CHUNK_SIZE;
                let chunk = &self.chunks[chunk_index];
                if within < chunk.len() {
                    return chunk[within];
                }
                if self.eof {
                    return 0;
                }
            } else if self.eof {
                return 0;
            }
            if let Err(err) = self.fill_next_chunk() {
                warn!("read failed at offset {}: {err}", self.offset);
                self.eof = true;
                return 0;
            }
        }
    }

    /// The next byte without consuming it; 0 at end of input.
    #[must_use]
    pub fn peek(&mut self) -> u8 {
        if let Some(byte) = self.pushed_back {
            return byte;
        }
        self.byte_at_cursor()
    }

    /// Consumes and returns one byte; 0 at end of input.
    pub fn get(&mut self) -> u8 {
        let byte = match self.pushed_back.take() {
            Some(byte) => byte,
            None => {
                let byte = self.byte_at_cursor();
                if byte == 0 {
                    return 0;
                }
                byte
            }
        };

        self.prev_line_start = self.line_start;
        // a carriage return opens a new line; a line feed keeps whatever
        // state the carriage return established
        self.line_start = match byte {
            b'\r' => true,
            b'\n' => self.line_start,
            _ => false,
        };
        self.offset += 1;
        byte
    }

    /// Returns one byte to the stream. At most one byte may be pending.
    ///
    /// # Panics
    /// When a byte is already pushed back.
    pub fn push_back(&mut self, byte: u8) {
        assert!(self.pushed_back.is_none(), "double push-back on character source");
        assert!(self.offset > 0, "push-back before the first byte");
        self.pushed_back = Some(byte);
        self.offset -= 1;
        self.line_start = self.prev_line_start;
    }

    /// Absolute offset of the next byte to be consumed.
    #[must_use]
    #[inline(always)]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the next byte to be consumed starts a line.
    #[must_use]
    #[inline(always)]
    pub const fn is_first_char_in_line(&self) -> bool {
        self.line_start
    }

    /// The text between two absolute offsets, crossing at most one chunk
    /// boundary. Zero-length requests and ranges older than the
    /// retention window yield [EMPTY_SLICE].
    #[must_use]
    pub fn slice(&self, start: u64, length: usize) -> String {
        assert!(length <= CHUNK_SIZE, "slice longer than a chunk");
        if length == 0 {
            return String::from(EMPTY_SLICE);
        }

        let chunk_index = (start as usize) / CHUNK_SIZE;
        if chunk_index < self.first_retained {
            return String::from(EMPTY_SLICE);
        }

        let mut bytes = Vec::with_capacity(length);
        let mut cursor = start as usize;
        let end = start as usize + length;
        while cursor < end {
            let index = cursor / CHUNK_SIZE;
            if index >= self.chunks.len() {
                break;
            }
            let within = cursor % CHUNK_SIZE;
            let chunk = &self.chunks[index];
            if within >= chunk.len() {
                break;
            }
            let take = (end - cursor).min(chunk.len() - within);
            bytes.extend_from_slice(&chunk[within..within + take]);
            cursor += take;
        }

        if bytes.is_empty() {
            return String::from(EMPTY_SLICE);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Drops every chunk before the previous one. Slices into dropped
    /// ranges answer [EMPTY_SLICE] afterwards.
    pub fn flush_old_chunks(&mut self) {
        let current = (self.offset as usize) / CHUNK_SIZE;
        let keep_from = current.saturating_sub(1);
        for index in self.first_retained..keep_from.min(self.chunks.len()) {
            self.chunks[index] = Vec::new();
        }
        self.first_retained = self.first_retained.max(keep_from);
    }
}
