// Chunking: splits a file into fixed-size pieces and describes each piece
// with the inclusive byte range that goes into the `Content-Range` header.

use std::fmt;
use std::io::{self, Read, Take};

/// Default bytes per request. The service rejects non-final chunks under 5 MB.
pub const DEFAULT_CHUNK_SIZE: usize = 6_000_000;
pub const MIN_CHUNK_SIZE: usize = 5_000_000;

/// Inclusive byte span `[start, end]` of a resource of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    /// Range covering `len` bytes starting at `offset`. `len` must be non-zero.
    pub fn at(offset: u64, len: u64, total: u64) -> Self {
        debug_assert!(len > 0);
        Self {
            start: offset,
            end: offset + len - 1,
            total,
        }
    }

    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_last(&self) -> bool {
        self.end + 1 == self.total
    }

    /// Value for the `Content-Range` request header.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// One piece of the file together with its position.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub range: ByteRange,
    pub data: Vec<u8>,
}

/// Number of requests needed to send `total` bytes in `chunk_size` pieces.
/// A zero size counts as one byte, the same as `ChunkReader`.
pub fn chunk_count(total: u64, chunk_size: usize) -> u64 {
    total.div_ceil(chunk_size.max(1) as u64)
}

/// Reads at most `total` bytes from `reader` as consecutive chunks.
///
/// Each chunk is exactly `chunk_size` bytes except the last. Bytes appended to
/// the source after the reader was created are never read, so the ranges
/// always partition `[0, total - 1]` unless the source shrinks.
pub struct ChunkReader<R> {
    reader: Take<R>,
    chunk_size: usize,
    offset: u64,
    total: u64,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R, total: u64, chunk_size: usize) -> Self {
        Self {
            reader: reader.take(total),
            chunk_size: chunk_size.max(1),
            offset: 0,
            total,
        }
    }

    /// Bytes handed out so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.total {
            return None;
        }

        let remaining = self.total - self.offset;
        let want = remaining.min(self.chunk_size as u64);
        let mut data = Vec::with_capacity(want as usize);

        match self.reader.by_ref().take(want).read_to_end(&mut data) {
            Ok(0) => {
                // source shrank underneath us
                self.offset = self.total;
                None
            }
            Ok(n) => {
                let range = ByteRange::at(self.offset, n as u64, self.total);
                self.offset += n as u64;
                Some(Ok(Chunk { range, data }))
            }
            Err(e) => {
                self.offset = self.total;
                Some(Err(e))
            }
        }
    }
}
