//! Append-only reply accumulator shared by both transports.
//!
//! # Design
//! The storage always ends with a single zero byte that is not counted in
//! `len()`, so the contents can be handed across a C boundary as a string
//! without copying. Growth goes through `Vec::try_reserve`: an allocation
//! failure surfaces as `HttpError::Allocation` instead of aborting.

use std::io::{self, Read};

use crate::error::{HttpError, Result};

/// Bytes requested from a reply stream per read.
pub const CHUNK_SIZE: usize = 1024;

/// Byte buffer that only grows, kept NUL-terminated after every append.
#[derive(Debug, Clone)]
pub struct GrowableBuffer {
    // Invariant: `data.last() == Some(&0)` and `data.len() == len() + 1`.
    data: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self { data: vec![0] }
    }

    /// Append `chunk`, moving the terminator behind it.
    pub fn append(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.data.try_reserve(chunk.len()).map_err(HttpError::Allocation)?;
        self.data.pop();
        self.data.extend_from_slice(chunk);
        self.data.push(0);
        Ok(())
    }

    /// Number of bytes written, terminator excluded.
    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Contents followed by the trailing zero byte.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.data
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        self.data.pop();
        self.data
    }

    pub fn into_vec_with_nul(self) -> Vec<u8> {
        self.data
    }
}

impl Default for GrowableBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&[u8]> for GrowableBuffer {
    fn from(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() + 1);
        data.extend_from_slice(bytes);
        data.push(0);
        Self { data }
    }
}

impl From<&str> for GrowableBuffer {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

/// The write-callback sink: every chunk handed to `write` is appended whole.
impl io::Write for GrowableBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf).map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Drain `reader` in `CHUNK_SIZE` reads until end of file.
///
/// Read failures are classified by `on_error`, so each backend reports them
/// in its own category.
pub fn read_chunks<R: Read>(
    mut reader: R,
    on_error: impl Fn(io::Error) -> HttpError,
) -> Result<GrowableBuffer> {
    let mut buffer = GrowableBuffer::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(on_error(e)),
        };
        tracing::trace!(bytes = n, "received chunk");
        buffer.append(&chunk[..n])?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn new_buffer_is_empty_and_terminated() {
        let buf = GrowableBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes(), b"");
        assert_eq!(buf.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn append_concatenates_chunks() {
        let mut buf = GrowableBuffer::new();
        for chunk in ["ab", "cd", "ef"] {
            buf.append(chunk.as_bytes()).unwrap();
        }
        assert_eq!(buf.as_bytes(), b"abcdef");
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.as_bytes_with_nul(), b"abcdef\0");
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        let mut one = GrowableBuffer::new();
        one.append(b"abcdef").unwrap();

        let mut many = GrowableBuffer::new();
        for chunk in [&b"a"[..], b"bcd", b"", b"e", b"f"] {
            many.append(chunk).unwrap();
        }
        assert_eq!(one.as_bytes_with_nul(), many.as_bytes_with_nul());
    }

    #[test]
    fn empty_append_keeps_single_terminator() {
        let mut buf = GrowableBuffer::from("x");
        buf.append(b"").unwrap();
        assert_eq!(buf.as_bytes_with_nul(), b"x\0");
    }

    #[test]
    fn embedded_zero_bytes_are_counted() {
        let mut buf = GrowableBuffer::new();
        buf.append(&[1, 0, 2]).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.into_vec(), vec![1, 0, 2]);
    }

    #[test]
    fn io_write_appends() {
        let mut buf = GrowableBuffer::new();
        write!(buf, "{}-{}", 12, "ab").unwrap();
        std::io::copy(&mut &b"xyz"[..], &mut buf).unwrap();
        assert_eq!(buf.to_string_lossy(), "12-abxyz");
        assert_eq!(buf.into_vec_with_nul(), b"12-abxyz\0".to_vec());
    }

    #[test]
    fn read_chunks_collects_short_reads() {
        let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let reader = Trickle { data: &data, step: 7 };
        let buf = read_chunks(reader, |e| HttpError::Transport(e.to_string())).unwrap();
        assert_eq!(buf.as_bytes(), &data[..]);
    }

    #[test]
    fn read_chunks_empty_input_is_empty_buffer() {
        let buf = read_chunks(&b""[..], |e| HttpError::Transport(e.to_string())).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn read_chunks_classifies_read_errors() {
        let err = read_chunks(Broken, |e| HttpError::Subprocess(e.to_string())).unwrap_err();
        assert!(matches!(err, HttpError::Subprocess(_)));
    }
}
