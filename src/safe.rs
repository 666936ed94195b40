//! Complete-read wrappers for "framed" sources.
//!
//! Decompressors and decoders commonly return fewer bytes from a single `read`
//! than were requested even though more data follows. Two strategies shield
//! value encoders from that:
//!
//! * [`SafeSource`] keeps reading until the target range is full and only comes
//!   up short at a genuine end of stream (returning `0` when nothing was read).
//! * [`StrictSource`] keeps reading the same way but fails with
//!   `Error::UnexpectedEof` the moment the stream ends before the range is full.

use crate::error::{Error, Result};
use crate::stream::{BoxSource, Source, StreamType};
use std::collections::VecDeque;
use std::io::{self, Cursor, Read};

fn check_range(buf: &[u8], offset: usize, len: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(()),
        _ => Err(Error::invalid_argument(format!(
            "illegal range: array=[0, {}), range=[{}, {}]",
            buf.len(),
            offset,
            offset.saturating_add(len)
        ))),
    }
}

/// Reads into `buf` until it is full or the source is exhausted.
fn fill<R: Read + ?Sized>(inner: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match inner.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}

/// Best-effort-complete reader.
pub struct SafeSource<R: Read> {
    inner: R,
}

impl<R: Read> SafeSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads into `buf[offset..offset + len]`, returning how many bytes landed.
    ///
    /// The count is short only when the stream ended; `0` means nothing was left.
    pub fn read_range(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<usize> {
        check_range(buf, offset, len)?;
        Ok(fill(&mut self.inner, &mut buf[offset..offset + len])?)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for SafeSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        fill(&mut self.inner, buf)
    }
}

impl<R: Read> Source for SafeSource<R> {}

impl<'a> SafeSource<BoxSource<'a>> {
    /// Wraps `source` unless it already fills reads completely.
    pub fn wrap(source: BoxSource<'a>) -> BoxSource<'a> {
        if is_complete_reader(source.stream_type()) {
            source
        } else {
            Box::new(SafeSource::new(source))
        }
    }
}

/// Fail-fast complete reader.
pub struct StrictSource<R: Read> {
    inner: R,
}

impl<R: Read> StrictSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Fills `buf[offset..offset + len]` exactly or fails with `UnexpectedEof`.
    ///
    /// A zero-length request returns `0` without touching the source.
    pub fn read_range(&mut self, buf: &mut [u8], offset: usize, len: usize) -> Result<usize> {
        check_range(buf, offset, len)?;
        if len == 0 {
            return Ok(0);
        }
        let read = fill(&mut self.inner, &mut buf[offset..offset + len])?;
        if read < len {
            return Err(Error::UnexpectedEof);
        }
        Ok(read)
    }

    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        self.read_range(buf, 0, len).map(|_| ())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for StrictSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        self.read_range(buf, 0, len).map_err(io::Error::from)
    }
}

impl<R: Read> Source for StrictSource<R> {}

impl<'a> StrictSource<BoxSource<'a>> {
    /// Wraps `source` unless it is already strict.
    pub fn wrap(source: BoxSource<'a>) -> BoxSource<'a> {
        if source.stream_type() == StreamType::of::<StrictSource<&[u8]>>() {
            source
        } else {
            Box::new(StrictSource::new(source))
        }
    }
}

/// Sources whose `read` only comes up short at the end of the stream.
fn is_complete_reader(kind: StreamType) -> bool {
    [
        StreamType::of::<SafeSource<&[u8]>>(),
        StreamType::of::<StrictSource<&[u8]>>(),
        StreamType::of::<Cursor<&[u8]>>(),
        StreamType::of::<&[u8]>(),
        StreamType::of::<VecDeque<u8>>(),
    ]
    .contains(&kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::RawSource;

    /// Hands out data in fixed-size frames, like a decompressor would.
    struct Framed {
        data: Vec<u8>,
        pos: usize,
        frame: usize,
    }

    impl Read for Framed {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.frame).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn framed(len: usize) -> Framed {
        Framed {
            data: (0..len).map(|i| i as u8).collect(),
            pos: 0,
            frame: 128,
        }
    }

    #[test]
    fn safe_fills_across_frames() {
        let mut source = SafeSource::new(framed(1000));
        let mut buf = vec![0u8; 1000];
        assert_eq!(source.read_range(&mut buf, 0, 1000).unwrap(), 1000);
        assert_eq!(buf, framed(1000).data);
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn safe_returns_short_at_end() {
        let mut source = SafeSource::new(framed(300));
        let mut buf = vec![0u8; 512];
        assert_eq!(source.read_range(&mut buf, 0, 512).unwrap(), 300);
    }

    #[test]
    fn strict_fails_on_short() {
        let mut source = StrictSource::new(framed(1000));
        let mut buf = vec![0u8; 1001];
        assert!(source.read_range(&mut buf, 0, 1001).unwrap_err().is_eof());
    }

    #[test]
    fn strict_zero_length_is_noop() {
        let mut source = StrictSource::new(&[0u8; 0][..]);
        let mut buf = [0u8; 10];
        assert_eq!(source.read_range(&mut buf, 2, 0).unwrap(), 0);
        assert!(source.read_range(&mut buf, 2, 1).unwrap_err().is_eof());
    }

    #[test]
    fn range_checks() {
        let mut source = StrictSource::new(&[0u8; 10][..]);
        let mut buf = [0u8; 10];
        assert!(matches!(
            source.read_range(&mut buf, 0, 11),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            source.read_range(&mut buf, usize::MAX, 2),
            Err(Error::InvalidArgument { .. })
        ));
        let mut safe = SafeSource::new(&[0u8; 10][..]);
        assert!(matches!(
            safe.read_range(&mut buf, 5, 6),
            Err(Error::InvalidArgument { .. })
        ));
    }

    fn addr<T: ?Sized>(r: &T) -> *const u8 {
        r as *const T as *const u8
    }

    #[test]
    fn wrapping_is_idempotent() {
        let data = [1u8, 2, 3];
        let in_memory = RawSource::boxed(&data[..]);
        let ptr = addr(&*in_memory);
        let wrapped = SafeSource::wrap(in_memory);
        assert_eq!(addr(&*wrapped), ptr);

        let once = SafeSource::wrap(RawSource::boxed(framed(10)));
        let ptr = addr(&*once);
        let twice = SafeSource::wrap(once);
        assert_eq!(addr(&*twice), ptr);

        let strict = StrictSource::wrap(RawSource::boxed(&data[..]));
        let ptr = addr(&*strict);
        let again = StrictSource::wrap(strict);
        assert_eq!(addr(&*again), ptr);
    }
}
