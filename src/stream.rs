//! Layered byte sinks and sources.
//!
//! Filters stack new layers on top of a caller's stream. Every layer is boxed
//! as a [`BoxSink`] or [`BoxSource`] so stacks of arbitrary depth can be built
//! at runtime. Only the handle that owns the full stack ever closes it.

use std::fmt;
use std::io::{self, Read, Write};

/// Generic-erased name of a stream's runtime type.
///
/// `StreamType::of::<Cursor<Vec<u8>>>()` and `StreamType::of::<Cursor<&[u8]>>()`
/// compare equal: type parameters are dropped so one entry matches a whole
/// family of streams.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamType(&'static str);

impl StreamType {
    pub fn of<T: ?Sized>() -> Self {
        let name = std::any::type_name::<T>();
        let base = match name.find('<') {
            Some(idx) => &name[..idx],
            None => name,
        };
        Self(base)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamType({})", self.0)
    }
}

/// A byte sink layer.
///
/// `close` finishes this layer (writing any trailer it owes), then closes the
/// layers beneath it. Wrapping layers must never close their inner stream
/// outside of `close`.
pub trait Sink: Write {
    /// Flushes pending output and releases this layer and everything below it.
    fn close(self: Box<Self>) -> io::Result<()>;

    fn stream_type(&self) -> StreamType {
        StreamType::of::<Self>()
    }
}

/// A byte source layer.
pub trait Source: Read {
    fn stream_type(&self) -> StreamType {
        StreamType::of::<Self>()
    }
}

pub type BoxSink<'a> = Box<dyn Sink + 'a>;
pub type BoxSource<'a> = Box<dyn Source + 'a>;

/// Adapts a caller-supplied writer into the bottom layer of a sink stack.
///
/// Reports the type of the wrapped writer so buffering exclusions see the
/// physical stream.
pub struct RawSink<W: Write> {
    inner: W,
}

impl<W: Write> RawSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn boxed<'a>(inner: W) -> BoxSink<'a>
    where
        W: 'a,
    {
        Box::new(Self::new(inner))
    }
}

impl<W: Write> Write for RawSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Sink for RawSink<W> {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        // The writer itself is released when dropped.
        self.inner.flush()
    }

    fn stream_type(&self) -> StreamType {
        StreamType::of::<W>()
    }
}

/// Adapts a caller-supplied reader into the bottom layer of a source stack.
pub struct RawSource<R: Read> {
    inner: R,
}

impl<R: Read> RawSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn boxed<'a>(inner: R) -> BoxSource<'a>
    where
        R: 'a,
    {
        Box::new(Self::new(inner))
    }
}

impl<R: Read> Read for RawSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> Source for RawSource<R> {
    fn stream_type(&self) -> StreamType {
        StreamType::of::<R>()
    }
}
