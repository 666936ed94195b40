//! I/O buffering as a filter.
//!
//! A [`BufferSpec`] wraps streams in `BufWriter`/`BufReader` layers, except
//! streams whose runtime type is listed in its exclusion sets. Streams that are
//! already buffered or live in memory are excluded by default, so a codec never
//! double-buffers them.

use crate::error::{Error, Result};
use crate::stream::{BoxSink, BoxSource, Sink, Source, StreamType};
use log::debug;
use std::collections::{HashSet, VecDeque};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};

pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Input and output buffer sizes plus the stream types never to buffer.
///
/// A size of `0` disables buffering in that direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSpec {
    input_size: usize,
    output_size: usize,
    input_exclusions: HashSet<StreamType>,
    output_exclusions: HashSet<StreamType>,
}

impl Default for BufferSpec {
    fn default() -> Self {
        Self::with_sizes(DEFAULT_BUFFER_SIZE, DEFAULT_BUFFER_SIZE)
    }
}

impl BufferSpec {
    /// Buffers in neither direction.
    pub fn none() -> Self {
        Self {
            input_size: 0,
            output_size: 0,
            input_exclusions: HashSet::new(),
            output_exclusions: HashSet::new(),
        }
    }

    pub fn with_sizes(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            input_exclusions: if input_size > 0 {
                default_input_exclusions()
            } else {
                HashSet::new()
            },
            output_exclusions: if output_size > 0 {
                default_output_exclusions()
            } else {
                HashSet::new()
            },
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.input_size == 0 && self.output_size == 0
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn input_exclusions(&self) -> &HashSet<StreamType> {
        &self.input_exclusions
    }

    pub fn output_exclusions(&self) -> &HashSet<StreamType> {
        &self.output_exclusions
    }

    /// Replaces the output exclusion set.
    pub fn with_output_exclusions<I>(mut self, types: I) -> Result<Self>
    where
        I: IntoIterator<Item = StreamType>,
    {
        self.check_output("exclusions")?;
        self.output_exclusions = types.into_iter().collect();
        Ok(self)
    }

    /// Replaces the input exclusion set.
    pub fn with_input_exclusions<I>(mut self, types: I) -> Result<Self>
    where
        I: IntoIterator<Item = StreamType>,
    {
        self.check_input("exclusions")?;
        self.input_exclusions = types.into_iter().collect();
        Ok(self)
    }

    /// Extends the output exclusion set.
    pub fn add_output_exclusions<I>(mut self, types: I) -> Result<Self>
    where
        I: IntoIterator<Item = StreamType>,
    {
        self.check_output("exclusions")?;
        self.output_exclusions.extend(types);
        Ok(self)
    }

    /// Extends the input exclusion set.
    pub fn add_input_exclusions<I>(mut self, types: I) -> Result<Self>
    where
        I: IntoIterator<Item = StreamType>,
    {
        self.check_input("exclusions")?;
        self.input_exclusions.extend(types);
        Ok(self)
    }

    fn check_output(&self, what: &str) -> Result<()> {
        if self.output_size == 0 {
            return Err(Error::illegal_state(format!(
                "output buffering is disabled, cannot set output {what}"
            )));
        }
        Ok(())
    }

    fn check_input(&self, what: &str) -> Result<()> {
        if self.input_size == 0 {
            return Err(Error::illegal_state(format!(
                "input buffering is disabled, cannot set input {what}"
            )));
        }
        Ok(())
    }

    pub fn wrap_output<'a>(&self, sink: BoxSink<'a>) -> BoxSink<'a> {
        let kind = sink.stream_type();
        if self.output_size == 0 || self.output_exclusions.contains(&kind) {
            return sink;
        }
        debug!(
            "buffering output stream {} with {} bytes",
            kind.name(),
            self.output_size
        );
        Box::new(BufferedSink::new(self.output_size, sink))
    }

    pub fn wrap_input<'a>(&self, source: BoxSource<'a>) -> BoxSource<'a> {
        let kind = source.stream_type();
        if self.input_size == 0 || self.input_exclusions.contains(&kind) {
            return source;
        }
        debug!(
            "buffering input stream {} with {} bytes",
            kind.name(),
            self.input_size
        );
        Box::new(BufferedSource::new(self.input_size, source))
    }
}

fn default_output_exclusions() -> HashSet<StreamType> {
    [
        StreamType::of::<Vec<u8>>(),
        StreamType::of::<&mut Vec<u8>>(),
        StreamType::of::<Cursor<Vec<u8>>>(),
        StreamType::of::<VecDeque<u8>>(),
        StreamType::of::<BufWriter<Vec<u8>>>(),
        StreamType::of::<BufferedSink<'static>>(),
    ]
    .into_iter()
    .collect()
}

fn default_input_exclusions() -> HashSet<StreamType> {
    [
        StreamType::of::<&[u8]>(),
        StreamType::of::<Cursor<Vec<u8>>>(),
        StreamType::of::<VecDeque<u8>>(),
        StreamType::of::<BufReader<&[u8]>>(),
        StreamType::of::<BufferedSource<'static>>(),
    ]
    .into_iter()
    .collect()
}

/// Output buffer layer.
pub struct BufferedSink<'a> {
    inner: BufWriter<BoxSink<'a>>,
}

impl<'a> BufferedSink<'a> {
    pub fn new(capacity: usize, inner: BoxSink<'a>) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, inner),
        }
    }
}

impl Write for BufferedSink<'_> {
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

impl Sink for BufferedSink<'_> {
    fn close(self: Box<Self>) -> io::Result<()> {
        let inner = self.inner.into_inner().map_err(|e| e.into_error())?;
        inner.close()
    }
}

/// Input buffer layer.
pub struct BufferedSource<'a> {
    inner: BufReader<BoxSource<'a>>,
}

impl<'a> BufferedSource<'a> {
    pub fn new(capacity: usize, inner: BoxSource<'a>) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, inner),
        }
    }
}

impl Read for BufferedSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Source for BufferedSource<'_> {}
