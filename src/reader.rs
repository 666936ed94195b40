//! The decoding handle produced by a codec.

use crate::error::{Error, Result};
use crate::safe::SafeSource;
use crate::stream::BoxSource;
use crate::traits::ValueEncoder;
use log::trace;
use std::io::{self, Read};
use std::sync::Arc;

/// A reader for streaming decoded values.
///
/// The reader owns the full source stack and decodes one value per call. It
/// provides three APIs:
///
/// 1. **Single value** (`read()`, `try_read()`): one value at a time, with
///    `try_read` reporting a clean end of stream as `None`
/// 2. **Processor API** (`process_all()`): drains the stream through a closure
/// 3. **Iterator API** (`values()`): a borrowing iterator over the remaining values
///
/// ```rust
/// # use streamcodec::{Codec, Filter, Text};
/// let codec = Codec::builder(Text::utf8()).filter(Filter::deflate()).build();
/// let mut bytes = Vec::new();
/// {
///     let mut writer = codec.wrap_writer(&mut bytes)?;
///     writer.write(&"one".to_string())?;
///     writer.write(&"two".to_string())?;
///     writer.close()?;
/// }
///
/// let mut reader = codec.wrap_reader(&bytes[..])?;
/// let mut seen = Vec::new();
/// reader.process_all(|value| {
///     seen.push(value);
///     Ok(())
/// })?;
/// assert_eq!(seen, ["one", "two"]);
/// # Ok::<(), streamcodec::Error>(())
/// ```
pub struct CodecReader<'a, E: ValueEncoder> {
    source: Option<BoxSource<'a>>,
    encoder: Arc<E>,
    // A byte taken by `try_read` to look for the end of stream.
    peeked: Option<u8>,
}

impl<'a, E: ValueEncoder> CodecReader<'a, E> {
    pub(crate) fn new(source: BoxSource<'a>, encoder: Arc<E>) -> Self {
        trace!("opened reader over {}", source.stream_type().name());
        Self {
            source: Some(source),
            encoder,
            peeked: None,
        }
    }

    /// Decodes the next value.
    ///
    /// Fails with `Error::UnexpectedEof` when the stream holds no further value.
    pub fn read(&mut self) -> Result<E::Value> {
        let source = self.source.as_mut().ok_or_else(closed)?;
        match self.peeked.take() {
            None => self.encoder.read(source),
            Some(byte) => {
                // `Chain` comes up short at the seam, so refill across it.
                let first = [byte];
                let mut joined = SafeSource::new((&first[..]).chain(source));
                let value = self.encoder.read(&mut joined);
                let (rest, _) = joined.into_inner().into_inner();
                if let Some(&unread) = rest.first() {
                    self.peeked = Some(unread);
                }
                value
            }
        }
    }

    /// Decodes the next value, or returns `None` at a clean end of stream.
    ///
    /// A stream that ends part way through a value is still an error.
    pub fn try_read(&mut self) -> Result<Option<E::Value>> {
        if self.peeked.is_none() {
            let source = self.source.as_mut().ok_or_else(closed)?;
            let mut byte = [0u8; 1];
            let read = loop {
                match source.read(&mut byte) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e.into()),
                }
            };
            if read == 0 {
                return Ok(None);
            }
            self.peeked = Some(byte[0]);
        }
        self.read().map(Some)
    }

    /// Processes every remaining value with a closure.
    ///
    /// Stops at the first error, whether from decoding or from `processor`.
    pub fn process_all<F>(&mut self, mut processor: F) -> Result<()>
    where
        F: FnMut(E::Value) -> Result<()>,
    {
        while let Some(value) = self.try_read()? {
            processor(value)?;
        }
        Ok(())
    }

    /// Returns an iterator over the remaining values.
    pub fn values(&mut self) -> Values<'_, 'a, E> {
        Values {
            reader: self,
            failed: false,
        }
    }

    /// Decodes a single value and closes the reader.
    pub fn read_and_close(mut self) -> Result<E::Value> {
        let value = self.read();
        self.close();
        value
    }

    /// Releases the source stack. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(source) = self.source.take() {
            trace!("closing reader over {}", source.stream_type().name());
        }
        self.peeked = None;
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }
}

impl<E: ValueEncoder> Drop for CodecReader<'_, E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Iterator over the values left in a [`CodecReader`].
///
/// Ends at a clean end of stream; a decoding error is yielded once and ends
/// the iteration.
pub struct Values<'r, 'a, E: ValueEncoder> {
    reader: &'r mut CodecReader<'a, E>,
    failed: bool,
}

impl<E: ValueEncoder> Iterator for Values<'_, '_, E> {
    type Item = Result<E::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.try_read() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn closed() -> Error {
    Error::illegal_state("reader is closed")
}
