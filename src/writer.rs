//! The encoding handle produced by a codec.

use crate::error::{Error, Result};
use crate::stream::BoxSink;
use crate::traits::ValueEncoder;
use log::{trace, warn};
use std::sync::Arc;

/// A writer for streaming encoded values.
///
/// The writer owns the full sink stack: every filter layer plus the caller's
/// stream. It provides three levels of API:
/// 1. `write()` - Encode a value into the filtered stream
/// 2. `write_and_flush()` - Encode a value and push it through every layer
/// 3. `write_and_close()` - Encode a final value and release the stream
///
/// Closing flushes and finishes each layer (compression trailers, the final
/// encrypted segment) exactly once. A writer dropped while open is closed on
/// drop, with any error logged rather than returned.
pub struct CodecWriter<'a, E: ValueEncoder> {
    sink: Option<BoxSink<'a>>,
    encoder: Arc<E>,
}

impl<'a, E: ValueEncoder> CodecWriter<'a, E> {
    pub(crate) fn new(sink: BoxSink<'a>, encoder: Arc<E>) -> Self {
        trace!("opened writer over {}", sink.stream_type().name());
        Self {
            sink: Some(sink),
            encoder,
        }
    }

    /// Encodes one value into the stream.
    pub fn write(&mut self, value: &E::Value) -> Result<()> {
        let sink = self.sink.as_mut().ok_or_else(closed)?;
        self.encoder.write(value, sink)
    }

    /// Encodes one value and flushes every layer down to the caller's stream.
    pub fn write_and_flush(&mut self, value: &E::Value) -> Result<()> {
        self.write(value)?;
        self.flush()
    }

    /// Encodes a final value and closes the writer.
    ///
    /// The stream is closed even when encoding fails; the encoding error wins.
    pub fn write_and_close(mut self, value: &E::Value) -> Result<()> {
        let written = self.write(value);
        let closed = self.close();
        written.and(closed)
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        let sink = self.sink.as_mut().ok_or_else(closed)?;
        sink.flush()?;
        Ok(())
    }

    /// Finishes every layer and releases the stream. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.sink.take() {
            Some(sink) => {
                trace!("closing writer over {}", sink.stream_type().name());
                sink.close()?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }
}

impl<E: ValueEncoder> Drop for CodecWriter<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close writer on drop: {e}");
        }
    }
}

fn closed() -> Error {
    Error::illegal_state("writer is closed")
}
