//! Codecs: a value encoder bound to a filter pipeline and a buffering policy.

use crate::buffer::BufferSpec;
use crate::error::Result;
use crate::filter::Filter;
use crate::reader::CodecReader;
use crate::safe::SafeSource;
use crate::stream::{BoxSink, BoxSource, RawSink, RawSource};
use crate::traits::ValueEncoder;
use crate::writer::CodecWriter;
use log::debug;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// An immutable description of how values of one type travel over a stream.
///
/// Writing runs `encoder -> filter -> buffer -> caller's stream`; reading runs
/// the same path backwards. A codec holds no stream state, so one codec can
/// open any number of writers and readers, from any number of threads.
///
/// ```rust
/// # use streamcodec::{BufferSpec, Codec, Filter, RawBytes};
/// let codec = Codec::builder(RawBytes)
///     .filter(Filter::lz4())
///     .filter(Filter::base64())
///     .buffer(BufferSpec::with_sizes(4096, 4096))
///     .build();
///
/// let bytes = codec.encode(&b"hello".to_vec())?;
/// assert!(bytes.iter().all(u8::is_ascii_graphic));
/// assert_eq!(codec.decode(&bytes)?, b"hello");
/// # Ok::<(), streamcodec::Error>(())
/// ```
pub struct Codec<E: ValueEncoder> {
    encoder: Arc<E>,
    filter: Filter,
    buffer: BufferSpec,
    // `filter` followed by the buffering layer, nearest the caller's stream.
    pipeline: Filter,
}

impl<E: ValueEncoder> Codec<E> {
    pub fn build(encoder: E, filter: Filter, buffer: BufferSpec) -> Self {
        let pipeline = filter.clone().chain(Filter::from(buffer.clone()));
        debug!(
            "built codec for {} with filter {:?}",
            std::any::type_name::<E>(),
            filter
        );
        Self {
            encoder: Arc::new(encoder),
            filter,
            buffer,
            pipeline,
        }
    }

    /// Starts a builder with no filter and default buffering.
    pub fn builder(encoder: E) -> CodecBuilder<E> {
        CodecBuilder::new(encoder)
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn buffer(&self) -> &BufferSpec {
        &self.buffer
    }

    /// Opens a writer over a caller-supplied stream.
    ///
    /// Closing the writer finishes every filter layer and flushes the stream,
    /// but `out` itself is only dropped.
    pub fn wrap_writer<'a, W: Write + 'a>(&self, out: W) -> Result<CodecWriter<'a, E>> {
        self.wrap_sink(RawSink::boxed(out))
    }

    /// Opens a writer over an existing sink stack.
    pub fn wrap_sink<'a>(&self, sink: BoxSink<'a>) -> Result<CodecWriter<'a, E>> {
        let sink = self.pipeline.wrap_output(sink)?;
        Ok(CodecWriter::new(sink, Arc::clone(&self.encoder)))
    }

    /// Opens a reader over a caller-supplied stream.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, input: R) -> Result<CodecReader<'a, E>> {
        self.wrap_source(RawSource::boxed(input))
    }

    /// Opens a reader over an existing source stack.
    ///
    /// The top of the stack is made complete-reading so encoders never see
    /// short reads from decompressors or decoders.
    pub fn wrap_source<'a>(&self, source: BoxSource<'a>) -> Result<CodecReader<'a, E>> {
        let source = SafeSource::wrap(self.pipeline.wrap_input(source)?);
        Ok(CodecReader::new(source, Arc::clone(&self.encoder)))
    }

    /// Encodes a single value into a fresh byte vector, trailers included.
    pub fn encode(&self, value: &E::Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.wrap_writer(&mut out)?.write_and_close(value)?;
        Ok(out)
    }

    /// Decodes the first value of `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> Result<E::Value> {
        self.wrap_reader(bytes)?.read_and_close()
    }

    /// Encodes a single value onto `out` and finishes the filter layers.
    pub fn encode_to<W: Write>(&self, value: &E::Value, out: W) -> Result<()> {
        self.wrap_writer(out)?.write_and_close(value)
    }

    /// Decodes a single value from `input`.
    pub fn decode_from<R: Read>(&self, input: R) -> Result<E::Value> {
        self.wrap_reader(input)?.read_and_close()
    }
}

impl<E: ValueEncoder> Clone for Codec<E> {
    fn clone(&self) -> Self {
        Self {
            encoder: Arc::clone(&self.encoder),
            filter: self.filter.clone(),
            buffer: self.buffer.clone(),
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<E: ValueEncoder> fmt::Debug for Codec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("encoder", &std::any::type_name::<E>())
            .field("filter", &self.filter)
            .field("buffer", &self.buffer)
            .finish()
    }
}

/// Incremental construction of a [`Codec`].
pub struct CodecBuilder<E: ValueEncoder> {
    encoder: E,
    filter: Filter,
    buffer: BufferSpec,
}

impl<E: ValueEncoder> CodecBuilder<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            filter: Filter::identity(),
            buffer: BufferSpec::default(),
        }
    }

    /// Appends a filter. Earlier filters sit closer to the encoder.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.chain(filter);
        self
    }

    /// Appends each filter in order.
    pub fn filter_chain<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        self.filter = self.filter.chain(Filter::chain_all(filters));
        self
    }

    pub fn buffer(mut self, buffer: BufferSpec) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn no_buffer(self) -> Self {
        self.buffer(BufferSpec::none())
    }

    pub fn build(self) -> Codec<E> {
        Codec::build(self.encoder, self.filter, self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoders::{RawBytes, Text};
    #[cfg(feature = "deflate")]
    use crate::encoders::ChunkedBytes;
    #[cfg(any(feature = "deflate", feature = "aes"))]
    use crate::error::Error;

    #[test]
    fn plain_codec_writes_encoder_bytes() {
        let codec = Codec::builder(RawBytes).build();
        assert_eq!(codec.encode(&vec![7, 8]).unwrap(), [2, 7, 8]);
        assert_eq!(codec.decode(&[2, 7, 8]).unwrap(), [7, 8]);
    }

    #[test]
    fn clones_share_the_encoder() {
        let codec = Codec::builder(Text::utf8()).build();
        let other = codec.clone();
        assert!(std::ptr::eq(codec.encoder(), other.encoder()));
        assert_eq!(codec.filter(), other.filter());
    }

    #[cfg(all(feature = "deflate", feature = "base64"))]
    #[test]
    fn builder_chains_filters_in_order() {
        let codec = Codec::builder(RawBytes)
            .filter(Filter::deflate())
            .filter_chain([Filter::identity(), Filter::base64()])
            .no_buffer()
            .build();
        assert_eq!(
            codec.filter(),
            &Filter::deflate().chain(Filter::base64())
        );
        assert!(codec.buffer().is_disabled());
    }

    #[cfg(all(feature = "deflate", feature = "base64"))]
    #[test]
    fn filtered_round_trip() {
        let codec = Codec::builder(Text::utf8())
            .filter(Filter::gzip())
            .filter(Filter::base64_url())
            .build();
        let value = "the quick brown fox ".repeat(20);
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn many_values_through_one_stream() {
        let codec = Codec::builder(Text::utf8())
            .filter(Filter::lz4())
            .buffer(BufferSpec::with_sizes(64, 64))
            .build();
        let mut out = Vec::new();
        let mut writer = codec.wrap_writer(&mut out).unwrap();
        for i in 0..100 {
            writer.write(&format!("value {i}")).unwrap();
        }
        writer.close().unwrap();
        drop(writer);

        let mut reader = codec.wrap_reader(&out[..]).unwrap();
        for i in 0..100 {
            assert_eq!(reader.read().unwrap(), format!("value {i}"));
        }
        assert!(reader.try_read().unwrap().is_none());
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn chunked_reads_are_complete_through_decompression() {
        let codec = Codec::builder(ChunkedBytes::strict(128).unwrap())
            .filter(Filter::deflate())
            .build();
        let chunk: Vec<u8> = (0..128u8).collect();
        let mut out = Vec::new();
        let mut writer = codec.wrap_writer(&mut out).unwrap();
        writer.write(&chunk).unwrap();
        writer.write(&chunk).unwrap();
        writer.close().unwrap();
        drop(writer);

        let mut reader = codec.wrap_reader(&out[..]).unwrap();
        assert_eq!(reader.read().unwrap(), chunk);
        assert_eq!(reader.read().unwrap(), chunk);
        assert!(matches!(reader.read(), Err(Error::UnexpectedEof)));
    }

    #[cfg(feature = "aes")]
    #[test]
    fn encrypted_codec_rejects_other_key() {
        let codec = Codec::builder(RawBytes)
            .filter(Filter::aes(&[1u8; 16]).unwrap())
            .build();
        let bytes = codec.encode(&b"secret".to_vec()).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), b"secret");

        let other = Codec::builder(RawBytes)
            .filter(Filter::aes(&[2u8; 16]).unwrap())
            .build();
        assert!(matches!(other.decode(&bytes), Err(Error::Malformed { .. })));
    }
}
