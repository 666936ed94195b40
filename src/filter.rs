//! Bidirectional stream transforms and their composition.
//!
//! A [`Filter`] wraps a sink in a new layer on the way out and a source in the
//! matching layer on the way in. Filters never close what they wrap; only the
//! handle owning the finished stack does.
//!
//! # Chaining
//!
//! `Filter::chain_all([f1, f2, f3])` wraps a sink as
//! `f1.wrap_output(f2.wrap_output(f3.wrap_output(sink)))`: `f3` is constructed
//! first, closest to the raw stream, while writes pass through `f1` first. The
//! input side nests identically, so reads are undone in the matching order.
//! [`Filter::identity`] is the neutral element on either side of a chain.

use crate::buffer::BufferSpec;
use crate::error::Result;
use crate::stream::{BoxSink, BoxSource};
use log::debug;
use std::fmt;
use std::sync::Arc;

#[cfg(any(feature = "deflate", feature = "lz4"))]
use crate::compress::Compressor;
#[cfg(feature = "aes")]
use crate::crypto::AesFilter;
#[cfg(feature = "base64")]
use crate::encoding::Base64Alphabet;

type WrapOutputFn = dyn for<'a> Fn(BoxSink<'a>) -> Result<BoxSink<'a>> + Send + Sync;
type WrapInputFn = dyn for<'a> Fn(BoxSource<'a>) -> Result<BoxSource<'a>> + Send + Sync;

/// A filter built from a pair of wrap functions.
///
/// Two custom filters are equal only when they share the same function objects.
#[derive(Clone)]
pub struct CustomFilter {
    output: Arc<WrapOutputFn>,
    input: Arc<WrapInputFn>,
}

impl PartialEq for CustomFilter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.output, &other.output) && Arc::ptr_eq(&self.input, &other.input)
    }
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomFilter")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    #[default]
    Identity,
    #[cfg(any(feature = "deflate", feature = "lz4"))]
    Compress(Compressor),
    #[cfg(feature = "base64")]
    Base64(Base64Alphabet),
    #[cfg(feature = "aes")]
    Aes(AesFilter),
    Buffer(BufferSpec),
    Custom(CustomFilter),
    /// Flattened, identity-free sequence of at least two filters.
    Chain(Arc<[Filter]>),
}

impl Filter {
    pub fn identity() -> Self {
        Filter::Identity
    }

    /// Builds a filter from its output and input wrap functions.
    pub fn of<O, I>(output: O, input: I) -> Self
    where
        O: for<'a> Fn(BoxSink<'a>) -> Result<BoxSink<'a>> + Send + Sync + 'static,
        I: for<'a> Fn(BoxSource<'a>) -> Result<BoxSource<'a>> + Send + Sync + 'static,
    {
        Filter::Custom(CustomFilter {
            output: Arc::new(output),
            input: Arc::new(input),
        })
    }

    #[cfg(feature = "deflate")]
    pub fn deflate() -> Self {
        Filter::Compress(Compressor::Deflate(crate::compress::Compression::default()))
    }

    #[cfg(feature = "deflate")]
    pub fn deflate_with_level(level: u32) -> Result<Self> {
        Ok(Filter::Compress(Compressor::Deflate(compression_level(level)?)))
    }

    #[cfg(feature = "deflate")]
    pub fn zlib() -> Self {
        Filter::Compress(Compressor::Zlib(crate::compress::Compression::default()))
    }

    #[cfg(feature = "deflate")]
    pub fn zlib_with_level(level: u32) -> Result<Self> {
        Ok(Filter::Compress(Compressor::Zlib(compression_level(level)?)))
    }

    #[cfg(feature = "deflate")]
    pub fn gzip() -> Self {
        Filter::Compress(Compressor::Gzip(crate::compress::Compression::default()))
    }

    #[cfg(feature = "deflate")]
    pub fn gzip_with_level(level: u32) -> Result<Self> {
        Ok(Filter::Compress(Compressor::Gzip(compression_level(level)?)))
    }

    #[cfg(feature = "lz4")]
    pub fn lz4() -> Self {
        Filter::Compress(Compressor::Lz4)
    }

    #[cfg(feature = "base64")]
    pub fn base64() -> Self {
        Filter::Base64(Base64Alphabet::Standard)
    }

    #[cfg(feature = "base64")]
    pub fn base64_url() -> Self {
        Filter::Base64(Base64Alphabet::UrlSafe)
    }

    /// Standard Base64 in CRLF-separated lines of 76 characters.
    #[cfg(feature = "base64")]
    pub fn base64_mime() -> Self {
        Filter::Base64(Base64Alphabet::Mime)
    }

    /// AES-128-GCM streaming encryption with a 16-byte key.
    #[cfg(feature = "aes")]
    pub fn aes(key: &[u8]) -> Result<Self> {
        Ok(Filter::Aes(AesFilter::new(key)?))
    }

    #[cfg(feature = "aes")]
    pub fn aes_random_key() -> Self {
        Filter::Aes(AesFilter::random())
    }

    /// True for filters that leave streams untouched.
    pub fn is_identity(&self) -> bool {
        match self {
            Filter::Identity => true,
            Filter::Buffer(spec) => spec.is_disabled(),
            _ => false,
        }
    }

    /// Composes `self` (outer) with `next` (inner).
    ///
    /// Identity operands are dropped and nested chains are flattened, so the
    /// result only depends on the order of the non-identity filters.
    pub fn chain(self, next: Filter) -> Filter {
        if self.is_identity() {
            return next;
        }
        if next.is_identity() {
            return self;
        }
        let mut parts = Vec::new();
        self.flatten_into(&mut parts);
        next.flatten_into(&mut parts);
        Filter::Chain(parts.into())
    }

    /// Left-to-right reduction of `filters` with [`Filter::chain`].
    pub fn chain_all<I>(filters: I) -> Filter
    where
        I: IntoIterator<Item = Filter>,
    {
        filters.into_iter().fold(Filter::Identity, Filter::chain)
    }

    fn flatten_into(self, parts: &mut Vec<Filter>) {
        match self {
            Filter::Chain(inner) => parts.extend(inner.iter().cloned()),
            other => parts.push(other),
        }
    }

    pub fn wrap_output<'a>(&self, sink: BoxSink<'a>) -> Result<BoxSink<'a>> {
        match self {
            Filter::Identity => Ok(sink),
            #[cfg(any(feature = "deflate", feature = "lz4"))]
            Filter::Compress(compressor) => {
                debug!("compressing output stream with {compressor:?}");
                Ok(compressor.wrap_output(sink))
            }
            #[cfg(feature = "base64")]
            Filter::Base64(alphabet) => {
                debug!("encoding output stream as {alphabet:?} base64");
                Ok(alphabet.wrap_output(sink))
            }
            #[cfg(feature = "aes")]
            Filter::Aes(aes) => aes.wrap_output(sink),
            Filter::Buffer(spec) => Ok(spec.wrap_output(sink)),
            Filter::Custom(custom) => (custom.output)(sink),
            Filter::Chain(parts) => parts
                .iter()
                .rev()
                .try_fold(sink, |sink, filter| filter.wrap_output(sink)),
        }
    }

    pub fn wrap_input<'a>(&self, source: BoxSource<'a>) -> Result<BoxSource<'a>> {
        match self {
            Filter::Identity => Ok(source),
            #[cfg(any(feature = "deflate", feature = "lz4"))]
            Filter::Compress(compressor) => {
                debug!("decompressing input stream with {compressor:?}");
                Ok(compressor.wrap_input(source))
            }
            #[cfg(feature = "base64")]
            Filter::Base64(alphabet) => {
                debug!("decoding input stream as {alphabet:?} base64");
                Ok(alphabet.wrap_input(source))
            }
            #[cfg(feature = "aes")]
            Filter::Aes(aes) => aes.wrap_input(source),
            Filter::Buffer(spec) => Ok(spec.wrap_input(source)),
            Filter::Custom(custom) => (custom.input)(source),
            Filter::Chain(parts) => parts
                .iter()
                .rev()
                .try_fold(source, |source, filter| filter.wrap_input(source)),
        }
    }
}

impl From<BufferSpec> for Filter {
    fn from(spec: BufferSpec) -> Self {
        if spec.is_disabled() {
            Filter::Identity
        } else {
            Filter::Buffer(spec)
        }
    }
}

#[cfg(feature = "deflate")]
fn compression_level(level: u32) -> Result<crate::compress::Compression> {
    if level > 9 {
        return Err(crate::error::Error::invalid_argument(format!(
            "compression level {level} is outside 0..=9"
        )));
    }
    Ok(crate::compress::Compression::new(level))
}
