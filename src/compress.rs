//! Compression filters.
//!
//! Encoders compress on the way out and decoders inflate on the way in. Flushing
//! an encoder emits a sync-flush point; closing it writes the stream trailer
//! before closing the layers below.

use crate::stream::{BoxSink, BoxSource, Sink, Source};
use std::io;

#[cfg(feature = "deflate")]
pub use flate2::Compression;

/// A compression format and, where it has one, its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    /// Raw DEFLATE (RFC 1951).
    #[cfg(feature = "deflate")]
    Deflate(Compression),
    /// zlib (RFC 1950).
    #[cfg(feature = "deflate")]
    Zlib(Compression),
    /// gzip (RFC 1952).
    #[cfg(feature = "deflate")]
    Gzip(Compression),
    /// LZ4 frame format.
    #[cfg(feature = "lz4")]
    Lz4,
}

impl Compressor {
    pub fn wrap_output<'a>(&self, sink: BoxSink<'a>) -> BoxSink<'a> {
        match *self {
            #[cfg(feature = "deflate")]
            Compressor::Deflate(level) => Box::new(flate2::write::DeflateEncoder::new(sink, level)),
            #[cfg(feature = "deflate")]
            Compressor::Zlib(level) => Box::new(flate2::write::ZlibEncoder::new(sink, level)),
            #[cfg(feature = "deflate")]
            Compressor::Gzip(level) => Box::new(flate2::write::GzEncoder::new(sink, level)),
            #[cfg(feature = "lz4")]
            Compressor::Lz4 => Box::new(lz4_flex::frame::FrameEncoder::new(sink)),
        }
    }

    pub fn wrap_input<'a>(&self, source: BoxSource<'a>) -> BoxSource<'a> {
        match *self {
            #[cfg(feature = "deflate")]
            Compressor::Deflate(_) => Box::new(flate2::read::DeflateDecoder::new(source)),
            #[cfg(feature = "deflate")]
            Compressor::Zlib(_) => Box::new(flate2::read::ZlibDecoder::new(source)),
            #[cfg(feature = "deflate")]
            Compressor::Gzip(_) => Box::new(flate2::read::GzDecoder::new(source)),
            #[cfg(feature = "lz4")]
            Compressor::Lz4 => Box::new(lz4_flex::frame::FrameDecoder::new(source)),
        }
    }
}

#[cfg(feature = "deflate")]
impl<'a> Sink for flate2::write::DeflateEncoder<BoxSink<'a>> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.close()
    }
}

#[cfg(feature = "deflate")]
impl<'a> Sink for flate2::write::ZlibEncoder<BoxSink<'a>> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.close()
    }
}

#[cfg(feature = "deflate")]
impl<'a> Sink for flate2::write::GzEncoder<BoxSink<'a>> {
    fn close(self: Box<Self>) -> io::Result<()> {
        (*self).finish()?.close()
    }
}

#[cfg(feature = "deflate")]
impl<'a> Source for flate2::read::DeflateDecoder<BoxSource<'a>> {}

#[cfg(feature = "deflate")]
impl<'a> Source for flate2::read::ZlibDecoder<BoxSource<'a>> {}

#[cfg(feature = "deflate")]
impl<'a> Source for flate2::read::GzDecoder<BoxSource<'a>> {}

#[cfg(feature = "lz4")]
impl<'a> Sink for lz4_flex::frame::FrameEncoder<BoxSink<'a>> {
    fn close(self: Box<Self>) -> io::Result<()> {
        let inner = (*self)
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        inner.close()
    }
}

#[cfg(feature = "lz4")]
impl<'a> Source for lz4_flex::frame::FrameDecoder<BoxSource<'a>> {}
