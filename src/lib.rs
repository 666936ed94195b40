//! # StreamCodec
//!
//! Composable codecs for streaming typed values over byte streams.
//!
//! ## Overview
//!
//! `streamcodec` separates *what* a value looks like on the wire from *how* the
//! wire is transformed. A [`ValueEncoder`] turns one value into bytes and back;
//! a [`Filter`] wraps the underlying stream with compression, text-safe encoding
//! or encryption; a [`BufferSpec`] decides whether the physical stream gets a
//! buffer. A [`Codec`] binds the three together and opens [`CodecWriter`] and
//! [`CodecReader`] handles over any `Write` or `Read`.
//!
//! ## Key Features
//!
//! * **Typed encoders**: length-prefixed byte arrays, fixed-size chunks, text in
//!   several character encodings, and structured records through
//!   [`StateWriter`](state::StateWriter) / [`StateReader`](state::StateReader)
//! * **Composable filters**: DEFLATE/zlib/gzip, LZ4, Base64 and AES-GCM, chained
//!   in any order with [`Filter::chain`]
//! * **Complete reads**: decoders never see the short reads decompressors produce
//! * **Scoped handles**: closing a writer finishes every layer exactly once,
//!   and dropping one closes it
//!
//! ## Quick Start
//!
//! ```rust
//! use streamcodec::{Codec, Filter, StateEncoder};
//!
//! #[derive(Debug, PartialEq)]
//! struct Reading {
//!     sensor: String,
//!     value: f64,
//! }
//!
//! fn main() -> streamcodec::Result<()> {
//!     let encoder = StateEncoder::new(
//!         |w, r: &Reading| w.put_str(&r.sensor)?.put_f64(r.value),
//!         |r| {
//!             Ok(Reading {
//!                 sensor: r.get_string()?,
//!                 value: r.get_f64()?,
//!             })
//!         },
//!     );
//!     let codec = Codec::builder(encoder).filter(Filter::gzip()).build();
//!
//!     let mut bytes = Vec::new();
//!     {
//!         let mut writer = codec.wrap_writer(&mut bytes)?;
//!         writer.write(&Reading { sensor: "t1".into(), value: 20.5 })?;
//!         writer.write(&Reading { sensor: "t2".into(), value: 19.0 })?;
//!         writer.close()?;
//!     }
//!
//!     let mut reader = codec.wrap_reader(&bytes[..])?;
//!     while let Some(reading) = reader.try_read()? {
//!         println!("{}: {}", reading.sensor, reading.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Writing runs `encoder -> filter chain -> buffer -> stream`:
//!
//! * **`ValueEncoder`**: stateless conversion of one value type
//! * **`Filter`**: wraps a [`Sink`](stream::Sink) or [`Source`](stream::Source)
//!   layer; `identity()` is neutral and chains flatten
//! * **`Codec`**: immutable and shareable; each handle owns its own layer stack

pub mod buffer;
pub mod codec;
#[cfg(any(feature = "deflate", feature = "lz4"))]
pub mod compress;
#[cfg(feature = "aes")]
pub mod crypto;
pub mod encoders;
#[cfg(feature = "base64")]
pub mod encoding;
pub mod error;
pub mod filter;
pub mod reader;
pub mod safe;
pub mod state;
pub mod stream;
pub mod traits;
pub mod varint;
pub mod writer;

// Re-export the main public API for user convenience.
pub use buffer::BufferSpec;
pub use codec::{Codec, CodecBuilder};
pub use encoders::{ChunkedBytes, RawBytes, StateEncoder, Text, TextEncoding};
pub use error::{Error, Result};
pub use filter::Filter;
pub use reader::{CodecReader, Values};
pub use safe::{SafeSource, StrictSource};
pub use stream::{BoxSink, BoxSource, RawSink, RawSource, Sink, Source, StreamType};
pub use traits::{Adapted, ValueEncoder, ValueEncoderExt};
pub use writer::CodecWriter;

#[cfg(feature = "serde")]
pub use encoders::SerdeEncoder;
