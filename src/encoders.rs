//! The standard value encoders.
//!
//! | encoder          | value           | wire format                                   |
//! |------------------|-----------------|-----------------------------------------------|
//! | [`RawBytes`]     | `Vec<u8>`       | varint length, then the bytes                 |
//! | [`ChunkedBytes`] | `Vec<u8>`       | the bytes as-is, read back in fixed chunks    |
//! | [`Text`]         | `String`        | [`RawBytes`] of the character-encoded string  |
//! | [`StateEncoder`] | any `T`         | whatever its state callbacks put              |
//! | `SerdeEncoder`   | any serde `T`   | bincode (feature `serde`)                     |

use crate::error::{Error, Result};
use crate::safe::{SafeSource, StrictSource};
use crate::state::{StateReader, StateWriter};
use crate::traits::ValueEncoder;
use crate::varint;
use std::io::{Read, Write};

/// Length-prefixed byte arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawBytes;

impl ValueEncoder for RawBytes {
    type Value = Vec<u8>;

    fn write(&self, value: &Vec<u8>, out: &mut dyn Write) -> Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| {
            Error::invalid_argument(format!("byte array of {} bytes is too long", value.len()))
        })?;
        varint::write_u32(len, out)?;
        if !value.is_empty() {
            out.write_all(value)?;
        }
        Ok(())
    }

    fn read(&self, input: &mut dyn Read) -> Result<Vec<u8>> {
        let len = varint::read_u32(input)? as usize;
        if len == 0 {
            return Ok(Vec::new());
        }
        // Grow with the data rather than trusting the prefix for the allocation.
        let mut bytes = Vec::with_capacity(len.min(64 * 1024));
        input.take(len as u64).read_to_end(&mut bytes)?;
        if bytes.len() < len {
            return Err(Error::UnexpectedEof);
        }
        Ok(bytes)
    }
}

/// Byte arrays written bare and read back `size` bytes at a time.
///
/// Strict mode only accepts arrays of exactly `size` bytes and reads exactly
/// `size` bytes. Relaxed mode accepts any length on write; a read returns up to
/// `size` bytes, shorter only for the final chunk of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedBytes {
    size: usize,
    strict: bool,
}

impl ChunkedBytes {
    pub fn new(size: usize, strict: bool) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_argument("chunk size must be positive"));
        }
        Ok(Self { size, strict })
    }

    pub fn strict(size: usize) -> Result<Self> {
        Self::new(size, true)
    }

    pub fn relaxed(size: usize) -> Result<Self> {
        Self::new(size, false)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl ValueEncoder for ChunkedBytes {
    type Value = Vec<u8>;

    fn write(&self, value: &Vec<u8>, out: &mut dyn Write) -> Result<()> {
        if self.strict && value.len() != self.size {
            return Err(Error::invalid_argument(format!(
                "chunk of {} bytes does not match the strict chunk size {}",
                value.len(),
                self.size
            )));
        }
        out.write_all(value)?;
        Ok(())
    }

    fn read(&self, input: &mut dyn Read) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; self.size];
        if self.strict {
            StrictSource::new(input).read_full(&mut chunk)?;
        } else {
            let read = SafeSource::new(input).read_range(&mut chunk, 0, self.size)?;
            if read == 0 {
                return Err(Error::UnexpectedEof);
            }
            chunk.truncate(read);
        }
        Ok(chunk)
    }
}

/// Character encodings supported by [`Text`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Be,
    Utf16Le,
    /// US-ASCII. Characters outside the range encode as `?`.
    Ascii,
    /// ISO-8859-1. Characters above U+00FF encode as `?`.
    Latin1,
}

impl TextEncoding {
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            TextEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            TextEncoding::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }

    pub fn decode(&self, bytes: Vec<u8>) -> Result<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes)
                .map_err(|e| Error::malformed(format!("invalid UTF-8 text: {e}"))),
            TextEncoding::Utf16Be => decode_utf16(&bytes, u16::from_be_bytes),
            TextEncoding::Utf16Le => decode_utf16(&bytes, u16::from_le_bytes),
            TextEncoding::Ascii => Ok(bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii() {
                        b as char
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect()),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::malformed(format!(
            "UTF-16 text has an odd byte count {}",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| Error::malformed(format!("invalid UTF-16 text: {e}")))
}

/// Strings in a chosen character encoding, framed by [`RawBytes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Text {
    encoding: TextEncoding,
}

impl Text {
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    pub fn utf8() -> Self {
        Self::new(TextEncoding::Utf8)
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl ValueEncoder for Text {
    type Value = String;

    fn write(&self, value: &String, out: &mut dyn Write) -> Result<()> {
        RawBytes.write(&self.encoding.encode(value), out)
    }

    fn read(&self, input: &mut dyn Read) -> Result<String> {
        self.encoding.decode(RawBytes.read(input)?)
    }
}

type StateWriteFn<T> =
    Box<dyn for<'w> Fn(StateWriter<'w>, &T) -> Result<StateWriter<'w>> + Send + Sync>;
type StateReadFn<T> = Box<dyn Fn(&mut StateReader<'_>) -> Result<T> + Send + Sync>;

/// Structured values described by a pair of state callbacks.
///
/// ```rust
/// # use streamcodec::{StateEncoder, ValueEncoder};
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let points = StateEncoder::new(
///     |w, p: &Point| w.put_i32(p.x)?.put_i32(p.y),
///     |r| Ok(Point { x: r.get_i32()?, y: r.get_i32()? }),
/// );
///
/// let mut out = Vec::new();
/// points.write(&Point { x: 1, y: -1 }, &mut out)?;
/// let back = points.read(&mut &out[..])?;
/// assert_eq!((back.x, back.y), (1, -1));
/// # Ok::<(), streamcodec::Error>(())
/// ```
pub struct StateEncoder<T> {
    writer: StateWriteFn<T>,
    reader: StateReadFn<T>,
}

impl<T> StateEncoder<T> {
    pub fn new<W, R>(writer: W, reader: R) -> Self
    where
        W: for<'w> Fn(StateWriter<'w>, &T) -> Result<StateWriter<'w>> + Send + Sync + 'static,
        R: Fn(&mut StateReader<'_>) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            writer: Box::new(writer),
            reader: Box::new(reader),
        }
    }
}

impl<T> ValueEncoder for StateEncoder<T> {
    type Value = T;

    fn write(&self, value: &T, out: &mut dyn Write) -> Result<()> {
        (self.writer)(StateWriter::new(out), value)?;
        Ok(())
    }

    fn read(&self, input: &mut dyn Read) -> Result<T> {
        let mut reader = StateReader::new(input);
        (self.reader)(&mut reader)
    }
}

#[cfg(feature = "serde")]
pub use self::serde_encoder::SerdeEncoder;

#[cfg(feature = "serde")]
mod serde_encoder {
    use crate::error::Result;
    use crate::traits::ValueEncoder;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::io::{Read, Write};
    use std::marker::PhantomData;

    /// Whole object graphs through serde, encoded with bincode.
    pub struct SerdeEncoder<T> {
        _value: PhantomData<fn() -> T>,
    }

    impl<T> SerdeEncoder<T> {
        pub fn new() -> Self {
            Self {
                _value: PhantomData,
            }
        }
    }

    impl<T> Default for SerdeEncoder<T> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<T> Clone for SerdeEncoder<T> {
        fn clone(&self) -> Self {
            Self::new()
        }
    }

    impl<T: Serialize + DeserializeOwned> ValueEncoder for SerdeEncoder<T> {
        type Value = T;

        fn write(&self, value: &T, out: &mut dyn Write) -> Result<()> {
            bincode::serialize_into(out, value)?;
            Ok(())
        }

        fn read(&self, input: &mut dyn Read) -> Result<T> {
            Ok(bincode::deserialize_from(input)?)
        }
    }
}
