//! Core traits for the streamcodec library.

use crate::error::Result;
use std::io::{Read, Write};
use std::marker::PhantomData;

/// A stateless, bidirectional encoding of one value type onto a byte stream.
///
/// Implementations must uphold a small contract so that encoders stay
/// interchangeable inside a [`Codec`](crate::Codec):
///
/// * `read` either returns a complete value or fails. When the stream runs
///   out part way through a value it fails with `Error::UnexpectedEof`.
/// * Neither method flushes or closes the stream it is handed. The handle that
///   owns the stream decides when that happens.
///
/// Encoders are shared across threads by codecs, hence the `Send + Sync` bound.
pub trait ValueEncoder: Send + Sync {
    type Value;

    fn write(&self, value: &Self::Value, out: &mut dyn Write) -> Result<()>;

    fn read(&self, input: &mut dyn Read) -> Result<Self::Value>;
}

/// An encoder lifted onto another value type through a pair of converters.
///
/// The bytes on the wire are exactly those of the inner encoder.
pub struct Adapted<E, T, ToInner, FromInner> {
    inner: E,
    to: ToInner,
    from: FromInner,
    _value: PhantomData<fn() -> T>,
}

impl<E, T, ToInner, FromInner> Adapted<E, T, ToInner, FromInner>
where
    E: ValueEncoder,
    ToInner: Fn(&T) -> E::Value,
    FromInner: Fn(E::Value) -> T,
{
    pub fn new(inner: E, to: ToInner, from: FromInner) -> Self {
        Self {
            inner,
            to,
            from,
            _value: PhantomData,
        }
    }
}

impl<E, T, ToInner, FromInner> ValueEncoder for Adapted<E, T, ToInner, FromInner>
where
    E: ValueEncoder,
    ToInner: Fn(&T) -> E::Value + Send + Sync,
    FromInner: Fn(E::Value) -> T + Send + Sync,
{
    type Value = T;

    fn write(&self, value: &T, out: &mut dyn Write) -> Result<()> {
        self.inner.write(&(self.to)(value), out)
    }

    fn read(&self, input: &mut dyn Read) -> Result<T> {
        self.inner.read(input).map(&self.from)
    }
}

/// Extension methods for value encoders to enable fluent composition without importing adapter types.
pub trait ValueEncoderExt: ValueEncoder + Sized {
    /// Encode `T` by converting it to this encoder's value type and back.
    ///
    /// ```rust
    /// # use streamcodec::{RawBytes, ValueEncoder, ValueEncoderExt};
    /// let text = RawBytes.adapt(
    ///     |s: &String| s.as_bytes().to_vec(),
    ///     |b: Vec<u8>| String::from_utf8_lossy(&b).into_owned(),
    /// );
    /// let mut out = Vec::new();
    /// text.write(&"ff".to_string(), &mut out)?;
    /// assert_eq!(out, vec![2, b'f', b'f']);
    /// # Ok::<(), streamcodec::Error>(())
    /// ```
    fn adapt<T, ToInner, FromInner>(
        self,
        to: ToInner,
        from: FromInner,
    ) -> Adapted<Self, T, ToInner, FromInner>
    where
        ToInner: Fn(&T) -> Self::Value,
        FromInner: Fn(Self::Value) -> T,
    {
        Adapted::new(self, to, from)
    }
}

impl<E: ValueEncoder> ValueEncoderExt for E {}
