//! Typed binary state streams.
//!
//! [`StateWriter`] appends fields to a byte stream and [`StateReader`] takes
//! them back off in the same order. Nothing but the field bytes is stored: no
//! tags, names or version markers. A reader must therefore issue exactly the
//! `get_*` calls matching the writer's `put_*` calls.
//!
//! # Layout
//!
//! | field                         | encoding                                        |
//! |-------------------------------|-------------------------------------------------|
//! | `bool`, `u8`, `i8`            | 1 byte (`bool` is `0` or `1`)                   |
//! | `i16`, `u16`                  | 2 bytes, big-endian                             |
//! | `i32`, `f32`                  | 4 bytes, big-endian (`f32` by bit pattern)      |
//! | `i64`, `f64`                  | 8 bytes, big-endian (`f64` by bit pattern)      |
//! | byte arrays, strings          | varint length, then the bytes (strings UTF-8)   |
//! | primitive arrays              | varint count, then fixed-width elements         |
//! | enums                         | varint ordinal                                  |
//! | collections, arrays, maps     | varint count, then elements (maps: key, value)  |
//! | UUID                          | 16 bytes, most significant half first           |
//! | time of day                   | 8-byte nanosecond of day                        |
//! | date                          | 8-byte day count from 1970-01-01                |
//! | date-time                     | date, then time of day                          |
//! | offset date-time              | date-time, then 4-byte offset seconds           |
//! | instant                       | 8-byte epoch seconds, then 4-byte nanos         |
//! | system time                   | 8-byte epoch milliseconds                       |
//! | big integer                   | two's-complement big-endian bytes (byte array)  |
//! | big decimal                   | big integer unscaled value, then 4-byte scale   |

use crate::error::{Error, Result};
use crate::varint;
use bigdecimal::BigDecimal;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Utc,
};
use num_bigint::BigInt;
use std::io::{self, Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

// chrono carries a leap second as a nanosecond field of 1e9 or more.
fn reject_leap_second(nanosecond: u32) -> Result<()> {
    if i64::from(nanosecond) >= NANOS_PER_SECOND {
        return Err(Error::invalid_argument(format!(
            "leap second (nanosecond {nanosecond}) cannot be encoded"
        )));
    }
    Ok(())
}
/// `Datelike::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Upper bound on speculative preallocation for counts read off the wire.
const MAX_PREALLOC: usize = 4096;

fn length_prefix(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::invalid_argument(format!("length {len} exceeds the u32 range")))
}

/// Writes typed fields onto a byte stream.
///
/// Every `put_*` consumes the writer and hands it back, so fields chain with `?`:
///
/// ```rust
/// # use streamcodec::state::StateWriter;
/// let mut out = Vec::new();
/// StateWriter::new(&mut out)
///     .put_i32(7)?
///     .put_str("seven")?
///     .put_bool(true)?;
/// assert_eq!(out.len(), 4 + 1 + 5 + 1);
/// # Ok::<(), streamcodec::Error>(())
/// ```
pub struct StateWriter<'w> {
    out: &'w mut dyn Write,
}

impl std::fmt::Debug for StateWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateWriter").finish_non_exhaustive()
    }
}

impl<'w> StateWriter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        Self { out }
    }

    pub fn put_bool(self, value: bool) -> Result<Self> {
        self.put_u8(value as u8)
    }

    pub fn put_u8(self, value: u8) -> Result<Self> {
        self.out.write_u8(value)?;
        Ok(self)
    }

    pub fn put_i8(self, value: i8) -> Result<Self> {
        self.out.write_i8(value)?;
        Ok(self)
    }

    pub fn put_i16(self, value: i16) -> Result<Self> {
        self.out.write_i16::<BigEndian>(value)?;
        Ok(self)
    }

    /// Two-byte unsigned slot, also used for UTF-16 code units.
    pub fn put_u16(self, value: u16) -> Result<Self> {
        self.out.write_u16::<BigEndian>(value)?;
        Ok(self)
    }

    pub fn put_i32(self, value: i32) -> Result<Self> {
        self.out.write_i32::<BigEndian>(value)?;
        Ok(self)
    }

    pub fn put_i64(self, value: i64) -> Result<Self> {
        self.out.write_i64::<BigEndian>(value)?;
        Ok(self)
    }

    pub fn put_f32(self, value: f32) -> Result<Self> {
        self.out.write_u32::<BigEndian>(value.to_bits())?;
        Ok(self)
    }

    pub fn put_f64(self, value: f64) -> Result<Self> {
        self.out.write_u64::<BigEndian>(value.to_bits())?;
        Ok(self)
    }

    pub fn put_var_u32(self, value: u32) -> Result<Self> {
        varint::write_u32(value, self.out)?;
        Ok(self)
    }

    pub fn put_var_i32(self, value: i32) -> Result<Self> {
        varint::write_i32(value, self.out)?;
        Ok(self)
    }

    pub fn put_var_u64(self, value: u64) -> Result<Self> {
        varint::write_u64(value, self.out)?;
        Ok(self)
    }

    pub fn put_var_i64(self, value: i64) -> Result<Self> {
        varint::write_i64(value, self.out)?;
        Ok(self)
    }

    fn put_count(self, count: usize) -> Result<Self> {
        let count = length_prefix(count)?;
        self.put_var_u32(count)
    }

    pub fn put_bytes(self, values: &[u8]) -> Result<Self> {
        let this = self.put_count(values.len())?;
        this.out.write_all(values)?;
        Ok(this)
    }

    pub fn put_bools(self, values: &[bool]) -> Result<Self> {
        values
            .iter()
            .try_fold(self.put_count(values.len())?, |w, &v| w.put_bool(v))
    }

    pub fn put_i16s(self, values: &[i16]) -> Result<Self> {
        values
            .iter()
            .try_fold(self.put_count(values.len())?, |w, &v| w.put_i16(v))
    }

    pub fn put_u16s(self, values: &[u16]) -> Result<Self> {
        values
            .iter()
            .try_fold(self.put_count(values.len())?, |w, &v| w.put_u16(v))
    }

    pub fn put_i32s(self, values: &[i32]) -> Result<Self> {
        values
            .iter()
            .try_fold(self.put_count(values.len())?, |w, &v| w.put_i32(v))
    }

    pub fn put_i64s(self, values: &[i64]) -> Result<Self> {
        values
            .iter()
            .try_fold(self.put_count(values.len())?, |w, &v| w.put_i64(v))
    }

    pub fn put_f32s(self, values: &[f32]) -> Result<Self> {
        values
            .iter()
            .try_fold(self.put_count(values.len())?, |w, &v| w.put_f32(v))
    }

    pub fn put_f64s(self, values: &[f64]) -> Result<Self> {
        values
            .iter()
            .try_fold(self.put_count(values.len())?, |w, &v| w.put_f64(v))
    }

    pub fn put_str(self, value: &str) -> Result<Self> {
        self.put_bytes(value.as_bytes())
    }

    /// Writes the enum's ordinal as a varint. Nothing symbolic is stored.
    pub fn put_enum<E: Into<u32>>(self, value: E) -> Result<Self> {
        self.put_var_u32(value.into())
    }

    pub fn put_uuid(self, value: &Uuid) -> Result<Self> {
        self.out.write_u128::<BigEndian>(value.as_u128())?;
        Ok(self)
    }

    /// Fails with `InvalidArgument` on a leap second, which has no nanosecond of day.
    pub fn put_time(self, value: NaiveTime) -> Result<Self> {
        reject_leap_second(value.nanosecond())?;
        let nanos = value.num_seconds_from_midnight() as i64 * NANOS_PER_SECOND
            + value.nanosecond() as i64;
        self.put_i64(nanos)
    }

    pub fn put_date(self, value: NaiveDate) -> Result<Self> {
        self.put_i64(value.num_days_from_ce() as i64 - EPOCH_DAYS_FROM_CE)
    }

    pub fn put_datetime(self, value: &NaiveDateTime) -> Result<Self> {
        reject_leap_second(value.nanosecond())?;
        self.put_date(value.date())?.put_time(value.time())
    }

    pub fn put_offset_datetime(self, value: &DateTime<FixedOffset>) -> Result<Self> {
        self.put_datetime(&value.naive_local())?
            .put_offset(*value.offset())
    }

    pub fn put_offset(self, value: FixedOffset) -> Result<Self> {
        self.put_i32(value.local_minus_utc())
    }

    pub fn put_instant(self, value: &DateTime<Utc>) -> Result<Self> {
        reject_leap_second(value.timestamp_subsec_nanos())?;
        self.put_i64(value.timestamp())?
            .put_i32(value.timestamp_subsec_nanos() as i32)
    }

    /// Millisecond precision; sub-millisecond parts are dropped.
    pub fn put_system_time(self, value: SystemTime) -> Result<Self> {
        let millis = match value.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_millis()),
            Err(before) => i64::try_from(before.duration().as_millis()).map(|m| -m),
        }
        .map_err(|_| Error::invalid_argument("system time outside the i64 millisecond range"))?;
        self.put_i64(millis)
    }

    pub fn put_bigint(self, value: &BigInt) -> Result<Self> {
        self.put_bytes(&value.to_signed_bytes_be())
    }

    pub fn put_bigdecimal(self, value: &BigDecimal) -> Result<Self> {
        let (unscaled, scale) = value.as_bigint_and_exponent();
        let scale = i32::try_from(scale)
            .map_err(|_| Error::invalid_argument(format!("decimal scale {scale} exceeds i32")))?;
        self.put_bigint(&unscaled)?.put_i32(scale)
    }

    /// Writes a varint count followed by each element through `element`.
    pub fn put_collection<'i, T, I, F>(self, items: I, mut element: F) -> Result<Self>
    where
        T: 'i,
        I: IntoIterator<Item = &'i T>,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(Self, &T) -> Result<Self>,
    {
        let mut items = items.into_iter();
        let count = items.len();
        items.try_fold(self.put_count(count)?, |w, item| element(w, item))
    }

    pub fn put_array<T, F>(self, items: &[T], element: F) -> Result<Self>
    where
        F: FnMut(Self, &T) -> Result<Self>,
    {
        self.put_collection(items, element)
    }

    /// Writes a varint entry count, then each key followed by its value.
    pub fn put_map<'i, K, V, I, FK, FV>(self, entries: I, mut key: FK, mut value: FV) -> Result<Self>
    where
        K: 'i,
        V: 'i,
        I: IntoIterator<Item = (&'i K, &'i V)>,
        I::IntoIter: ExactSizeIterator,
        FK: FnMut(Self, &K) -> Result<Self>,
        FV: FnMut(Self, &V) -> Result<Self>,
    {
        let mut entries = entries.into_iter();
        let count = entries.len();
        entries.try_fold(self.put_count(count)?, |w, (k, v)| {
            let w = key(w, k)?;
            value(w, v)
        })
    }
}

/// Reads typed fields written by [`StateWriter`], in write order.
///
/// Reading past the last field fails with `Error::UnexpectedEof`.
pub struct StateReader<'r> {
    input: &'r mut dyn Read,
    peeked: Option<u8>,
}

impl<'r> StateReader<'r> {
    pub fn new(input: &'r mut dyn Read) -> Self {
        Self {
            input,
            peeked: None,
        }
    }

    /// Reports whether the source is exhausted without consuming a field.
    ///
    /// A byte pulled from the source to answer is kept for the next `get_*`.
    pub fn is_eof(&mut self) -> Result<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.peeked = Some(byte[0]);
                    return Ok(false);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::malformed(format!("illegal boolean byte value {other}"))),
        }
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.read_u8()?)
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        Ok(self.read_i8()?)
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        Ok(self.read_i16::<BigEndian>()?)
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(self.read_u16::<BigEndian>()?)
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(self.read_i32::<BigEndian>()?)
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        Ok(self.read_i64::<BigEndian>()?)
    }

    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32::<BigEndian>()?))
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64::<BigEndian>()?))
    }

    pub fn get_var_u32(&mut self) -> Result<u32> {
        varint::read_u32(self)
    }

    pub fn get_var_i32(&mut self) -> Result<i32> {
        varint::read_i32(self)
    }

    pub fn get_var_u64(&mut self) -> Result<u64> {
        varint::read_u64(self)
    }

    pub fn get_var_i64(&mut self) -> Result<i64> {
        varint::read_i64(self)
    }

    fn get_count(&mut self) -> Result<usize> {
        Ok(self.get_var_u32()? as usize)
    }

    pub fn get_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.get_count()?;
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
        self.by_ref().take(len as u64).read_to_end(&mut bytes)?;
        if bytes.len() < len {
            return Err(Error::UnexpectedEof);
        }
        Ok(bytes)
    }

    fn get_primitives<T>(&mut self, mut element: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let count = self.get_count()?;
        let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            values.push(element(self)?);
        }
        Ok(values)
    }

    pub fn get_bools(&mut self) -> Result<Vec<bool>> {
        self.get_primitives(Self::get_bool)
    }

    pub fn get_i16s(&mut self) -> Result<Vec<i16>> {
        self.get_primitives(Self::get_i16)
    }

    pub fn get_u16s(&mut self) -> Result<Vec<u16>> {
        self.get_primitives(Self::get_u16)
    }

    pub fn get_i32s(&mut self) -> Result<Vec<i32>> {
        self.get_primitives(Self::get_i32)
    }

    pub fn get_i64s(&mut self) -> Result<Vec<i64>> {
        self.get_primitives(Self::get_i64)
    }

    pub fn get_f32s(&mut self) -> Result<Vec<f32>> {
        self.get_primitives(Self::get_f32)
    }

    pub fn get_f64s(&mut self) -> Result<Vec<f64>> {
        self.get_primitives(Self::get_f64)
    }

    pub fn get_string(&mut self) -> Result<String> {
        String::from_utf8(self.get_bytes()?)
            .map_err(|e| Error::malformed(format!("string field is not UTF-8: {e}")))
    }

    /// Maps a stored ordinal back through `E::try_from`; unknown ordinals are malformed.
    pub fn get_enum<E: TryFrom<u32>>(&mut self) -> Result<E> {
        let ordinal = self.get_var_u32()?;
        E::try_from(ordinal).map_err(|_| Error::malformed(format!("unknown enum ordinal {ordinal}")))
    }

    pub fn get_uuid(&mut self) -> Result<Uuid> {
        Ok(Uuid::from_u128(self.read_u128::<BigEndian>()?))
    }

    pub fn get_time(&mut self) -> Result<NaiveTime> {
        let nanos = self.get_i64()?;
        if !(0..NANOS_PER_DAY).contains(&nanos) {
            return Err(Error::malformed(format!("nanosecond of day {nanos} out of range")));
        }
        NaiveTime::from_num_seconds_from_midnight_opt(
            (nanos / NANOS_PER_SECOND) as u32,
            (nanos % NANOS_PER_SECOND) as u32,
        )
        .ok_or_else(|| Error::malformed(format!("invalid nanosecond of day {nanos}")))
    }

    pub fn get_date(&mut self) -> Result<NaiveDate> {
        let days = self.get_i64()?;
        days.checked_add(EPOCH_DAYS_FROM_CE)
            .and_then(|d| i32::try_from(d).ok())
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .ok_or_else(|| Error::malformed(format!("epoch day {days} out of range")))
    }

    pub fn get_datetime(&mut self) -> Result<NaiveDateTime> {
        let date = self.get_date()?;
        let time = self.get_time()?;
        Ok(NaiveDateTime::new(date, time))
    }

    pub fn get_offset_datetime(&mut self) -> Result<DateTime<FixedOffset>> {
        let local = self.get_datetime()?;
        let offset = self.get_offset()?;
        offset
            .from_local_datetime(&local)
            .single()
            .ok_or_else(|| Error::malformed(format!("{local} does not exist at offset {offset}")))
    }

    pub fn get_offset(&mut self) -> Result<FixedOffset> {
        let seconds = self.get_i32()?;
        FixedOffset::east_opt(seconds)
            .ok_or_else(|| Error::malformed(format!("offset of {seconds} seconds out of range")))
    }

    pub fn get_instant(&mut self) -> Result<DateTime<Utc>> {
        let seconds = self.get_i64()?;
        let nanos = self.get_i32()?;
        u32::try_from(nanos)
            .ok()
            .and_then(|nanos| DateTime::from_timestamp(seconds, nanos))
            .ok_or_else(|| Error::malformed(format!("instant {seconds}s + {nanos}ns out of range")))
    }

    pub fn get_system_time(&mut self) -> Result<SystemTime> {
        let millis = self.get_i64()?;
        let offset = Duration::from_millis(millis.unsigned_abs());
        let time = if millis >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(|| Error::malformed(format!("system time {millis}ms out of range")))
    }

    pub fn get_bigint(&mut self) -> Result<BigInt> {
        Ok(BigInt::from_signed_bytes_be(&self.get_bytes()?))
    }

    pub fn get_bigdecimal(&mut self) -> Result<BigDecimal> {
        let unscaled = self.get_bigint()?;
        let scale = self.get_i32()?;
        Ok(BigDecimal::new(unscaled, scale as i64))
    }

    /// Reads a varint count, then that many elements through `element`.
    pub fn get_collection<T, C, F>(&mut self, mut element: F) -> Result<C>
    where
        C: FromIterator<T>,
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.get_count()?;
        (0..count).map(|_| element(self)).collect()
    }

    pub fn get_array<T, F>(&mut self, element: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        self.get_primitives(element)
    }

    pub fn get_map<K, V, M, FK, FV>(&mut self, mut key: FK, mut value: FV) -> Result<M>
    where
        M: FromIterator<(K, V)>,
        FK: FnMut(&mut Self) -> Result<K>,
        FV: FnMut(&mut Self) -> Result<V>,
    {
        let count = self.get_count()?;
        (0..count)
            .map(|_| -> Result<(K, V)> {
                let k = key(self)?;
                let v = value(self)?;
                Ok((k, v))
            })
            .collect()
    }
}

impl Read for StateReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.peeked.take() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => self.input.read(buf),
        }
    }
}
