//! LEB128 variable-length integer encoding.
//!
//! Each byte carries 7 payload bits, least significant group first, with the
//! top bit set when more bytes follow. Signed variants are zig-zag mapped first
//! so small negative numbers stay short.
//!
//! Width limits: a 32-bit value occupies at most [`MAX_LEN_32`] bytes and a
//! 64-bit value at most [`MAX_LEN_64`]. A sequence still flagged as continuing
//! at that point is rejected as `Error::Malformed`; running out of bytes in the
//! middle of a sequence is `Error::UnexpectedEof`.

use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Maximum encoded length of a 32-bit value.
pub const MAX_LEN_32: usize = 5;

/// Maximum encoded length of a 64-bit value (9 continuation bytes + terminal byte).
pub const MAX_LEN_64: usize = 10;

pub fn write_u32<W: Write + ?Sized>(value: u32, out: &mut W) -> Result<()> {
    write_u64(value as u64, out)
}

pub fn write_u64<W: Write + ?Sized>(mut value: u64, out: &mut W) -> Result<()> {
    let mut buf = [0u8; MAX_LEN_64];
    let mut len = 0;
    while value & !0x7F != 0 {
        buf[len] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        len += 1;
    }
    buf[len] = value as u8;
    out.write_all(&buf[..=len])?;
    Ok(())
}

pub fn write_i32<W: Write + ?Sized>(value: i32, out: &mut W) -> Result<()> {
    write_u32(zigzag_32(value), out)
}

pub fn write_i64<W: Write + ?Sized>(value: i64, out: &mut W) -> Result<()> {
    write_u64(zigzag_64(value), out)
}

pub fn read_u32<R: Read + ?Sized>(input: &mut R) -> Result<u32> {
    read_raw(input, MAX_LEN_32).map(|v| v as u32)
}

pub fn read_u64<R: Read + ?Sized>(input: &mut R) -> Result<u64> {
    read_raw(input, MAX_LEN_64)
}

pub fn read_i32<R: Read + ?Sized>(input: &mut R) -> Result<i32> {
    read_u32(input).map(unzigzag_32)
}

pub fn read_i64<R: Read + ?Sized>(input: &mut R) -> Result<i64> {
    read_u64(input).map(unzigzag_64)
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

#[inline]
pub fn zigzag_32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub fn zigzag_64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn unzigzag_32(raw: u32) -> i32 {
    ((raw >> 1) as i32) ^ -((raw & 1) as i32)
}

#[inline]
pub fn unzigzag_64(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

fn read_raw<R: Read + ?Sized>(input: &mut R, max_len: usize) -> Result<u64> {
    let mut value = 0u64;
    let mut byte = [0u8; 1];
    for i in 0..max_len {
        input.read_exact(&mut byte)?;
        value |= ((byte[0] & 0x7F) as u64) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::malformed(format!(
        "variable length quantity does not terminate within {max_len} bytes"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_u32(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_u32(value, &mut out).unwrap();
        out
    }

    fn encode_i64(value: i64) -> Vec<u8> {
        let mut out = Vec::new();
        write_i64(value, &mut out).unwrap();
        out
    }

    #[test]
    fn unsigned_32_lengths() {
        for (value, len) in [
            (0u32, 1),
            (1, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (i32::MAX as u32, 5),
            (u32::MAX, 5),
        ] {
            let bytes = encode_u32(value);
            assert_eq!(bytes.len(), len, "value {value}");
            assert_eq!(read_u32(&mut Cursor::new(bytes)).unwrap(), value);
        }
    }

    #[test]
    fn signed_32_lengths() {
        for (value, len) in [
            (0i32, 1),
            (-1, 1),
            (63, 1),
            (-64, 1),
            (64, 2),
            (-65, 2),
            (i32::MAX, 5),
            (i32::MIN, 5),
        ] {
            let mut out = Vec::new();
            write_i32(value, &mut out).unwrap();
            assert_eq!(out.len(), len, "value {value}");
            assert_eq!(read_i32(&mut Cursor::new(out)).unwrap(), value);
        }
    }

    #[test]
    fn signed_64_lengths() {
        for (value, len) in [
            (0i64, 1),
            (-1, 1),
            (-64, 1),
            (-65, 2),
            (i64::MAX, 10),
            (i64::MIN, 10),
        ] {
            let bytes = encode_i64(value);
            assert_eq!(bytes.len(), len, "value {value}");
            assert_eq!(read_i64(&mut Cursor::new(bytes)).unwrap(), value);
        }
    }

    #[test]
    fn unsigned_64_extremes() {
        for (value, len) in [(0u64, 1), (i64::MAX as u64, 9), (u64::MAX, 10)] {
            let mut out = Vec::new();
            write_u64(value, &mut out).unwrap();
            assert_eq!(out.len(), len);
            assert_eq!(encoded_len(value), len);
            assert_eq!(read_u64(&mut Cursor::new(out)).unwrap(), value);
        }
    }

    #[test]
    fn little_endian_groups() {
        assert_eq!(encode_u32(300), vec![0xAC, 0x02]);
    }

    #[test]
    fn overlong_32_is_malformed() {
        let bytes = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x01];
        let err = read_u32(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }

    #[test]
    fn overlong_64_is_malformed() {
        let mut bytes = vec![0xFFu8; MAX_LEN_64];
        bytes.push(0x01);
        let err = read_u64(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
    }

    #[test]
    fn truncated_sequence_is_eof() {
        let err = read_u32(&mut Cursor::new([0x80u8, 0x80])).unwrap_err();
        assert!(err.is_eof());
        assert!(read_u64(&mut Cursor::new(Vec::<u8>::new()))
            .unwrap_err()
            .is_eof());
    }
}
