//! Streaming authenticated encryption (AES-128-GCM).
//!
//! Wire format:
//!
//! ```text
//! [12-byte random base nonce]
//! [flag u8][len u32 BE][ciphertext + 16-byte tag]   segment 0
//! [flag u8][len u32 BE][ciphertext + 16-byte tag]   segment 1
//! ...
//! ```
//!
//! Plaintext is sealed in segments of at most [`SEGMENT_LEN`] bytes. The flag is
//! `1` on the final segment (written on close) and `0` otherwise; it is bound to
//! the segment as associated data, so a stream cut short before its final
//! segment is detected. Bytes after the final segment are rejected. Segment `i`
//! is sealed under the base nonce with its low 8 bytes XORed with `i` in
//! little-endian order.

use crate::error::{Error, Result};
use crate::safe::SafeSource;
use crate::stream::{BoxSink, BoxSource, Sink, Source};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Key, Nonce};
use byteorder::{BigEndian, ByteOrder};
use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::io::{self, Read, Write};

pub const KEY_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const SEGMENT_LEN: usize = 16 * 1024;

const HEADER_LEN: usize = 5;
const FLAG_MORE: u8 = 0;
const FLAG_FINAL: u8 = 1;

/// Key material for the encryption filter.
#[derive(Clone, PartialEq, Eq)]
pub struct AesFilter {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for AesFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesFilter").finish_non_exhaustive()
    }
}

impl AesFilter {
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            Error::invalid_argument(format!(
                "AES key must be {KEY_LEN} bytes, got {}",
                key.len()
            ))
        })?;
        Ok(Self { key })
    }

    pub fn random() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    fn cipher(&self) -> Aes128Gcm {
        Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&self.key))
    }

    /// Writes a fresh base nonce to `sink` and returns the encrypting layer.
    pub fn wrap_output<'a>(&self, mut sink: BoxSink<'a>) -> Result<BoxSink<'a>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        sink.write_all(&nonce)?;
        debug!("encrypting output stream {}", sink.stream_type().name());
        Ok(Box::new(AesSink {
            inner: sink,
            cipher: self.cipher(),
            nonce,
            counter: 0,
            pending: Vec::with_capacity(SEGMENT_LEN),
        }))
    }

    /// Reads the base nonce from `source` and returns the decrypting layer.
    ///
    /// Fewer than [`NONCE_LEN`] header bytes is `Error::Malformed`.
    pub fn wrap_input<'a>(&self, mut source: BoxSource<'a>) -> Result<BoxSource<'a>> {
        let mut nonce = [0u8; NONCE_LEN];
        let read = SafeSource::new(&mut source).read_range(&mut nonce, 0, NONCE_LEN)?;
        if read < NONCE_LEN {
            return Err(Error::malformed(format!(
                "encrypted stream header needs {NONCE_LEN} bytes, found {read}"
            )));
        }
        debug!("decrypting input stream {}", source.stream_type().name());
        Ok(Box::new(AesSource {
            inner: source,
            cipher: self.cipher(),
            nonce,
            counter: 0,
            plain: Vec::new(),
            pos: 0,
            finished: false,
            drained: false,
        }))
    }
}

fn segment_nonce(base: &[u8; NONCE_LEN], counter: u64) -> [u8; NONCE_LEN] {
    let mut nonce = *base;
    for (b, c) in nonce[4..].iter_mut().zip(counter.to_le_bytes()) {
        *b ^= c;
    }
    nonce
}

fn invalid_data(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Encrypting layer. Plaintext is held until a segment fills, the stream is
/// flushed, or it is closed.
pub struct AesSink<'a> {
    inner: BoxSink<'a>,
    cipher: Aes128Gcm,
    nonce: [u8; NONCE_LEN],
    counter: u64,
    pending: Vec<u8>,
}

impl AesSink<'_> {
    fn seal(&mut self, flag: u8) -> io::Result<()> {
        let nonce = segment_nonce(&self.nonce, self.counter);
        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &self.pending,
                    aad: &[flag],
                },
            )
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "segment encryption failed"))?;
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "segment counter exhausted"))?;

        let mut header = [0u8; HEADER_LEN];
        header[0] = flag;
        BigEndian::write_u32(&mut header[1..], sealed.len() as u32);
        self.inner.write_all(&header)?;
        self.inner.write_all(&sealed)?;
        self.pending.clear();
        Ok(())
    }
}

impl Write for AesSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let take = buf.len().min(SEGMENT_LEN - self.pending.len());
        self.pending.extend_from_slice(&buf[..take]);
        if self.pending.len() == SEGMENT_LEN {
            self.seal(FLAG_MORE)?;
        }
        Ok(take)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.seal(FLAG_MORE)?;
        }
        self.inner.flush()
    }
}

impl Sink for AesSink<'_> {
    fn close(self: Box<Self>) -> io::Result<()> {
        let mut this = *self;
        this.seal(FLAG_FINAL)?;
        this.inner.close()
    }
}

/// Decrypting layer. Each segment is authenticated before any of its bytes
/// are handed out.
pub struct AesSource<'a> {
    inner: BoxSource<'a>,
    cipher: Aes128Gcm,
    nonce: [u8; NONCE_LEN],
    counter: u64,
    plain: Vec<u8>,
    pos: usize,
    finished: bool,
    // Set once the stream is confirmed to end after the final segment.
    drained: bool,
}

impl AesSource<'_> {
    fn expect_end(&mut self) -> io::Result<usize> {
        if !self.drained {
            let mut extra = [0u8; 1];
            let read = loop {
                match self.inner.read(&mut extra) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            };
            if read > 0 {
                return Err(invalid_data("data follows the final encrypted segment"));
            }
            self.drained = true;
        }
        Ok(0)
    }

    fn open_next(&mut self) -> io::Result<()> {
        let mut header = [0u8; HEADER_LEN];
        self.inner.read_exact(&mut header).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => invalid_data("encrypted stream ended before its final segment"),
            _ => e,
        })?;
        let flag = header[0];
        if flag != FLAG_MORE && flag != FLAG_FINAL {
            return Err(invalid_data("unknown encrypted segment flag"));
        }
        let len = BigEndian::read_u32(&header[1..]) as usize;
        if !(TAG_LEN..=SEGMENT_LEN + TAG_LEN).contains(&len) {
            return Err(invalid_data("encrypted segment length out of range"));
        }

        let mut sealed = vec![0u8; len];
        self.inner.read_exact(&mut sealed).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => invalid_data("encrypted segment is truncated"),
            _ => e,
        })?;
        let nonce = segment_nonce(&self.nonce, self.counter);
        self.plain = self
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &sealed,
                    aad: &[flag],
                },
            )
            .map_err(|_| invalid_data("encrypted segment failed authentication"))?;
        self.pos = 0;
        self.counter += 1;
        self.finished = flag == FLAG_FINAL;
        Ok(())
    }
}

impl Read for AesSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.plain.len() {
            if self.finished {
                return self.expect_end();
            }
            self.open_next()?;
        }
        let n = buf.len().min(self.plain.len() - self.pos);
        buf[..n].copy_from_slice(&self.plain[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Source for AesSource<'_> {}
