//! Base64 text-safe encoding filters (unpadded).

use crate::stream::{BoxSink, BoxSource, Sink, Source};
use base64::engine::general_purpose::{self, GeneralPurpose};
use base64::read::DecoderReader;
use base64::write::EncoderWriter;
use std::io::{self, Read, Write};

/// Encoded characters per MIME line, excluding the separator.
pub const MIME_LINE_LEN: usize = 76;
const MIME_SEPARATOR: &[u8] = b"\r\n";

static STANDARD: GeneralPurpose = general_purpose::STANDARD_NO_PAD;
static URL_SAFE: GeneralPurpose = general_purpose::URL_SAFE_NO_PAD;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Base64Alphabet {
    /// RFC 4648 section 4 (`+` and `/`).
    #[default]
    Standard,
    /// RFC 4648 section 5 (`-` and `_`).
    UrlSafe,
    /// RFC 2045: the standard alphabet in lines of [`MIME_LINE_LEN`]
    /// characters separated by CRLF. Decoding skips line separators.
    Mime,
}

impl Base64Alphabet {
    fn engine(&self) -> &'static GeneralPurpose {
        match self {
            Base64Alphabet::Standard => &STANDARD,
            Base64Alphabet::UrlSafe => &URL_SAFE,
            Base64Alphabet::Mime => &STANDARD,
        }
    }

    pub fn wrap_output<'a>(&self, sink: BoxSink<'a>) -> BoxSink<'a> {
        let sink: BoxSink<'a> = match self {
            Base64Alphabet::Mime => Box::new(MimeLineSink::new(sink)),
            _ => sink,
        };
        Box::new(EncoderWriter::new(sink, self.engine()))
    }

    pub fn wrap_input<'a>(&self, source: BoxSource<'a>) -> BoxSource<'a> {
        let source: BoxSource<'a> = match self {
            Base64Alphabet::Mime => Box::new(MimeLineSource { inner: source }),
            _ => source,
        };
        Box::new(DecoderReader::new(source, self.engine()))
    }
}

/// Breaks encoded output into MIME lines. No separator follows the last line.
struct MimeLineSink<'a> {
    inner: BoxSink<'a>,
    column: usize,
}

impl<'a> MimeLineSink<'a> {
    fn new(inner: BoxSink<'a>) -> Self {
        Self { inner, column: 0 }
    }
}

impl Write for MimeLineSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.column == MIME_LINE_LEN {
            self.inner.write_all(MIME_SEPARATOR)?;
            self.column = 0;
        }
        let take = buf.len().min(MIME_LINE_LEN - self.column);
        let n = self.inner.write(&buf[..take])?;
        self.column += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Sink for MimeLineSink<'_> {
    fn close(self: Box<Self>) -> io::Result<()> {
        self.inner.close()
    }
}

/// Drops CR and LF bytes before they reach the decoder.
struct MimeLineSource<'a> {
    inner: BoxSource<'a>,
}

impl Read for MimeLineSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let byte = buf[i];
                if byte != b'\r' && byte != b'\n' {
                    buf[kept] = byte;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

impl Source for MimeLineSource<'_> {}

impl<'a> Sink for EncoderWriter<'static, GeneralPurpose, BoxSink<'a>> {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        // Emits the final partial group; the writer is inert afterwards.
        self.finish()?.close()
    }
}

impl<'a> Source for DecoderReader<'static, GeneralPurpose, BoxSource<'a>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{RawSink, RawSource};

    fn encode(alphabet: Base64Alphabet, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut sink = alphabet.wrap_output(RawSink::boxed(&mut out));
        sink.write_all(data).unwrap();
        sink.close().unwrap();
        out
    }

    #[test]
    fn output_is_unpadded() {
        assert_eq!(encode(Base64Alphabet::Standard, b"f"), b"Zg");
        assert_eq!(encode(Base64Alphabet::Standard, b"foob"), b"Zm9vYg");
    }

    #[test]
    fn alphabets_differ() {
        let data = [0xFBu8, 0xFF];
        assert_eq!(encode(Base64Alphabet::Standard, &data), b"+/8");
        assert_eq!(encode(Base64Alphabet::UrlSafe, &data), b"-_8");
    }

    #[test]
    fn decodes_back() {
        let data: Vec<u8> = (0..=255u8).collect();
        for alphabet in [
            Base64Alphabet::Standard,
            Base64Alphabet::UrlSafe,
            Base64Alphabet::Mime,
        ] {
            let encoded = encode(alphabet, &data);
            let mut back = Vec::new();
            alphabet
                .wrap_input(RawSource::boxed(&encoded[..]))
                .read_to_end(&mut back)
                .unwrap();
            assert_eq!(back, data);
        }
    }

    #[test]
    fn mime_output_is_split_into_crlf_lines() {
        let data: Vec<u8> = (0..200u8).collect();
        let encoded = encode(Base64Alphabet::Mime, &data);
        let text = std::str::from_utf8(&encoded).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();

        // 200 bytes encode to 267 characters: three full lines and a tail.
        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|line| line.len() == MIME_LINE_LEN));
        assert_eq!(lines[3].len(), 267 - 3 * MIME_LINE_LEN);
        assert!(!text.ends_with('\n'));
        assert_eq!(lines.concat().as_bytes(), encode(Base64Alphabet::Standard, &data));
    }

    #[test]
    fn mime_line_of_exact_length_has_no_separator() {
        // 57 bytes encode to exactly one 76-character line.
        let encoded = encode(Base64Alphabet::Mime, &[7u8; 57]);
        assert_eq!(encoded.len(), MIME_LINE_LEN);
        assert!(!encoded.contains(&b'\n'));
    }

    #[test]
    fn mime_decode_skips_separators_across_small_reads() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let encoded = encode(Base64Alphabet::Mime, &data);
        let mut source = Base64Alphabet::Mime.wrap_input(RawSource::boxed(&encoded[..]));
        let mut back = Vec::new();
        let mut chunk = [0u8; 5];
        loop {
            let n = source.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            back.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(back, data);
    }
}
