//! Code point stream over a buffered byte reader.

use std::io;
use std::io::prelude::*;

/// Decodes UTF-8 input one code point at a time without buffering anything beyond the underlying reader.
pub struct CharReader<R> {
    inner: R,
}

impl<R: BufRead> CharReader<R> {
    pub fn new(inner: R) -> Self {
        CharReader { inner }
    }

    /// Returns the next code point or [`None`] at the end of the stream.
    pub fn next_char(&mut self) -> io::Result<Option<char>> {
        let lead = match self.next_byte()? {
            Some(byte) => byte,
            None => return Ok(None),
        };

        let width = utf8_width(lead).ok_or_else(|| invalid_utf8(&[lead]))?;
        let mut encoded = [lead, 0, 0, 0];
        for idx in 1..width {
            encoded[idx] = match self.next_byte()? {
                Some(byte) => byte,
                None => return Err(invalid_utf8(&encoded[..idx])),
            };
        }

        match std::str::from_utf8(&encoded[..width]) {
            Ok(decoded) => Ok(decoded.chars().next()),
            Err(_) => Err(invalid_utf8(&encoded[..width])),
        }
    }

    /// Skips code points up to and including the next whitespace.
    /// Returns `false` if the stream ended first.
    pub fn skip_word(&mut self) -> io::Result<bool> {
        while let Some(ch) = self.next_char()? {
            if ch.is_whitespace() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.inner.fill_buf()? {
            [] => return Ok(None),
            [byte, ..] => *byte,
        };
        self.inner.consume(1);

        return Ok(Some(byte));
    }
}

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn invalid_utf8(bytes: &[u8]) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("stream did not contain valid UTF-8 (bytes: {:02x?})", bytes),
    )
}

#[cfg(test)]
mod test {
    use std::io::{self, Cursor};

    use rstest::*;

    use super::CharReader;

    fn read_all(bytes: &[u8]) -> io::Result<String> {
        let mut reader = CharReader::new(Cursor::new(bytes));
        let mut result = String::new();
        while let Some(ch) = reader.next_char()? {
            result.push(ch);
        }
        Ok(result)
    }

    #[rstest]
    #[case("")]
    #[case("plain ascii\n")]
    #[case("naïve café")]
    #[case("日本語 テキスト")]
    #[case("emoji 😀🦀")]
    fn test_decode(#[case] text: &str) {
        assert_eq!(read_all(text.as_bytes()).unwrap(), text);
    }

    #[rstest]
    #[case(&[0xFF])]
    #[case(&[b'a', 0x80])]
    #[case(&[0xC3])]
    #[case(&[0xE2, 0x28, 0xA1])]
    #[case(&[0xED, 0xA0, 0x80])]
    fn test_invalid_utf8(#[case] bytes: &[u8]) {
        let err = read_all(bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_skip_word() {
        let mut reader = CharReader::new(Cursor::new("skipped next".as_bytes()));
        assert!(reader.skip_word().unwrap());
        assert_eq!(reader.next_char().unwrap(), Some('n'));
        assert!(!reader.skip_word().unwrap());
        assert_eq!(reader.next_char().unwrap(), None);
    }
}
