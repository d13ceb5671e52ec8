//! Text scanning with the `Scanner` type.
//!
//! Every wire-format parser in this workspace (SIP headers, SDP lines, the
//! HEP v2 fixed header) is built on top of this scanner rather than a
//! general-purpose parser combinator library, matching the teacher crate's
//! own hand-rolled approach to SIP parsing.

use std::str;

#[inline(always)]
/// Returns `true` if `c` is an ASCII digit.
pub fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

#[inline(always)]
/// Returns `true` if `c` is a space or a tab.
pub fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t')
}

#[inline(always)]
/// Returns `true` if `c` is `\r` or `\n`.
pub fn is_newline(c: u8) -> bool {
    matches!(c, b'\r' | b'\n')
}

#[inline(always)]
/// Returns `true` unless `c` is a comma or a newline.
pub fn not_comma_or_newline(c: u8) -> bool {
    !matches!(c, b',' | b'\r' | b'\n')
}

#[inline(always)]
/// Returns `true` if `c` is an ASCII alphabetic character.
pub fn is_alphabetic(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

#[inline(always)]
/// Returns `true` if `v` is a valid 16-bit port number (always true; kept
/// so callers can read intent at the call site and so a future narrowing,
/// e.g. rejecting `0`, stays a one-line change).
pub fn is_valid_port(v: u16) -> bool {
    matches!(v, 0..=65535)
}

/// Current line and column of a [`Scanner`], used only for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    line: usize,
    col: usize,
}

impl Position {
    /// The current line, 1-indexed.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The current column, 1-indexed.
    pub fn col(&self) -> usize {
        self.col
    }
}

/// Reads a byte slice while keeping track of line and column.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    src: &'a [u8],
    pos: Position,
    idx: usize,
    len: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a `Scanner` from a byte slice. Line and column start at 1.
    pub const fn new(src: &'a [u8]) -> Self {
        Scanner {
            src,
            pos: Position { line: 1, col: 1 },
            idx: 0,
            len: src.len(),
        }
    }

    /// The current line/column.
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Alias for [`Scanner::position`], kept for call sites inherited from
    /// the parser's error-reporting macros.
    #[inline]
    pub fn pos(&self) -> Position {
        self.position()
    }

    /// Returns `true` if every byte has been read.
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.idx >= self.len
    }

    /// The next byte, without advancing.
    #[inline]
    pub fn peek(&self) -> Option<&u8> {
        self.src.get(self.idx)
    }

    /// `n` bytes from the current position, without advancing.
    pub fn peek_n(&self, n: usize) -> Option<&'a [u8]> {
        let rem = self.remaining();
        if rem.len() >= n {
            Some(&rem[..n])
        } else {
            None
        }
    }

    /// Advances past `n` bytes.
    pub fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Advances past a single byte.
    pub fn advance(&mut self) -> Option<u8> {
        let b = *self.src.get(self.idx)?;
        self.bump(b);
        Some(b)
    }

    /// `true` if the remaining bytes start with `pat`.
    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.remaining().starts_with(pat)
    }

    /// Alias for [`Scanner::advance`], kept for call sites inherited from the
    /// uri parser.
    #[inline]
    pub fn next(&mut self) -> Option<u8> {
        self.advance()
    }

    /// Reads while `func` returns `true`, returning the consumed slice.
    #[inline(always)]
    pub fn read_while<F>(&mut self, func: F) -> &'a [u8]
    where
        F: Fn(u8) -> bool,
    {
        let start = self.idx;
        while self.idx < self.len && func(self.src[self.idx]) {
            self.bump(self.src[self.idx]);
        }
        &self.src[start..self.idx]
    }

    /// Reads while `func` returns `true` and interprets the consumed bytes as
    /// UTF-8 without validation.
    ///
    /// # Safety
    ///
    /// The caller must ensure `func` only matches ASCII bytes, so the
    /// consumed slice is always valid UTF-8.
    #[inline]
    pub unsafe fn read_as_str<F>(&mut self, func: F) -> &'a str
    where
        F: Fn(u8) -> bool,
    {
        str::from_utf8_unchecked(self.read_while(func))
    }

    /// Reads a run of ASCII digits and returns it as a string slice,
    /// without validating that it parses as a number.
    pub fn scan_number_str(&mut self) -> &'a str {
        let digits = self.read_while(is_digit);
        // SAFETY: `is_digit` only matches ASCII bytes.
        unsafe { str::from_utf8_unchecked(digits) }
    }

    /// Like [`Scanner::read_while`] but does not advance the scanner.
    ///
    /// Returns the matched prefix along with the byte immediately following
    /// it, if any, so callers can inspect the delimiter without a second scan.
    pub fn peek_while<F>(&self, func: F) -> (&'a [u8], Option<u8>)
    where
        F: Fn(u8) -> bool,
    {
        let src = self.remaining();
        let n = src.iter().position(|&b| !func(b)).unwrap_or(src.len());
        (&src[..n], src.get(n).copied())
    }

    /// Reads up to (not including) the first occurrence of `byte`.
    pub fn take_until(&mut self, byte: u8) -> &'a [u8] {
        self.read_while(|b| b != byte)
    }

    /// Reads the next byte and advances, iff it equals `b`.
    pub fn consume_if<F>(&mut self, func: F) -> Option<u8>
    where
        F: FnOnce(u8) -> bool,
    {
        match self.peek() {
            Some(&b) if func(b) => {
                self.bump(b);
                Some(b)
            }
            _ => None,
        }
    }

    /// Reads the next byte, erroring if it does not equal `b`.
    pub fn must_read(&mut self, b: u8) -> Result<(), ScanError> {
        match self.peek() {
            Some(&n) if n == b => {
                self.bump(n);
                Ok(())
            }
            Some(&n) => Err(self.error(ScanErrorKind::Char { expected: b, found: n })),
            None => Err(self.error(ScanErrorKind::Eof)),
        }
    }

    /// The next byte, without advancing, erroring at EOF.
    pub fn lookahead(&self) -> Result<u8, ScanError> {
        self.peek().copied().ok_or_else(|| self.error(ScanErrorKind::Eof))
    }

    /// Consumes `pat` if the remaining bytes start with it, erroring otherwise.
    pub fn matches_slice(&mut self, pat: &[u8]) -> Result<(), ScanError> {
        if self.starts_with(pat) {
            self.bump_n(pat.len());
            Ok(())
        } else {
            let found = self.peek().copied().unwrap_or(0);
            Err(self.error(ScanErrorKind::Char {
                expected: pat.first().copied().unwrap_or(0),
                found,
            }))
        }
    }

    /// Reads a `u32` from a run of ASCII digits.
    pub fn read_u32(&mut self) -> Result<u32, ScanError> {
        self.read_num()
    }

    /// Reads a `u16` from a run of ASCII digits.
    pub fn read_u16(&mut self) -> Result<u16, ScanError> {
        self.read_num()
    }

    /// Reads a number using [`lexical_core`], advancing past the digits
    /// actually consumed.
    pub fn read_num<N>(&mut self) -> Result<N, ScanError>
    where
        N: lexical_core::FromLexical,
    {
        match lexical_core::parse_partial::<N>(self.remaining()) {
            Ok((value, consumed)) if consumed > 0 => {
                self.bump_n(consumed);
                Ok(value)
            }
            _ => Err(self.error(ScanErrorKind::Num)),
        }
    }

    /// Every byte not yet consumed.
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.src[self.idx..self.len]
    }

    /// Alias for [`Scanner::remaining`] kept for call sites inherited from
    /// the header parsers.
    #[inline]
    pub fn remaing(&self) -> &'a [u8] {
        self.remaining()
    }

    fn error(&self, kind: ScanErrorKind) -> ScanError {
        ScanError {
            kind,
            line: self.pos.line,
            col: self.pos.col,
        }
    }

    #[inline(always)]
    fn bump(&mut self, byte: u8) {
        if byte == b'\n' {
            self.pos.col = 1;
            self.pos.line += 1;
        } else {
            self.pos.col += 1;
        }
        self.idx += 1;
    }
}

impl AsRef<[u8]> for Scanner<'_> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.remaining()
    }
}

/// The kind of error a [`Scanner`] can produce.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ScanErrorKind {
    /// The scanner reached the end of input unexpectedly.
    Eof,
    /// An expected byte did not match.
    Char {
        /// The byte that was expected.
        expected: u8,
        /// The byte that was actually found.
        found: u8,
    },
    /// A numeric literal could not be parsed.
    Num,
}

/// An error produced while scanning, with the position it occurred at.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ScanError {
    /// The kind of error.
    pub kind: ScanErrorKind,
    /// The line the error occurred on.
    pub line: usize,
    /// The column the error occurred on.
    pub col: usize,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} at {}:{}", self.kind, self.line, self.col)
    }
}

impl std::error::Error for ScanError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_num_stops_at_non_digit() {
        let mut s = Scanner::new(b"9123Test");
        assert_eq!(s.read_num::<u32>(), Ok(9123));
        assert_eq!(s.remaining(), b"Test");
    }

    #[test]
    fn read_num_rejects_non_numeric() {
        let mut s = Scanner::new(b"NaN");
        assert!(s.read_num::<u32>().is_err());
        assert_eq!(s.remaining(), b"NaN");
    }

    #[test]
    fn must_read_advances_on_match() {
        let mut s = Scanner::new(b"abc");
        assert!(s.must_read(b'a').is_ok());
        assert_eq!(s.remaining(), b"bc");
    }

    #[test]
    fn must_read_errors_on_mismatch() {
        let mut s = Scanner::new(b"abc");
        let err = s.must_read(b'z').unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::Char { expected: b'z', found: b'a' });
    }

    #[test]
    fn take_until_stops_before_delimiter() {
        let mut s = Scanner::new(b"foo:bar");
        assert_eq!(s.take_until(b':'), b"foo");
        assert_eq!(s.peek(), Some(&b':'));
    }
}
