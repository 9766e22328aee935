/*
 * Created on Fri Sep 15 2023
 *
 * This file is part of lyskom-client, an async client library for the LysKOM Protocol A conferencing system.
 *
 * lyskom-client is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The tokenizer: a continuous function from arbitrarily-chunked byte
//! streams to a sequence of typed [`Token`]s, resumable on any chunk
//! boundary.
//!
//! Modeled on the resumable `resume(&mut BufferedScanner, state) -> Result`
//! idiom this workspace uses for its other wire-level state machines, but
//! driven off a re-scan of the buffered prefix rather than a persisted
//! byte-cursor: tokens here are small and infrequent compared to a
//! database's query stream, so re-scanning from the front of whatever is
//! still buffered keeps the state machine in this module to a single enum
//! instead of needing one unfinished-production variant per grammar rule.

use crate::{error::ProtocolError, scanner::ByteScanner};
use bytes::{Bytes, BytesMut};

/// A tagged value produced by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int { value: i64, raw: Bytes },
    Float(f64),
    String(Bytes),
    OpenBrace,
    CloseBrace,
    Star,
    Equals,
    Percent,
    Colon,
}

/// Something the tokenizer hands back to its driver. Distinct from `Token`
/// because a handshake and a server-error frame are both things the
/// tokenizer produces out of the normal token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizerEvent {
    /// the `LysKOM\n` preface was matched; normal-mode tokenizing begins
    /// after this event
    Handshake,
    Token(Token),
    /// a `%%<text>` out-of-band frame
    ServerError(Bytes),
}

const HANDSHAKE_PREFACE: &[u8] = b"LysKOM\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    AwaitingHandshake,
    Normal,
}

/// Converts byte chunks into [`TokenizerEvent`]s. Bytes that don't yet form
/// a complete production stay buffered across calls to [`Tokenizer::feed`].
pub struct Tokenizer {
    mode: Mode,
    buf: BytesMut,
    ended: bool,
}

impl Tokenizer {
    pub fn new(expect_handshake: bool) -> Self {
        Self {
            mode: if expect_handshake {
                Mode::AwaitingHandshake
            } else {
                Mode::Normal
            },
            buf: BytesMut::new(),
            ended: false,
        }
    }

    /// Feed another chunk of bytes, arbitrarily sized, in order. Returns
    /// every complete event the new bytes (combined with whatever was
    /// already buffered) made available.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<TokenizerEvent>, ProtocolError> {
        self.buf.extend_from_slice(chunk);
        self.drain(false)
    }

    /// Signal end-of-stream. Flushes one trailing integer/float if the
    /// buffer ends mid-literal, then requires the buffer to be fully
    /// consumed.
    pub fn end(&mut self) -> Result<Vec<TokenizerEvent>, ProtocolError> {
        if self.ended {
            return Ok(Vec::new());
        }
        self.ended = true;
        self.buf.extend_from_slice(b" ");
        let mut out = self.drain(true)?;
        if !self.buf.is_empty() {
            return Err(ProtocolError::TruncatedAtEof);
        }
        out.shrink_to_fit();
        Ok(out)
    }

    fn drain(&mut self, at_eof: bool) -> Result<Vec<TokenizerEvent>, ProtocolError> {
        let mut out = Vec::new();
        loop {
            if self.mode == Mode::AwaitingHandshake {
                match self.try_handshake()? {
                    Some(()) => {
                        out.push(TokenizerEvent::Handshake);
                        self.mode = Mode::Normal;
                        continue;
                    }
                    None => break,
                }
            }
            match scan_one(&self.buf)? {
                Scan::NeedMore => break,
                Scan::Progress { consumed, emit } => {
                    let consumed_bytes = self.buf.split_to(consumed);
                    if let Some(spec) = emit {
                        out.push(spec.into_event(&consumed_bytes));
                    }
                }
            }
        }
        let _ = at_eof;
        Ok(out)
    }

    /// Attempt to match the `LysKOM\n` preface against the buffered prefix.
    /// `Ok(Some(()))` means matched (and the 7 bytes have been dropped from
    /// `buf`); `Ok(None)` means we need more bytes to decide; `Err` means a
    /// definite mismatch.
    fn try_handshake(&mut self) -> Result<Option<()>, ProtocolError> {
        if self.buf.starts_with(b"%%") {
            return Err(ProtocolError::ServerErrorDuringHandshake);
        }
        let have = self.buf.len().min(HANDSHAKE_PREFACE.len());
        if self.buf[..have] != HANDSHAKE_PREFACE[..have] {
            return Err(ProtocolError::BadHandshake);
        }
        if self.buf.len() < HANDSHAKE_PREFACE.len() {
            return Ok(None);
        }
        self.buf.advance_mut_drop(HANDSHAKE_PREFACE.len());
        Ok(Some(()))
    }
}

/// small helper so `try_handshake` reads like the rest of the module
/// (`BytesMut` itself only exposes `split_to`/`advance`, both of which work
/// fine here — this just names the intent)
trait DropPrefix {
    fn advance_mut_drop(&mut self, n: usize);
}
impl DropPrefix for BytesMut {
    fn advance_mut_drop(&mut self, n: usize) {
        let _ = self.split_to(n);
    }
}

enum Scan {
    NeedMore,
    Progress {
        consumed: usize,
        emit: Option<EmitSpec>,
    },
}

enum EmitSpec {
    Token(Token),
    /// payload lives at `text[start..start+len]` within the consumed slice
    ServerError { start: usize, len: usize },
    /// payload lives at `[header_len..header_len+payload_len]` within the
    /// consumed slice
    Hollerith { header_len: usize, payload_len: usize },
}

impl EmitSpec {
    fn into_event(self, consumed: &BytesMut) -> TokenizerEvent {
        match self {
            EmitSpec::Token(t) => TokenizerEvent::Token(t),
            EmitSpec::ServerError { start, len } => {
                let bytes = consumed.clone().freeze().slice(start..start + len);
                TokenizerEvent::ServerError(bytes)
            }
            EmitSpec::Hollerith {
                header_len,
                payload_len,
            } => {
                let bytes = consumed
                    .clone()
                    .freeze()
                    .slice(header_len..header_len + payload_len);
                TokenizerEvent::Token(Token::String(bytes))
            }
        }
    }
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Scan for exactly one grammar production (or pure whitespace) from the
/// front of `data`. Never looks past what's already buffered; returns
/// `NeedMore` whenever the decision depends on bytes we don't have yet.
fn scan_one(data: &[u8]) -> Result<Scan, ProtocolError> {
    let mut s = ByteScanner::new(data);
    s.skip_while(is_ws);
    let ws = s.cursor();
    if s.eof() {
        return if ws > 0 {
            Ok(Scan::Progress {
                consumed: ws,
                emit: None,
            })
        } else {
            Ok(Scan::NeedMore)
        };
    }
    let first = s.peek().unwrap();
    match first {
        b'{' => Ok(one_byte(ws, EmitSpec::Token(Token::OpenBrace))),
        b'}' => Ok(one_byte(ws, EmitSpec::Token(Token::CloseBrace))),
        b'*' => Ok(one_byte(ws, EmitSpec::Token(Token::Star))),
        b'=' => Ok(one_byte(ws, EmitSpec::Token(Token::Equals))),
        b':' => Ok(one_byte(ws, EmitSpec::Token(Token::Colon))),
        b'%' => scan_percent(data, ws),
        b'0'..=b'9' => scan_number(data, ws),
        _ => Err(ProtocolError::UnrecognizedByte),
    }
}

fn one_byte(ws: usize, emit: EmitSpec) -> Scan {
    Scan::Progress {
        consumed: ws + 1,
        emit: Some(emit),
    }
}

fn scan_percent(data: &[u8], ws: usize) -> Result<Scan, ProtocolError> {
    let rest = &data[ws..];
    if rest.len() < 2 {
        return Ok(Scan::NeedMore);
    }
    if rest[1] != b'%' {
        return Ok(one_byte(ws, EmitSpec::Token(Token::Percent)));
    }
    // "%%<text>\n"
    let text = &rest[2..];
    match text.iter().position(|&b| b == b'\n') {
        Some(nl) => Ok(Scan::Progress {
            consumed: ws + 2 + nl + 1,
            emit: Some(EmitSpec::ServerError {
                start: ws + 2,
                len: nl,
            }),
        }),
        None => Ok(Scan::NeedMore),
    }
}

enum NumTerminator {
    /// next byte is whitespace, ending a plain integer
    Whitespace,
    Dot,
    Hollerith,
    /// next byte is none of the above; always an error, but the caller
    /// re-checks so the error path lives in one place
    Other,
}

/// scan a run of ascii digits starting at `start`, returning the exclusive
/// end offset and, if resolved, what followed it
fn scan_digit_run(data: &[u8], start: usize) -> (usize, Option<NumTerminator>) {
    let mut i = start;
    while i < data.len() && data[i].is_ascii_digit() {
        i += 1;
    }
    if i == data.len() {
        return (i, None);
    }
    let term = match data[i] {
        b'.' => NumTerminator::Dot,
        b'H' | b'h' => NumTerminator::Hollerith,
        b if is_ws(b) => NumTerminator::Whitespace,
        _ => NumTerminator::Other,
    };
    (i, Some(term))
}

fn parse_i64(digits: &[u8]) -> Result<i64, ProtocolError> {
    let mut v: i64 = 0;
    for &b in digits {
        v = v
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i64))
            .ok_or(ProtocolError::NumericOverflow)?;
    }
    Ok(v)
}

fn scan_number(data: &[u8], ws: usize) -> Result<Scan, ProtocolError> {
    let digits_start = ws;
    let (digits_end, term) = scan_digit_run(data, digits_start);
    let term = match term {
        None => return Ok(Scan::NeedMore),
        Some(t) => t,
    };
    match term {
        NumTerminator::Whitespace => {
            let value = parse_i64(&data[digits_start..digits_end])?;
            Ok(Scan::Progress {
                consumed: digits_end + 1,
                emit: Some(EmitSpec::Token(Token::Int {
                    value,
                    raw: Bytes::copy_from_slice(&data[digits_start..digits_end]),
                })),
            })
        }
        NumTerminator::Dot => scan_float(data, digits_start, digits_end),
        NumTerminator::Hollerith => scan_hollerith(data, ws, digits_start, digits_end),
        NumTerminator::Other => Err(ProtocolError::UnrecognizedByte),
    }
}

fn scan_float(data: &[u8], digits_start: usize, dot_at: usize) -> Result<Scan, ProtocolError> {
    let frac_start = dot_at + 1;
    let (frac_end, term) = scan_digit_run(data, frac_start);
    if frac_end == frac_start {
        // a literal "12." with no fractional digits at all is not valid,
        // but if we simply haven't seen the next digit yet we need more
        if frac_end >= data.len() {
            return Ok(Scan::NeedMore);
        }
        return Err(ProtocolError::UnrecognizedByte);
    }
    let term = match term {
        None => return Ok(Scan::NeedMore),
        Some(t) => t,
    };
    if !matches!(term, NumTerminator::Whitespace) || frac_end >= data.len() || !is_ws(data[frac_end])
    {
        return Err(ProtocolError::UnrecognizedByte);
    }
    let text = std::str::from_utf8(&data[digits_start..frac_end]).expect("ascii digits and dot");
    let value: f64 = text
        .parse()
        .map_err(|_| ProtocolError::UnrecognizedByte)?;
    Ok(Scan::Progress {
        consumed: frac_end + 1,
        emit: Some(EmitSpec::Token(Token::Float(value))),
    })
}

fn scan_hollerith(
    data: &[u8],
    ws: usize,
    digits_start: usize,
    digits_end: usize,
) -> Result<Scan, ProtocolError> {
    let len = parse_i64(&data[digits_start..digits_end])?;
    if len < 0 {
        return Err(ProtocolError::UnrecognizedByte);
    }
    let len = len as usize;
    let header_len = digits_end + 1 - ws; // digits + 'H', relative to ws
    let total = header_len + len;
    if data.len() - ws < total {
        return Ok(Scan::NeedMore);
    }
    Ok(Scan::Progress {
        consumed: ws + total,
        emit: Some(EmitSpec::Hollerith {
            header_len,
            payload_len: len,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(events: Vec<TokenizerEvent>) -> Vec<Token> {
        events
            .into_iter()
            .filter_map(|e| match e {
                TokenizerEvent::Token(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn handshake_then_partial_int_flushed_at_end() {
        let mut tz = Tokenizer::new(true);
        let mut events = tz.feed(b"Lys").unwrap();
        assert!(events.is_empty());
        events.extend(tz.feed(b"KOM\n10").unwrap());
        assert_eq!(events[0], TokenizerEvent::Handshake);
        assert_eq!(events.len(), 1);
        let tail = tz.end().unwrap();
        assert_eq!(tokens_of(tail), vec![Token::Int { value: 10, raw: Bytes::from_static(b"10") }]);
    }

    #[test]
    fn bad_handshake_prefix_is_fatal() {
        let mut tz = Tokenizer::new(true);
        let err = tz.feed(b"Xys").unwrap_err();
        assert_eq!(err, ProtocolError::BadHandshake);
    }

    #[test]
    fn server_error_during_handshake_is_fatal() {
        let mut tz = Tokenizer::new(true);
        let err = tz.feed(b"%%disk almost full\n").unwrap_err();
        assert_eq!(err, ProtocolError::ServerErrorDuringHandshake);
    }

    #[test]
    fn tokenizes_every_chunk_boundary_identically() {
        let whole = b"4711 1234 6Hfoobar\n";
        let one_shot = {
            let mut tz = Tokenizer::new(false);
            let mut ev = tz.feed(whole).unwrap();
            ev.extend(tz.end().unwrap());
            tokens_of(ev)
        };
        for split in 0..whole.len() {
            let mut tz = Tokenizer::new(false);
            let mut ev = tz.feed(&whole[..split]).unwrap();
            ev.extend(tz.feed(&whole[split..]).unwrap());
            ev.extend(tz.end().unwrap());
            assert_eq!(tokens_of(ev), one_shot, "split at {split}");
        }
    }

    #[test]
    fn server_error_out_of_band() {
        let mut tz = Tokenizer::new(false);
        let mut events = tz.feed(b"%%disk almost full\n=10 1\n").unwrap();
        events.extend(tz.end().unwrap());
        assert_eq!(
            events[0],
            TokenizerEvent::ServerError(Bytes::from_static(b"disk almost full"))
        );
        assert_eq!(events[1], TokenizerEvent::Token(Token::Equals));
    }

    #[test]
    fn float_token() {
        let mut tz = Tokenizer::new(false);
        let mut ev = tz.feed(b"3.25 ").unwrap();
        ev.extend(tz.end().unwrap());
        assert_eq!(tokens_of(ev), vec![Token::Float(3.25)]);
    }

    #[test]
    fn structural_tokens() {
        let mut tz = Tokenizer::new(false);
        let mut ev = tz.feed(b"{ } * = % :").unwrap();
        ev.extend(tz.end().unwrap());
        assert_eq!(
            tokens_of(ev),
            vec![
                Token::OpenBrace,
                Token::CloseBrace,
                Token::Star,
                Token::Equals,
                Token::Percent,
                Token::Colon,
            ]
        );
    }
}
