/*
 * Created on Wed Sep 20 2023
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

//! Declarative schemas: a sum type describing how to parse and format one
//! protocol element, composed recursively by value (never by inheritance).
//! A [`Schema`] is pure data; [`Parser`] is the resumable computation that
//! walks tokens against one, mirroring the `resume`/state-enum idiom this
//! workspace already uses for its handshake and query-exchange state
//! machines, but over a token slice instead of a byte slice.

use crate::{
    error::{ClientError, ProtocolError},
    token::Token,
};
use bytes::{BufMut, Bytes, BytesMut};

/// A type value describing how to parse and format one protocol element.
#[derive(Debug, Clone)]
pub enum Schema {
    Empty,
    Int32,
    Bool,
    HollerithString,
    Bitstring {
        flags: Vec<&'static str>,
        width: u8,
    },
    Structure(Vec<(&'static str, Schema)>),
    Array(Box<Schema>),
}

impl Schema {
    pub fn structure(fields: impl Into<Vec<(&'static str, Schema)>>) -> Self {
        Self::Structure(fields.into())
    }
    pub fn array(elem: Schema) -> Self {
        Self::Array(Box::new(elem))
    }
    pub fn bitstring(flags: impl Into<Vec<&'static str>>, width: u8) -> Self {
        let flags = flags.into();
        debug_assert!(flags.len() <= width as usize);
        Self::Bitstring { flags, width }
    }
}

/// The runtime value a [`Schema`] parses into, and the value a caller
/// builds to format a request against one. The same representation is used
/// in both directions, per the wire pipeline's symmetric parser/formatter
/// contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Int(i32),
    Bool(bool),
    /// a Hollerith payload, opaque bytes (by convention Latin-1)
    Bytes(Bytes),
    /// one entry per schema-declared flag name, in schema order
    Flags(Vec<(&'static str, bool)>),
    /// one entry per schema-declared field, in schema order
    Struct(Vec<(&'static str, Value)>),
    Array(Vec<Value>),
}

impl Value {
    pub fn int(v: i32) -> Self {
        Self::Int(v)
    }
    pub fn boolean(v: bool) -> Self {
        Self::Bool(v)
    }
    pub fn bytes(v: impl Into<Bytes>) -> Self {
        Self::Bytes(v.into())
    }
    /// encode a UTF-8 string to Latin-1 for use as a Hollerith payload
    pub fn latin1(s: &str) -> Result<Self, ClientError> {
        let mut out = Vec::with_capacity(s.len());
        for ch in s.chars() {
            let codepoint = ch as u32;
            if codepoint > 0xFF {
                return Err(ClientError::NotLatin1);
            }
            out.push(codepoint as u8);
        }
        Ok(Self::Bytes(Bytes::from(out)))
    }
    pub fn flags(pairs: impl Into<Vec<(&'static str, bool)>>) -> Self {
        Self::Flags(pairs.into())
    }
    pub fn structure(fields: impl Into<Vec<(&'static str, Value)>>) -> Self {
        Self::Struct(fields.into())
    }
    pub fn array(elems: impl Into<Vec<Value>>) -> Self {
        Self::Array(elems.into())
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
    /// decode a Hollerith payload as Latin-1 text
    pub fn as_latin1(&self) -> Option<String> {
        self.as_bytes()
            .map(|b| b.iter().map(|&byte| byte as char).collect())
    }
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }
    /// look up a named field of a `Struct` value
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v),
            _ => None,
        }
    }
    /// look up a named flag of a `Flags` value
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self {
            Self::Flags(flags) => flags.iter().find(|(n, _)| *n == name).map(|(_, v)| *v),
            _ => None,
        }
    }
}

/* -------------------------------------------------------------------- */
/* formatting                                                            */
/* -------------------------------------------------------------------- */

impl Schema {
    /// Write this schema's own minimal on-wire text, with no leading or
    /// trailing separator. The caller (a containing array, structure, or
    /// the request formatter) is responsible for the single space that
    /// precedes whatever slot this value occupies.
    pub(crate) fn format_bare(&self, value: &Value, out: &mut BytesMut) -> Result<(), ClientError> {
        match (self, value) {
            (Schema::Empty, Value::Empty) => Ok(()),
            (Schema::Int32, Value::Int(v)) => {
                write_decimal(*v as i64, out);
                Ok(())
            }
            (Schema::Bool, Value::Bool(v)) => {
                out.put_u8(if *v { b'1' } else { b'0' });
                Ok(())
            }
            (Schema::HollerithString, Value::Bytes(b)) => {
                write_decimal(b.len() as i64, out);
                out.put_u8(b'H');
                out.put_slice(b);
                Ok(())
            }
            (Schema::Bitstring { flags, width }, Value::Flags(pairs)) => {
                for name in flags.iter() {
                    let set = pairs
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, v)| *v)
                        .unwrap_or(false);
                    out.put_u8(if set { b'1' } else { b'0' });
                }
                for (name, _) in pairs.iter() {
                    if !flags.contains(name) {
                        return Err(ClientError::WrongType("undeclared bitstring flag"));
                    }
                }
                for _ in flags.len()..*width as usize {
                    out.put_u8(b'0');
                }
                Ok(())
            }
            (Schema::Structure(fields), Value::Struct(given)) => {
                for (i, (name, field_schema)) in fields.iter().enumerate() {
                    let field_value = given
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, v)| v)
                        .ok_or(ClientError::MissingField(name))?;
                    if i > 0 {
                        out.put_u8(b' ');
                    }
                    field_schema.format_bare(field_value, out)?;
                }
                Ok(())
            }
            (Schema::Array(elem), Value::Array(elems)) => {
                write_decimal(elems.len() as i64, out);
                out.put_slice(b" {");
                for e in elems {
                    out.put_u8(b' ');
                    elem.format_bare(e, out)?;
                }
                out.put_slice(b" }");
                Ok(())
            }
            _ => Err(ClientError::WrongType(schema_kind(self))),
        }
    }

    /// Write this schema's value preceded by exactly one space: the shape
    /// every field takes when it is a direct child of something else
    /// (a structure field, an array element, or a top-level request
    /// parameter).
    pub(crate) fn format_field(&self, value: &Value, out: &mut BytesMut) -> Result<(), ClientError> {
        out.put_u8(b' ');
        self.format_bare(value, out)
    }

    /// Format the fields of a request's top-level parameter structure, each
    /// preceded by a space (there is no "first field is bare" exception at
    /// the top level: the request's refNo and RPC number already preceded
    /// these fields in the output).
    pub(crate) fn format_request_fields(
        &self,
        value: &Value,
        out: &mut BytesMut,
    ) -> Result<(), ClientError> {
        match (self, value) {
            (Schema::Empty, Value::Empty) => Ok(()),
            (Schema::Structure(fields), Value::Struct(given)) => {
                for (name, field_schema) in fields {
                    let field_value = given
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, v)| v)
                        .ok_or(ClientError::MissingField(name))?;
                    field_schema.format_field(field_value, out)?;
                }
                Ok(())
            }
            _ => Err(ClientError::WrongType(schema_kind(self))),
        }
    }
}

fn schema_kind(s: &Schema) -> &'static str {
    match s {
        Schema::Empty => "empty",
        Schema::Int32 => "int32",
        Schema::Bool => "bool",
        Schema::HollerithString => "string",
        Schema::Bitstring { .. } => "bitstring",
        Schema::Structure(_) => "structure",
        Schema::Array(_) => "array",
    }
}

fn write_decimal(v: i64, out: &mut BytesMut) {
    // values here are always non-negative on the wire (lengths, refNos,
    // protocol ints); format via a small stack buffer rather than pulling
    // in `itoa`
    if v == 0 {
        out.put_u8(b'0');
        return;
    }
    let mut buf = [0u8; 20];
    let mut i = buf.len();
    let mut n = v.unsigned_abs();
    while n > 0 {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
    }
    if v < 0 {
        out.put_u8(b'-');
    }
    out.put_slice(&buf[i..]);
}

/* -------------------------------------------------------------------- */
/* parsing                                                               */
/* -------------------------------------------------------------------- */

/// A cursor over an in-memory token slice, consumed one token at a time.
/// Running out of tokens is not an error: it means the active parser
/// should suspend and wait for more to arrive.
pub struct TokenCursor<'a> {
    toks: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(toks: &'a [Token]) -> Self {
        Self { toks, pos: 0 }
    }
    pub fn peek(&self) -> Option<&'a Token> {
        self.toks.get(self.pos)
    }
    pub fn next(&mut self) -> Option<&'a Token> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }
    /// how many tokens have been consumed so far
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

/// Result of advancing a [`Parser`] by whatever tokens are currently
/// available.
#[derive(Debug)]
pub enum Progress {
    Pending,
    Done(Value),
}

/// A resumable parse in progress against one [`Schema`]. Holds exactly the
/// partial state needed to continue: which field a structure is on and what
/// it has already collected, or how many array elements have been read so
/// far.
pub struct Parser {
    node: ParserNode,
}

impl Parser {
    pub fn new(schema: &Schema) -> Self {
        Self {
            node: ParserNode::new(schema),
        }
    }

    /// Drive the parser with whatever tokens `cursor` can supply. On
    /// `Pending`, `cursor.consumed()` still reports how many tokens were
    /// consumed before running out — the caller should drop that many from
    /// its buffer regardless of outcome.
    pub fn advance(
        &mut self,
        schema: &Schema,
        cursor: &mut TokenCursor,
    ) -> Result<Progress, ProtocolError> {
        self.node.advance(schema, cursor)
    }
}

enum ParserNode {
    /// Empty, Int32, Bool, HollerithString, Bitstring: all consume at most
    /// one token and need no state of their own
    Scalar,
    Structure {
        idx: usize,
        done: Vec<(&'static str, Value)>,
        current: Option<Box<ParserNode>>,
    },
    Array {
        state: ArrayState,
    },
}

enum ArrayState {
    AwaitLen,
    AwaitOpenOrStar(u64),
    Elements {
        len: u64,
        done: Vec<Value>,
        current: Option<Box<ParserNode>>,
    },
}

impl ParserNode {
    fn new(schema: &Schema) -> Self {
        match schema {
            Schema::Structure(_) => ParserNode::Structure {
                idx: 0,
                done: Vec::new(),
                current: None,
            },
            Schema::Array(_) => ParserNode::Array {
                state: ArrayState::AwaitLen,
            },
            _ => ParserNode::Scalar,
        }
    }

    fn advance(&mut self, schema: &Schema, cursor: &mut TokenCursor) -> Result<Progress, ProtocolError> {
        match (self, schema) {
            (ParserNode::Scalar, _) => parse_scalar(schema, cursor),
            (ParserNode::Structure { idx, done, current }, Schema::Structure(fields)) => {
                loop {
                    if *idx >= fields.len() {
                        return Ok(Progress::Done(Value::Struct(std::mem::take(done))));
                    }
                    let (name, field_schema) = &fields[*idx];
                    if current.is_none() {
                        *current = Some(Box::new(ParserNode::new(field_schema)));
                    }
                    match current.as_mut().unwrap().advance(field_schema, cursor)? {
                        Progress::Pending => return Ok(Progress::Pending),
                        Progress::Done(v) => {
                            done.push((*name, v));
                            *current = None;
                            *idx += 1;
                        }
                    }
                }
            }
            (ParserNode::Array { state }, Schema::Array(elem_schema)) => {
                advance_array(state, elem_schema, cursor)
            }
            _ => unreachable!("ParserNode kind always matches the Schema it was built from"),
        }
    }
}

fn parse_scalar(schema: &Schema, cursor: &mut TokenCursor) -> Result<Progress, ProtocolError> {
    match schema {
        Schema::Empty => Ok(Progress::Done(Value::Empty)),
        Schema::Int32 => {
            let tok = match cursor.next() {
                Some(t) => t,
                None => return Ok(Progress::Pending),
            };
            match tok {
                Token::Int { value, .. } => {
                    let v = i32::try_from(*value).map_err(|_| ProtocolError::NumericOverflow)?;
                    Ok(Progress::Done(Value::Int(v)))
                }
                _ => Err(ProtocolError::UnexpectedToken),
            }
        }
        Schema::Bool => {
            let tok = match cursor.next() {
                Some(t) => t,
                None => return Ok(Progress::Pending),
            };
            match tok {
                Token::Int { value, .. } => Ok(Progress::Done(Value::Bool(*value != 0))),
                _ => Err(ProtocolError::UnexpectedToken),
            }
        }
        Schema::HollerithString => {
            let tok = match cursor.next() {
                Some(t) => t,
                None => return Ok(Progress::Pending),
            };
            match tok {
                Token::String(b) => Ok(Progress::Done(Value::Bytes(b.clone()))),
                _ => Err(ProtocolError::UnexpectedToken),
            }
        }
        Schema::Bitstring { flags, width } => {
            let tok = match cursor.next() {
                Some(t) => t,
                None => return Ok(Progress::Pending),
            };
            match tok {
                Token::Int { raw, .. } => {
                    if raw.len() != *width as usize || !raw.iter().all(|&b| b == b'0' || b == b'1') {
                        return Err(ProtocolError::UnexpectedToken);
                    }
                    let pairs = flags
                        .iter()
                        .enumerate()
                        .map(|(i, name)| (*name, raw[i] == b'1'))
                        .collect();
                    Ok(Progress::Done(Value::Flags(pairs)))
                }
                _ => Err(ProtocolError::UnexpectedToken),
            }
        }
        Schema::Structure(_) | Schema::Array(_) => {
            unreachable!("composite schemas never reach parse_scalar")
        }
    }
}

fn advance_array(
    state: &mut ArrayState,
    elem_schema: &Schema,
    cursor: &mut TokenCursor,
) -> Result<Progress, ProtocolError> {
    loop {
        match state {
            ArrayState::AwaitLen => {
                let tok = match cursor.next() {
                    Some(t) => t,
                    None => return Ok(Progress::Pending),
                };
                match tok {
                    Token::Int { value, .. } if *value >= 0 => {
                        *state = ArrayState::AwaitOpenOrStar(*value as u64);
                    }
                    _ => return Err(ProtocolError::UnexpectedToken),
                }
            }
            ArrayState::AwaitOpenOrStar(len) => {
                let len = *len;
                let tok = match cursor.next() {
                    Some(t) => t,
                    None => return Ok(Progress::Pending),
                };
                match tok {
                    Token::Star => {
                        return Ok(Progress::Done(Value::Array(vec![Value::Empty; len as usize])));
                    }
                    Token::OpenBrace => {
                        *state = ArrayState::Elements {
                            len,
                            done: Vec::new(),
                            current: None,
                        };
                    }
                    _ => return Err(ProtocolError::UnexpectedToken),
                }
            }
            ArrayState::Elements { len, done, current } => {
                if done.len() as u64 == *len {
                    let tok = match cursor.next() {
                        Some(t) => t,
                        None => return Ok(Progress::Pending),
                    };
                    return match tok {
                        Token::CloseBrace => Ok(Progress::Done(Value::Array(std::mem::take(done)))),
                        _ => Err(ProtocolError::ArrayLengthMismatch),
                    };
                }
                if current.is_none() {
                    if cursor.peek() == Some(&Token::CloseBrace) {
                        return Err(ProtocolError::ArrayLengthMismatch);
                    }
                    *current = Some(Box::new(ParserNode::new(elem_schema)));
                }
                match current.as_mut().unwrap().advance(elem_schema, cursor)? {
                    Progress::Pending => return Ok(Progress::Pending),
                    Progress::Done(v) => {
                        done.push(v);
                        *current = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, Tokenizer};

    fn tokenize(bytes: &[u8]) -> Vec<Token> {
        let mut tz = Tokenizer::new(false);
        let mut events = tz.feed(bytes).unwrap();
        events.extend(tz.end().unwrap());
        events
            .into_iter()
            .filter_map(|e| match e {
                crate::token::TokenizerEvent::Token(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn parse_complete(schema: &Schema, bytes: &[u8]) -> Value {
        let toks = tokenize(bytes);
        let mut parser = Parser::new(schema);
        let mut cursor = TokenCursor::new(&toks);
        match parser.advance(schema, &mut cursor).unwrap() {
            Progress::Done(v) => v,
            Progress::Pending => panic!("expected parser to finish on {bytes:?}"),
        }
    }

    /// Format `value` against `schema`, tokenize the result, re-parse it
    /// against the same schema, and assert the reconstructed value equals
    /// the original. This is the round-trip invariant every composite
    /// schema kind must uphold.
    fn assert_round_trips(schema: &Schema, value: &Value) {
        let mut out = BytesMut::new();
        schema.format_bare(value, &mut out).unwrap();
        out.put_u8(b' ');
        let reparsed = parse_complete(schema, &out);
        assert_eq!(&reparsed, value, "round-trip mismatch for {out:?}");
    }

    #[test]
    fn logout_roundtrip() {
        let schema = Schema::Empty;
        let value = Value::Empty;
        let mut out = BytesMut::new();
        schema.format_request_fields(&value, &mut out).unwrap();
        assert_eq!(&out[..], b"");
    }

    #[test]
    fn login_format() {
        let schema = Schema::structure([
            ("person", Schema::Int32),
            ("passwd", Schema::HollerithString),
            ("invisible", Schema::Bool),
        ]);
        let value = Value::structure([
            ("person", Value::int(4711)),
            ("passwd", Value::latin1("hämligt").unwrap()),
            ("invisible", Value::boolean(true)),
        ]);
        let mut out = BytesMut::new();
        schema.format_request_fields(&value, &mut out).unwrap();
        assert_eq!(&out[..], b" 4711 7Hh\xe4mligt 1");
    }

    #[test]
    fn accept_async_array_format() {
        let schema = Schema::structure([("requestList", Schema::array(Schema::Int32))]);
        let value = Value::structure([(
            "requestList",
            Value::array([Value::int(12), Value::int(8), Value::int(4)]),
        )]);
        let mut out = BytesMut::new();
        schema.format_request_fields(&value, &mut out).unwrap();
        assert_eq!(&out[..], b" 3 { 12 8 4 }");
    }

    #[test]
    fn create_person_bitstring_and_array_of_struct() {
        let aux_item = Schema::structure([
            ("tag", Schema::Int32),
            ("flags", Schema::bitstring(["inherit", "dontGarb"], 8)),
            ("inheritLimit", Schema::Int32),
            ("data", Schema::HollerithString),
        ]);
        let schema = Schema::structure([
            ("name", Schema::HollerithString),
            ("passwd", Schema::HollerithString),
            ("flags", Schema::bitstring(["unreadIsSecret"], 8)),
            ("auxItems", Schema::array(aux_item)),
        ]);
        let value = Value::structure([
            ("name", Value::latin1("foo").unwrap()),
            ("passwd", Value::latin1("bar").unwrap()),
            ("flags", Value::flags([("unreadIsSecret", true)])),
            (
                "auxItems",
                Value::array([
                    Value::structure([
                        ("tag", Value::int(17)),
                        ("flags", Value::flags([("inherit", true), ("dontGarb", true)])),
                        ("inheritLimit", Value::int(0)),
                        ("data", Value::latin1("gazonk").unwrap()),
                    ]),
                    Value::structure([
                        ("tag", Value::int(18)),
                        ("flags", Value::flags([])),
                        ("inheritLimit", Value::int(10)),
                        ("data", Value::latin1("").unwrap()),
                    ]),
                ]),
            ),
        ]);
        let mut out = BytesMut::new();
        schema.format_request_fields(&value, &mut out).unwrap();
        assert_eq!(
            &out[..],
            &b" 3Hfoo 3Hbar 10000000 2 { 17 01001000 0 6Hgazonk 18 00000000 10 0H }"[..]
        );
    }

    #[test]
    fn error_reply_struct_parses_byte_by_byte() {
        let schema = Schema::structure([("errorCode", Schema::Int32), ("errorStatus", Schema::Int32)]);
        let whole = b"4 4711 ";
        for split in 0..whole.len() {
            let mut tz = Tokenizer::new(false);
            let mut events = tz.feed(&whole[..split]).unwrap();
            events.extend(tz.feed(&whole[split..]).unwrap());
            events.extend(tz.end().unwrap());
            let toks: Vec<Token> = events
                .into_iter()
                .filter_map(|e| match e {
                    crate::token::TokenizerEvent::Token(t) => Some(t),
                    _ => None,
                })
                .collect();
            let mut parser = Parser::new(&schema);
            let mut cursor = TokenCursor::new(&toks);
            match parser.advance(&schema, &mut cursor).unwrap() {
                Progress::Done(v) => {
                    assert_eq!(v.field("errorCode").unwrap().as_int(), Some(4));
                    assert_eq!(v.field("errorStatus").unwrap().as_int(), Some(4711));
                }
                Progress::Pending => panic!("split {split} left parser pending"),
            }
        }
    }

    #[test]
    fn send_message_async_payload() {
        let schema = Schema::structure([
            ("recipient", Schema::Int32),
            ("sender", Schema::Int32),
            ("message", Schema::HollerithString),
        ]);
        let value = parse_complete(&schema, b"4711 1234 6Hfoobar ");
        assert_eq!(value.field("recipient").unwrap().as_int(), Some(4711));
        assert_eq!(value.field("sender").unwrap().as_int(), Some(1234));
        assert_eq!(
            value.field("message").unwrap().as_bytes().unwrap().as_ref(),
            b"foobar"
        );
    }

    #[test]
    fn array_length_mismatch_is_fatal() {
        let elem = Schema::structure([
            ("name", Schema::HollerithString),
            ("kind", Schema::bitstring(["a", "b", "c", "d"], 4)),
            ("confNo", Schema::Int32),
        ]);
        let schema = Schema::array(elem);
        let toks = tokenize(b"2 { 3Hfoo 1001 4711 } ");
        let mut parser = Parser::new(&schema);
        let mut cursor = TokenCursor::new(&toks);
        let err = parser.advance(&schema, &mut cursor).unwrap_err();
        assert_eq!(err, ProtocolError::ArrayLengthMismatch);
    }

    #[test]
    fn length_only_array_is_empty() {
        let schema = Schema::array(Schema::Int32);
        let value = parse_complete(&schema, b"0 * ");
        assert_eq!(value.as_array().unwrap().len(), 0);
    }

    #[test]
    fn suspends_mid_structure_and_resumes() {
        let schema = Schema::structure([("a", Schema::Int32), ("b", Schema::Int32)]);
        let toks = tokenize(b"1 ");
        let mut parser = Parser::new(&schema);
        let mut cursor = TokenCursor::new(&toks);
        assert!(matches!(
            parser.advance(&schema, &mut cursor).unwrap(),
            Progress::Pending
        ));
        let toks2 = tokenize(b"2 ");
        let mut cursor2 = TokenCursor::new(&toks2);
        match parser.advance(&schema, &mut cursor2).unwrap() {
            Progress::Done(v) => {
                assert_eq!(v.field("a").unwrap().as_int(), Some(1));
                assert_eq!(v.field("b").unwrap().as_int(), Some(2));
            }
            Progress::Pending => panic!("should have finished"),
        }
    }

    #[test]
    fn structure_roundtrip() {
        let schema = Schema::structure([
            ("person", Schema::Int32),
            ("passwd", Schema::HollerithString),
            ("invisible", Schema::Bool),
        ]);
        let value = Value::structure([
            ("person", Value::int(4711)),
            ("passwd", Value::latin1("hämligt").unwrap()),
            ("invisible", Value::boolean(true)),
        ]);
        assert_round_trips(&schema, &value);
    }

    #[test]
    fn array_roundtrip() {
        let schema = Schema::array(Schema::Int32);
        let value = Value::array([Value::int(12), Value::int(8), Value::int(4)]);
        assert_round_trips(&schema, &value);
    }

    #[test]
    fn empty_array_roundtrip() {
        let schema = Schema::array(Schema::Int32);
        let value = Value::array([]);
        assert_round_trips(&schema, &value);
    }

    #[test]
    fn bitstring_roundtrip() {
        let schema = Schema::bitstring(["inherit", "dontGarb"], 8);
        let value = Value::flags([("inherit", true), ("dontGarb", false)]);
        assert_round_trips(&schema, &value);
    }

    #[test]
    fn nested_array_of_structure_with_bitstring_roundtrips() {
        let aux_item = Schema::structure([
            ("tag", Schema::Int32),
            ("flags", Schema::bitstring(["inherit", "dontGarb"], 8)),
            ("inheritLimit", Schema::Int32),
            ("data", Schema::HollerithString),
        ]);
        let schema = Schema::structure([
            ("name", Schema::HollerithString),
            ("passwd", Schema::HollerithString),
            ("flags", Schema::bitstring(["unreadIsSecret"], 8)),
            ("auxItems", Schema::array(aux_item)),
        ]);
        let value = Value::structure([
            ("name", Value::latin1("foo").unwrap()),
            ("passwd", Value::latin1("bar").unwrap()),
            ("flags", Value::flags([("unreadIsSecret", true)])),
            (
                "auxItems",
                Value::array([
                    Value::structure([
                        ("tag", Value::int(17)),
                        ("flags", Value::flags([("inherit", true), ("dontGarb", true)])),
                        ("inheritLimit", Value::int(0)),
                        ("data", Value::latin1("gazonk").unwrap()),
                    ]),
                    Value::structure([
                        ("tag", Value::int(18)),
                        ("flags", Value::flags([])),
                        ("inheritLimit", Value::int(10)),
                        ("data", Value::latin1("").unwrap()),
                    ]),
                ]),
            ),
        ]);
        assert_round_trips(&schema, &value);
    }
}
