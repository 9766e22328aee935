/*
 * Created on Sat Feb 04 2023
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

//! The four disjoint error kinds a caller of this crate can observe.

use std::fmt;

pub type ClientResult<T> = Result<T, ClientLibError>;

/// A protocol-level violation: the tokenizer or a schema parser saw bytes
/// that cannot be interpreted under the grammar. Always fatal to the
/// connection it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// the handshake preface didn't match `LysKOM\n`
    BadHandshake,
    /// a server-error (`%%`) frame arrived before the handshake completed
    ServerErrorDuringHandshake,
    /// a byte sequence matched none of the tokenizer's grammar productions
    UnrecognizedByte,
    /// trailing, incomplete bytes remained after the stream ended
    TruncatedAtEof,
    /// a schema saw a token of the wrong kind (e.g. a string where an int
    /// was expected)
    UnexpectedToken,
    /// an array's declared length didn't match the number of elements its
    /// content actually encoded
    ArrayLengthMismatch,
    /// the dispatcher received a reply or error keyed to a `refNo` with no
    /// matching in-flight request
    UnknownReferenceNumber,
    /// a numeric literal overflowed the type it was being parsed into
    NumericOverflow,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::BadHandshake => "server handshake did not match the expected preface",
            Self::ServerErrorDuringHandshake => "server sent an error frame during handshake",
            Self::UnrecognizedByte => "unrecognized byte in the token stream",
            Self::TruncatedAtEof => "stream ended with an incomplete token pending",
            Self::UnexpectedToken => "token did not match the expected schema",
            Self::ArrayLengthMismatch => "array content did not match its declared length",
            Self::UnknownReferenceNumber => "reply or error referenced an unknown request",
            Self::NumericOverflow => "numeric literal overflowed",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ProtocolError {}

/// A caller-supplied parameter was rejected by a formatter before any bytes
/// went on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// the named RPC isn't in the catalogue
    UnknownRpc(String),
    /// a structure was missing a required field
    MissingField(&'static str),
    /// a value didn't match the schema's expected shape
    WrongType(&'static str),
    /// a string parameter contained a codepoint with no Latin-1
    /// representation
    NotLatin1,
    /// the caller already has `max_in_flight` requests outstanding
    TooManyInFlight,
    /// the session is not in the `Open` state
    NotConnected,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRpc(name) => write!(f, "no such RPC `{name}` in the catalogue"),
            Self::MissingField(name) => write!(f, "missing required field `{name}`"),
            Self::WrongType(expected) => write!(f, "value did not match expected type `{expected}`"),
            Self::NotLatin1 => write!(f, "string is not representable in Latin-1"),
            Self::TooManyInFlight => write!(f, "too many requests in flight"),
            Self::NotConnected => write!(f, "session is not open"),
        }
    }
}

impl std::error::Error for ClientError {}

/// A server `%` reply correlated to a specific in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub error_code: i32,
    pub error_name: String,
    pub error_status: i32,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (code {}, status {})",
            self.error_name, self.error_code, self.error_status
        )
    }
}

impl std::error::Error for RequestError {}

/// Every way a call to this library can fail, folded into one type so
/// `Client::call` has a single error to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientLibError {
    Client(ClientError),
    Request(RequestError),
    Protocol(ProtocolError),
    /// the underlying socket reported an I/O failure; carries the OS error
    /// message since `std::io::Error` isn't `Clone`/`PartialEq`
    Io(String),
    /// `close()` was called (or a fatal error closed the session) while
    /// this request was still pending
    Closed,
    /// a server `%%` out-of-band message, surfaced through the `on_error`
    /// lifecycle stream rather than a specific request's result
    Server(ServerError),
}

impl fmt::Display for ClientLibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(e) => e.fmt(f),
            Self::Request(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Closed => write!(f, "session is closed"),
            Self::Server(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ClientLibError {}

impl From<ClientError> for ClientLibError {
    fn from(e: ClientError) -> Self {
        Self::Client(e)
    }
}

impl From<ProtocolError> for ClientLibError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<RequestError> for ClientLibError {
    fn from(e: RequestError) -> Self {
        Self::Request(e)
    }
}

/// A server `%%` out-of-band message. Reported via the `error` lifecycle
/// event; the connection survives it outside the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError(pub String);

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server error: {}", self.0)
    }
}

impl std::error::Error for ServerError {}

impl From<ServerError> for ClientLibError {
    fn from(e: ServerError) -> Self {
        Self::Server(e)
    }
}
