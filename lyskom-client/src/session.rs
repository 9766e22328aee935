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

//! The session/dispatch core: owns the socket, drives the handshake,
//! allocates reference numbers, serializes outbound requests and routes
//! inbound tokens to the right parser. One background `tokio::task` holds
//! all of this mutable state exclusively — the same "single owner, message
//! passing in" shape a connection handler uses, just with a command channel
//! standing in for the listener's accept loop.

use crate::{
    catalogue::{catalogue, Catalogue},
    error::{ClientError, ClientLibError, ClientResult, ProtocolError, RequestError, ServerError},
    schema::{Progress, Schema, TokenCursor, Value},
    token::{Token, Tokenizer, TokenizerEvent},
};
use bytes::{BufMut, BytesMut};
use log::{debug, error, warn};
use std::{collections::HashMap, collections::VecDeque, sync::Arc};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    net::TcpStream,
    sync::{mpsc, oneshot, Semaphore},
};

pub type Params = Value;
pub type Response = Value;

const READ_BUF_CAP: usize = 8192;
/// default bound on concurrently outstanding requests per [`Client`]
const DEFAULT_MAX_IN_FLIGHT: usize = 1024;

/// Connection parameters for [`connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    /// upper bound on requests this client will have outstanding at once;
    /// `call` suspends the caller rather than growing the in-flight table
    /// without bound once this is reached
    pub max_in_flight: usize,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new("localhost", 4894)
    }
}

/// A live session with a LysKOM server. Cheap to clone: every clone shares
/// the same background dispatcher task and backpressure semaphore.
#[derive(Clone)]
pub struct Client {
    cmd_tx: mpsc::UnboundedSender<Command>,
    semaphore: Arc<Semaphore>,
}

enum Command {
    Call {
        name: String,
        params: Params,
        resolver: oneshot::Sender<ClientResult<Response>>,
    },
    OnAsync {
        name: String,
        handler: Box<dyn Fn(Response) + Send + 'static>,
    },
    OnError(Box<dyn Fn(ClientLibError) + Send + 'static>),
    OnClose(Box<dyn Fn() + Send + 'static>),
    Close,
}

struct InFlight {
    response_schema: &'static Schema,
    resolver: oneshot::Sender<ClientResult<Response>>,
}

/// Connect to a LysKOM server, complete the handshake, and spawn the
/// background dispatcher. Resolves only after the server's `LysKOM\n`
/// preface has been seen.
pub async fn connect(opts: ConnectOptions) -> ClientResult<Client> {
    let stream = TcpStream::connect((opts.host.as_str(), opts.port))
        .await
        .map_err(io_err)?;
    let (mut read_half, mut write_half) = tokio::io::split(stream);

    let ident = client_identity();
    let preface = format!("A{}H{}\n", ident.len(), ident);
    write_half
        .write_all(preface.as_bytes())
        .await
        .map_err(io_err)?;

    let mut tokenizer = Tokenizer::new(true);
    let mut read_buf = vec![0u8; READ_BUF_CAP];
    let mut pending = VecDeque::new();
    loop {
        let n = read_half.read(&mut read_buf).await.map_err(io_err)?;
        if n == 0 {
            return Err(ClientLibError::Io(
                "connection closed during handshake".into(),
            ));
        }
        let events = tokenizer.feed(&read_buf[..n]).map_err(ClientLibError::from)?;
        let mut shook_hands = false;
        for event in events {
            match event {
                TokenizerEvent::Handshake => shook_hands = true,
                TokenizerEvent::Token(t) => pending.push_back(t),
                TokenizerEvent::ServerError(_) => {
                    unreachable!("the tokenizer fails the whole `feed` call on a server-error seen before the handshake completes")
                }
            }
        }
        if shook_hands {
            break;
        }
    }

    debug!("handshake complete, {} {}", opts.host, opts.port);
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let semaphore = Arc::new(Semaphore::new(opts.max_in_flight.max(1)));
    tokio::spawn(run_dispatcher(
        read_half, write_half, tokenizer, pending, cmd_rx,
    ));
    Ok(Client { cmd_tx, semaphore })
}

fn io_err(e: std::io::Error) -> ClientLibError {
    ClientLibError::Io(e.to_string())
}

fn client_identity() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    format!("{user}%{host}")
}

impl Client {
    /// Invoke a catalogue RPC by name. This is the one real entry point;
    /// every typed convenience method below is a thin wrapper over it.
    pub async fn call_by_name(&self, name: &str, params: Params) -> ClientResult<Response> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ClientLibError::Closed)?;
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Call {
                name: name.to_string(),
                params,
                resolver: tx,
            })
            .map_err(|_| ClientLibError::Closed)?;
        let result = rx.await.map_err(|_| ClientLibError::Closed)?;
        drop(permit);
        result
    }

    /// Like [`Client::call_by_name`], but fails synchronously with
    /// [`ClientError::TooManyInFlight`] instead of waiting for a slot.
    pub fn try_call_by_name(
        &self,
        name: &str,
        params: Params,
    ) -> Result<impl std::future::Future<Output = ClientResult<Response>> + '_, ClientError> {
        let permit = self
            .semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| ClientError::TooManyInFlight)?;
        let name = name.to_string();
        Ok(async move {
            let (tx, rx) = oneshot::channel();
            self.cmd_tx
                .send(Command::Call {
                    name,
                    params,
                    resolver: tx,
                })
                .map_err(|_| ClientLibError::Closed)?;
            let result = rx.await.map_err(|_| ClientLibError::Closed)?;
            drop(permit);
            result
        })
    }

    pub fn on_async(&self, name: impl Into<String>, handler: impl Fn(Response) + Send + 'static) {
        let _ = self.cmd_tx.send(Command::OnAsync {
            name: name.into(),
            handler: Box::new(handler),
        });
    }

    pub fn on_error(&self, handler: impl Fn(ClientLibError) + Send + 'static) {
        let _ = self.cmd_tx.send(Command::OnError(Box::new(handler)));
    }

    pub fn on_close(&self, handler: impl Fn() + Send + 'static) {
        let _ = self.cmd_tx.send(Command::OnClose(Box::new(handler)));
    }

    /// Idempotent: closing an already-closed session is a no-op.
    pub async fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close);
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.call_by_name("logout", Value::Empty).await.map(|_| ())
    }

    pub async fn login(&self, person: i32, passwd: &str, invisible: bool) -> ClientResult<()> {
        let params = Value::structure([
            ("person", Value::int(person)),
            ("passwd", Value::latin1(passwd).map_err(ClientLibError::from)?),
            ("invisible", Value::boolean(invisible)),
        ]);
        self.call_by_name("login", params).await.map(|_| ())
    }

    pub async fn accept_async(&self, request_list: Vec<i32>) -> ClientResult<()> {
        let params = Value::structure([(
            "requestList",
            Value::array(request_list.into_iter().map(Value::int).collect::<Vec<_>>()),
        )]);
        self.call_by_name("acceptAsync", params).await.map(|_| ())
    }

    pub async fn create_person(
        &self,
        name: &str,
        passwd: &str,
        flags: Vec<(&'static str, bool)>,
        aux_items: Vec<Value>,
    ) -> ClientResult<i32> {
        let params = Value::structure([
            ("name", Value::latin1(name).map_err(ClientLibError::from)?),
            ("passwd", Value::latin1(passwd).map_err(ClientLibError::from)?),
            ("flags", Value::flags(flags)),
            ("auxItems", Value::array(aux_items)),
        ]);
        let response = self.call_by_name("createPerson", params).await?;
        response
            .as_int()
            .ok_or_else(|| ClientError::WrongType("int32").into())
    }

    pub async fn get_person_stat(&self, person: i32) -> ClientResult<Response> {
        let params = Value::structure([("person", Value::int(person))]);
        self.call_by_name("getPersonStat", params).await
    }

    pub async fn send_message(&self, recipient: i32, message: &str) -> ClientResult<()> {
        let params = Value::structure([
            ("recipient", Value::int(recipient)),
            ("message", Value::latin1(message).map_err(ClientLibError::from)?),
        ]);
        self.call_by_name("sendMessage", params).await.map(|_| ())
    }
}

/* -------------------------------------------------------------------- */
/* dispatcher task                                                       */
/* -------------------------------------------------------------------- */

enum FrameState {
    Idle,
    ReplyRefNo,
    ReplyBody {
        ref_no: u32,
        parser: crate::schema::Parser,
    },
    ErrorRefNo,
    ErrorCode {
        ref_no: u32,
    },
    ErrorStatus {
        ref_no: u32,
        error_code: i32,
    },
    AsyncNumParams,
    AsyncMsgNum {
        num_params: i64,
    },
    AsyncSkip {
        remaining: i64,
    },
    AsyncBody {
        name: &'static str,
        schema: &'static Schema,
        parser: crate::schema::Parser,
    },
}

#[derive(Default)]
struct AsyncHandlers {
    by_name: HashMap<String, Vec<Box<dyn Fn(Response) + Send>>>,
}

async fn run_dispatcher(
    mut read_half: ReadHalf<TcpStream>,
    mut write_half: WriteHalf<TcpStream>,
    mut tokenizer: Tokenizer,
    mut pending: VecDeque<Token>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    let catalogue = catalogue();
    let mut next_ref: u32 = 0;
    let mut in_flight: HashMap<u32, InFlight> = HashMap::new();
    let mut async_handlers = AsyncHandlers::default();
    let mut error_handlers: Vec<Box<dyn Fn(ClientLibError) + Send>> = Vec::new();
    let mut close_handlers: Vec<Box<dyn Fn() + Send>> = Vec::new();
    let mut frame = FrameState::Idle;
    let mut read_buf = vec![0u8; READ_BUF_CAP];

    // drive whatever tokens the handshake read already buffered before
    // handing the client back to `connect`
    if let Err(e) = drive_frame(&mut frame, &mut pending, catalogue, &mut in_flight, &mut async_handlers) {
        error!("protocol error draining post-handshake tokens: {e}");
        fail_all(&mut in_flight, e.clone().into());
        for h in &error_handlers {
            h(e.clone().into());
        }
        for h in &close_handlers {
            h();
        }
        return;
    }

    debug!("dispatcher running");
    loop {
        tokio::select! {
            read_result = read_half.read(&mut read_buf) => {
                let n = match read_result {
                    Ok(0) => {
                        warn!("connection closed by peer");
                        let err = ClientLibError::Io("connection closed by peer".into());
                        fail_all(&mut in_flight, err.clone());
                        for h in &error_handlers { h(err.clone()); }
                        for h in &close_handlers { h(); }
                        return;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        error!("socket read failed: {e}");
                        let err = io_err(e);
                        fail_all(&mut in_flight, err.clone());
                        for h in &error_handlers { h(err.clone()); }
                        for h in &close_handlers { h(); }
                        return;
                    }
                };
                let events = match tokenizer.feed(&read_buf[..n]) {
                    Ok(ev) => ev,
                    Err(e) => {
                        error!("tokenizer rejected the byte stream: {e}");
                        let lib_err: ClientLibError = e.into();
                        fail_all(&mut in_flight, lib_err.clone());
                        for h in &error_handlers { h(lib_err.clone()); }
                        for h in &close_handlers { h(); }
                        return;
                    }
                };
                for event in events {
                    match event {
                        TokenizerEvent::Handshake => {}
                        TokenizerEvent::Token(t) => pending.push_back(t),
                        TokenizerEvent::ServerError(msg) => {
                            let text = msg.iter().map(|&b| b as char).collect::<String>();
                            warn!("server sent an out-of-band error: {text}");
                            for h in &error_handlers {
                                h(ClientLibError::from(ServerError(text.clone())));
                            }
                        }
                    }
                }
                if let Err(e) = drive_frame(&mut frame, &mut pending, catalogue, &mut in_flight, &mut async_handlers) {
                    let lib_err: ClientLibError = e.into();
                    fail_all(&mut in_flight, lib_err.clone());
                    for h in &error_handlers { h(lib_err.clone()); }
                    for h in &close_handlers { h(); }
                    return;
                }
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    fail_all(&mut in_flight, ClientLibError::Closed);
                    for h in &close_handlers { h(); }
                    return;
                };
                match cmd {
                    Command::Call { name, params, resolver } => {
                        let Some(desc) = catalogue.rpc(&name) else {
                            let _ = resolver.send(Err(ClientError::UnknownRpc(name).into()));
                            continue;
                        };
                        let ref_no = allocate_ref_no(&mut next_ref, &in_flight);
                        let mut buf = BytesMut::new();
                        write_decimal(ref_no as i64, &mut buf);
                        buf.put_u8(b' ');
                        write_decimal(desc.number as i64, &mut buf);
                        if let Err(e) = desc.request.format_request_fields(&params, &mut buf) {
                            let _ = resolver.send(Err(e.into()));
                            continue;
                        }
                        buf.put_u8(b'\n');
                        if let Err(e) = write_half.write_all(&buf).await {
                            let _ = resolver.send(Err(io_err(e)));
                            continue;
                        }
                        in_flight.insert(ref_no, InFlight { response_schema: &desc.response, resolver });
                    }
                    Command::OnAsync { name, handler } => {
                        async_handlers.by_name.entry(name).or_default().push(handler);
                    }
                    Command::OnError(h) => error_handlers.push(h),
                    Command::OnClose(h) => close_handlers.push(h),
                    Command::Close => {
                        debug!("close requested, {} request(s) still in flight", in_flight.len());
                        fail_all(&mut in_flight, ClientLibError::Closed);
                        for h in &close_handlers { h(); }
                        return;
                    }
                }
            }
        }
    }
}

fn allocate_ref_no(counter: &mut u32, in_flight: &HashMap<u32, InFlight>) -> u32 {
    loop {
        let candidate = *counter;
        *counter = counter.wrapping_add(1);
        if !in_flight.contains_key(&candidate) {
            return candidate;
        }
    }
}

fn fail_all(in_flight: &mut HashMap<u32, InFlight>, err: ClientLibError) {
    for (_, infl) in in_flight.drain() {
        let _ = infl.resolver.send(Err(err.clone()));
    }
}

fn write_decimal(v: i64, out: &mut BytesMut) {
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

fn drive_frame(
    frame: &mut FrameState,
    pending: &mut VecDeque<Token>,
    catalogue: &'static Catalogue,
    in_flight: &mut HashMap<u32, InFlight>,
    async_handlers: &mut AsyncHandlers,
) -> Result<(), ProtocolError> {
    loop {
        match frame {
            FrameState::Idle => {
                let Some(tok) = pending.pop_front() else {
                    return Ok(());
                };
                *frame = match tok {
                    Token::Equals => FrameState::ReplyRefNo,
                    Token::Percent => FrameState::ErrorRefNo,
                    Token::Colon => FrameState::AsyncNumParams,
                    _ => return Err(ProtocolError::UnexpectedToken),
                };
            }
            FrameState::ReplyRefNo => {
                let Some(tok) = pending.pop_front() else {
                    return Ok(());
                };
                let Token::Int { value, .. } = tok else {
                    return Err(ProtocolError::UnexpectedToken);
                };
                let ref_no = u32::try_from(value).map_err(|_| ProtocolError::NumericOverflow)?;
                let schema = in_flight
                    .get(&ref_no)
                    .ok_or(ProtocolError::UnknownReferenceNumber)?
                    .response_schema;
                *frame = FrameState::ReplyBody {
                    ref_no,
                    parser: crate::schema::Parser::new(schema),
                };
            }
            FrameState::ReplyBody { ref_no, parser } => {
                let ref_no = *ref_no;
                let schema = in_flight
                    .get(&ref_no)
                    .ok_or(ProtocolError::UnknownReferenceNumber)?
                    .response_schema;
                let toks: Vec<Token> = pending.iter().cloned().collect();
                let mut cursor = TokenCursor::new(&toks);
                match parser.advance(schema, &mut cursor)? {
                    Progress::Pending => {
                        drop_consumed(pending, cursor.consumed());
                        return Ok(());
                    }
                    Progress::Done(value) => {
                        drop_consumed(pending, cursor.consumed());
                        if let Some(infl) = in_flight.remove(&ref_no) {
                            let _ = infl.resolver.send(Ok(value));
                        }
                        *frame = FrameState::Idle;
                    }
                }
            }
            FrameState::ErrorRefNo => {
                let Some(tok) = pending.pop_front() else {
                    return Ok(());
                };
                let Token::Int { value, .. } = tok else {
                    return Err(ProtocolError::UnexpectedToken);
                };
                let ref_no = u32::try_from(value).map_err(|_| ProtocolError::NumericOverflow)?;
                *frame = FrameState::ErrorCode { ref_no };
            }
            FrameState::ErrorCode { ref_no } => {
                let ref_no = *ref_no;
                let Some(tok) = pending.pop_front() else {
                    return Ok(());
                };
                let Token::Int { value, .. } = tok else {
                    return Err(ProtocolError::UnexpectedToken);
                };
                *frame = FrameState::ErrorStatus {
                    ref_no,
                    error_code: value as i32,
                };
            }
            FrameState::ErrorStatus { ref_no, error_code } => {
                let (ref_no, error_code) = (*ref_no, *error_code);
                let Some(tok) = pending.pop_front() else {
                    return Ok(());
                };
                let Token::Int { value, .. } = tok else {
                    return Err(ProtocolError::UnexpectedToken);
                };
                let error_status = value as i32;
                if let Some(infl) = in_flight.remove(&ref_no) {
                    let err = RequestError {
                        error_code,
                        error_name: catalogue.error_name(error_code).to_string(),
                        error_status,
                    };
                    let _ = infl.resolver.send(Err(err.into()));
                } else {
                    return Err(ProtocolError::UnknownReferenceNumber);
                }
                *frame = FrameState::Idle;
            }
            FrameState::AsyncNumParams => {
                let Some(tok) = pending.pop_front() else {
                    return Ok(());
                };
                let Token::Int { value, .. } = tok else {
                    return Err(ProtocolError::UnexpectedToken);
                };
                *frame = FrameState::AsyncMsgNum { num_params: value };
            }
            FrameState::AsyncMsgNum { num_params } => {
                let num_params = *num_params;
                let Some(tok) = pending.pop_front() else {
                    return Ok(());
                };
                let Token::Int { value, .. } = tok else {
                    return Err(ProtocolError::UnexpectedToken);
                };
                let msg_num = value as i32;
                match catalogue.async_event(msg_num) {
                    Some(desc) => {
                        *frame = FrameState::AsyncBody {
                            name: desc.name,
                            schema: &desc.schema,
                            parser: crate::schema::Parser::new(&desc.schema),
                        };
                    }
                    None => {
                        *frame = FrameState::AsyncSkip {
                            remaining: num_params,
                        };
                    }
                }
            }
            FrameState::AsyncSkip { remaining } => {
                while *remaining > 0 {
                    match pending.pop_front() {
                        Some(_) => *remaining -= 1,
                        None => return Ok(()),
                    }
                }
                *frame = FrameState::Idle;
            }
            FrameState::AsyncBody { name, schema, parser } => {
                let name = *name;
                let schema = *schema;
                let toks: Vec<Token> = pending.iter().cloned().collect();
                let mut cursor = TokenCursor::new(&toks);
                match parser.advance(schema, &mut cursor)? {
                    Progress::Pending => {
                        drop_consumed(pending, cursor.consumed());
                        return Ok(());
                    }
                    Progress::Done(value) => {
                        drop_consumed(pending, cursor.consumed());
                        if let Some(handlers) = async_handlers.by_name.get(name) {
                            for h in handlers {
                                h(value.clone());
                            }
                        }
                        *frame = FrameState::Idle;
                    }
                }
            }
        }
    }
}

fn drop_consumed(pending: &mut VecDeque<Token>, n: usize) {
    for _ in 0..n {
        pending.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    /// Accepts exactly one connection, performs the server side of the
    /// handshake, and hands the caller a line-buffered stream to script the
    /// rest of the exchange with.
    async fn accept_and_handshake(listener: TcpListener) -> BufReader<TcpStream> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = BufReader::new(stream);
        let mut preface = String::new();
        server.read_line(&mut preface).await.unwrap();
        assert!(preface.starts_with('A'));
        server.write_all(b"LysKOM\n").await.unwrap();
        server
    }

    fn ref_no_of(line: &str) -> u32 {
        line.split_whitespace().next().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn out_of_order_replies_resolve_the_right_caller() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut server = accept_and_handshake(listener).await;
            let mut first = String::new();
            server.read_line(&mut first).await.unwrap();
            let mut second = String::new();
            server.read_line(&mut second).await.unwrap();
            let (r1, r2) = (ref_no_of(&first), ref_no_of(&second));
            // answer the second request first
            server
                .write_all(format!("={r2} 3Hbbb 00000000 222\n").as_bytes())
                .await
                .unwrap();
            server
                .write_all(format!("={r1} 3Haaa 00000000 111\n").as_bytes())
                .await
                .unwrap();
        });

        let client = connect(ConnectOptions::new(addr.ip().to_string(), addr.port()))
            .await
            .unwrap();
        let (first, second) = tokio::join!(client.get_person_stat(1), client.get_person_stat(2));
        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.field("username").and_then(|v| v.as_latin1()).as_deref(), Some("aaa"));
        assert_eq!(first.field("lastLogin").and_then(|v| v.as_int()), Some(111));
        assert_eq!(second.field("username").and_then(|v| v.as_latin1()).as_deref(), Some("bbb"));
        assert_eq!(second.field("lastLogin").and_then(|v| v.as_int()), Some(222));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn close_fails_an_in_flight_call() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // handshake only; the request is left unanswered
            let _server = accept_and_handshake(listener).await;
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });

        let client = connect(ConnectOptions::new(addr.ip().to_string(), addr.port()))
            .await
            .unwrap();
        let client_for_call = client.clone();
        let call = tokio::spawn(async move { client_for_call.logout().await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        client.close().await;
        let result = call.await.unwrap();
        assert!(matches!(result, Err(ClientLibError::Closed)));
        server.abort();
    }

    #[tokio::test]
    async fn try_call_by_name_fails_synchronously_once_saturated() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            // handshake only; no requests are ever answered
            let _server = accept_and_handshake(listener).await;
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });

        let mut opts = ConnectOptions::new(addr.ip().to_string(), addr.port());
        opts.max_in_flight = 1;
        let client = connect(opts).await.unwrap();

        // holds the lone permit without ever polling the returned future
        let first = client.try_call_by_name("logout", Value::Empty).unwrap();
        let second = client.try_call_by_name("logout", Value::Empty);
        assert!(matches!(second, Err(ClientError::TooManyInFlight)));

        drop(first);
        client.close().await;
        server.abort();
    }

    #[tokio::test]
    async fn unknown_async_event_skip_does_not_disrupt_the_following_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut server = accept_and_handshake(listener).await;
            let mut line = String::new();
            server.read_line(&mut line).await.unwrap();
            let ref_no = ref_no_of(&line);
            // an unknown async event (numParams = 3) immediately followed by
            // the reply to the pending call
            server
                .write_all(format!(":3 9999 1 2 3 ={ref_no}\n").as_bytes())
                .await
                .unwrap();
        });

        let client = connect(ConnectOptions::new(addr.ip().to_string(), addr.port()))
            .await
            .unwrap();
        client.logout().await.unwrap();
        server.await.unwrap();
    }
}
