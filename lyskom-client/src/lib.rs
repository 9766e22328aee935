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

//! An async client for LysKOM Protocol A, the text-based, line-oriented,
//! pipelined conferencing RPC spoken by the LysKOM family of servers
//! (LyskomKOM, lyskomd).
//!
//! ```no_run
//! # async fn go() -> lyskom_client::error::ClientResult<()> {
//! use lyskom_client::{connect, ConnectOptions};
//!
//! let client = connect(ConnectOptions::new("kom.lysator.liu.se", 4894)).await?;
//! client.login(4711, "hunter2", false).await?;
//! client.send_message(6, "hello from lyskom-client").await?;
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The library is organized the way the wire pipeline is: bytes become
//! [`token`]s, tokens are assembled into [`schema`]-typed [`schema::Value`]s,
//! the [`catalogue`] says which schema goes with which RPC or async event,
//! and [`session`] is the dispatcher that ties a live socket to all three.

pub mod catalogue;
pub mod error;
pub mod scanner;
pub mod schema;
pub mod session;
pub mod token;

pub use error::{ClientError, ClientLibError, ClientResult, ProtocolError, RequestError, ServerError};
pub use schema::Value;
pub use session::{connect, Client, ConnectOptions, Params, Response};
