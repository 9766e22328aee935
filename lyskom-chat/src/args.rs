/*
 * Created on Wed Nov 15 2023
 *
 * This file is part of lyskom-chat, an interactive command-line client for LysKOM Protocol A servers.
 *
 * lyskom-chat is free software: you can redistribute it and/or modify
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

use crate::error::CliResult;
use clap::{App, Arg};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: &str = "4894";

#[derive(Debug)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub max_in_flight: usize,
}

pub fn parse() -> CliResult<ClientConfig> {
    let m = App::new("lyskom-chat")
        .version("0.1.0")
        .about("A minimal interactive LysKOM chat client")
        .arg(
            Arg::with_name("host")
                .long("host")
                .takes_value(true)
                .help("the LysKOM server to connect to"),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .takes_value(true)
                .help("the LysKOM server's port"),
        )
        .arg(
            Arg::with_name("max-in-flight")
                .long("max-in-flight")
                .takes_value(true)
                .help("the maximum number of requests this session may have outstanding at once"),
        )
        .get_matches();
    let host = m.value_of("host").unwrap_or(DEFAULT_HOST).to_owned();
    let port: u16 = m
        .value_of("port")
        .unwrap_or(DEFAULT_PORT)
        .parse()
        .map_err(|e| crate::error::CliError::ArgsErr(format!("invalid value for --port. {e}")))?;
    let max_in_flight: usize = match m.value_of("max-in-flight") {
        None => 1024,
        Some(v) => v.parse().map_err(|e| {
            crate::error::CliError::ArgsErr(format!("invalid value for --max-in-flight. {e}"))
        })?,
    };
    Ok(ClientConfig {
        host,
        port,
        max_in_flight,
    })
}
