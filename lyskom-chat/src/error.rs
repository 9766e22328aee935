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

use core::fmt;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    ArgsErr(String),
    ClientError(lyskom_client::ClientLibError),
    IoError(std::io::Error),
    ReadlineError(rustyline::error::ReadlineError),
    TerminalError(crossterm::ErrorKind),
}

impl From<lyskom_client::ClientLibError> for CliError {
    fn from(e: lyskom_client::ClientLibError) -> Self {
        Self::ClientError(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e)
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(e: rustyline::error::ReadlineError) -> Self {
        Self::ReadlineError(e)
    }
}

impl From<crossterm::ErrorKind> for CliError {
    fn from(e: crossterm::ErrorKind) -> Self {
        Self::TerminalError(e)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgsErr(e) => write!(f, "incorrect arguments. {e}"),
            Self::ClientError(e) => write!(f, "client error. {e}"),
            Self::IoError(e) => write!(f, "i/o error. {e}"),
            Self::ReadlineError(e) => write!(f, "readline error. {e}"),
            Self::TerminalError(e) => write!(f, "terminal error. {e}"),
        }
    }
}
