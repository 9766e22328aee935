/*
 * Created on Fri Sep 15 2023
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

macro_rules! fatal {
    ($($arg:tt)*) => {{
        eprintln!($($arg)*);
        std::process::exit(0x01);
    }}
}

mod args;
mod error;
mod repl;

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    match run().await {
        Ok(()) => {}
        Err(e) => fatal!("lyskom-chat error: {e}"),
    }
}

async fn run() -> error::CliResult<()> {
    let cfg = args::parse()?;
    repl::start(cfg).await
}
