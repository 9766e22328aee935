/*
 * Created on Thu Nov 16 2023
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

use crate::{args::ClientConfig, error::CliResult};
use crossterm::{cursor, execute, terminal as term};
use lyskom_client::{connect, Client, ClientLibError, ConnectOptions, Response};
use lyskom_common::util::terminal;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::stdout;

const LYSKOM_CHAT_HISTORY_FILE: &str = ".lyskom_chat_history";

const TXT_WELCOME: &str = "\
lyskom-chat -- a minimal interactive LysKOM Protocol A client
type !help for the command list, `exit` to quit";

const TXT_HELP: &str = "\
login <person> <passwd> [invisible]   log in as a person number
logout                                log out of the current session
send <recipient> <message...>         send-message to a conference or person
accept-async <msgNum...>              subscribe to the listed async event numbers
get-person-stat <person>              fetch a person's username/flags/last-login
create-person <name> <passwd>         create a new person
clear                                 clear the screen
!help                                 show this message
exit                                  close the session and quit";

pub async fn start(cfg: ClientConfig) -> CliResult<()> {
    let opts = {
        let mut o = ConnectOptions::new(cfg.host, cfg.port);
        o.max_in_flight = cfg.max_in_flight;
        o
    };
    let client = connect(opts).await?;
    register_lifecycle_handlers(&client);

    let mut editor = DefaultEditor::new()?;
    match editor.load_history(LYSKOM_CHAT_HISTORY_FILE) {
        Ok(()) => {}
        Err(ReadlineError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("{TXT_WELCOME}");
        }
        Err(e) => return Err(e.into()),
    }

    loop {
        match editor.readline("lyskom> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match line {
                    "!help" => println!("{TXT_HELP}"),
                    "exit" | "quit" => break,
                    "clear" => clear_screen()?,
                    _ => run_command(&client, line).await,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    client.close().await;
    let _ = editor.save_history(LYSKOM_CHAT_HISTORY_FILE);
    println!("Goodbye!");
    Ok(())
}

/// Subscribe to the lifecycle streams every open session carries: unsolicited
/// async events, out-of-band server errors, and connection close.
fn register_lifecycle_handlers(client: &Client) {
    client.on_async("send-message", |event: Response| {
        let _ = terminal::write_async_banner("send-message");
        let sender = event.field("sender").and_then(|v| v.as_int());
        let message = event.field("message").and_then(|v| v.as_latin1());
        match (sender, message) {
            (Some(sender), Some(message)) => println!("  from {sender}: {message}"),
            _ => println!("  (malformed send-message payload)"),
        }
    });
    client.on_async("new-name", |event: Response| {
        let _ = terminal::write_async_banner("new-name");
        if let Some(conf) = event.field("confNo").and_then(|v| v.as_int()) {
            println!("  conference {conf} was renamed");
        }
    });
    client.on_error(|e: ClientLibError| {
        let _ = terminal::write_error(format!("server error: {e}"));
    });
    client.on_close(|| {
        let _ = terminal::write_warning("connection closed");
    });
}

async fn run_command(client: &Client, line: &str) {
    let words = lyskom_common::split_into_args(line);
    let result = dispatch(client, &words).await;
    if let Err(e) = result {
        let _ = terminal::write_error(format!("error: {e}"));
    }
}

async fn dispatch(client: &Client, words: &[String]) -> CliResult<()> {
    let args: Vec<&str> = words.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["login", person, passwd] => {
            let person = parse_int(person)?;
            client.login(person, passwd, false).await?;
            let _ = terminal::write_success("logged in");
        }
        ["login", person, passwd, invisible] => {
            let person = parse_int(person)?;
            let invisible = invisible == &"invisible" || invisible == &"true";
            client.login(person, passwd, invisible).await?;
            let _ = terminal::write_success("logged in");
        }
        ["logout"] => {
            client.logout().await?;
            let _ = terminal::write_success("logged out");
        }
        ["send", recipient, rest @ ..] if !rest.is_empty() => {
            let recipient = parse_int(recipient)?;
            let message = rest.join(" ");
            client.send_message(recipient, &message).await?;
            let _ = terminal::write_success("sent");
        }
        ["accept-async", rest @ ..] if !rest.is_empty() => {
            let nums = rest
                .iter()
                .map(|s| parse_int(s))
                .collect::<CliResult<Vec<i32>>>()?;
            client.accept_async(nums).await?;
            let _ = terminal::write_success("subscribed");
        }
        ["get-person-stat", person] => {
            let person = parse_int(person)?;
            let stat = client.get_person_stat(person).await?;
            print_person_stat(&stat);
        }
        ["create-person", name, passwd] => {
            let number = client
                .create_person(name, passwd, Vec::new(), Vec::new())
                .await?;
            let _ = terminal::write_success(format!("created person {number}"));
        }
        _ => {
            let _ = terminal::write_warning(format!("unrecognized command: {}", args.join(" ")));
        }
    }
    Ok(())
}

fn print_person_stat(stat: &Response) {
    let username = stat.field("username").and_then(|v| v.as_latin1());
    let last_login = stat.field("lastLogin").and_then(|v| v.as_int());
    match (username, last_login) {
        (Some(username), Some(last_login)) => {
            println!("  username: {username}, last login: {last_login}")
        }
        _ => println!("  (malformed getPersonStat reply)"),
    }
}

fn parse_int(s: &str) -> CliResult<i32> {
    s.parse()
        .map_err(|e| crate::error::CliError::ArgsErr(format!("expected an integer, got `{s}`. {e}")))
}

fn clear_screen() -> CliResult<()> {
    let mut out = stdout();
    execute!(out, term::Clear(term::ClearType::All))?;
    execute!(out, cursor::MoveTo(0, 0))?;
    Ok(())
}
