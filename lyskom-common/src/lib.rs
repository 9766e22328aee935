/*
 * Created on Mon Jul 20 2020
 *
 * This file is part of lyskom-common, shared utilities for the lyskom-client workspace.
 *
 * lyskom-common is free software: you can redistribute it and/or modify
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

//! Shared utilities for the lyskom-client workspace
//!
//! This contains bits used by both `lyskom-chat` and the test suite of
//! `lyskom-client`: splitting a REPL line into shell-style arguments, and a
//! generic boxed-error result alias.

pub mod util;

use std::error::Error;
use std::str::FromStr;

/// A generic result
pub type TResult<T> = Result<T, Box<dyn Error>>;

/// The size of the read buffer in bytes, for tools in this workspace that
/// don't otherwise configure one
pub const BUF_CAP: usize = 8 * 1024; // 8 KB per-connection

lazy_static::lazy_static! {
    static ref RE: regex::Regex =
        regex::Regex::from_str(r#""([^"]*)"|'([^']*)'|(\S+)"#).unwrap();
}

/// Split a REPL input line into arguments, honoring single and double quotes
/// as grouping (but not escaping) delimiters. Unlike a naive split-then-strip
/// approach, the quotes are matched as capture groups so a quote embedded
/// inside an otherwise bare word (e.g. `don't`) is left alone.
pub fn split_into_args(line: &str) -> Vec<String> {
    RE.captures_iter(line)
        .map(|caps| {
            let group = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .expect("one alternative always matches");
            group.as_str().to_owned()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::split_into_args;

    #[test]
    fn splits_plain_words() {
        assert_eq!(
            split_into_args("login 4711 hunter2"),
            vec!["login", "4711", "hunter2"]
        );
    }

    #[test]
    fn keeps_quoted_groups_together() {
        assert_eq!(
            split_into_args(r#"send-message "hello there" 4711"#),
            vec!["send-message", "hello there", "4711"]
        );
    }

    #[test]
    fn leaves_embedded_apostrophes_alone() {
        assert_eq!(split_into_args("don't panic"), vec!["don't", "panic"]);
    }
}
