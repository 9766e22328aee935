/*
 * Created on Tue Aug 18 2020
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

pub mod terminal {
    //! Colored status lines for the REPL: a short colored tag followed by an
    //! uncolored message, e.g. `ok: logged in`.
    use std::fmt;
    use std::io::Write;
    use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

    /// Write `tag` in bold `color` followed by a plain-colored `message` on
    /// its own line, then reset the terminal's color state.
    fn write_tagged<T: fmt::Display>(tag: &str, color: Color, message: T) -> fmt::Result {
        let mut stdout = StandardStream::stdout(ColorChoice::Always);
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(true);
        stdout.set_color(&spec).map_err(|_| fmt::Error)?;
        write!(&mut stdout, "{tag}").map_err(|_| fmt::Error)?;
        stdout.reset().map_err(|_| fmt::Error)?;
        writeln!(&mut stdout, " {message}").map_err(|_| fmt::Error)
    }
    pub fn write_info<T: fmt::Display>(message: T) -> fmt::Result {
        write_tagged("info:", Color::Cyan, message)
    }
    pub fn write_warning<T: fmt::Display>(message: T) -> fmt::Result {
        write_tagged("warn:", Color::Yellow, message)
    }
    pub fn write_error<T: fmt::Display>(message: T) -> fmt::Result {
        write_tagged("error:", Color::Red, message)
    }
    pub fn write_success<T: fmt::Display>(message: T) -> fmt::Result {
        write_tagged("ok:", Color::Green, message)
    }
    /// Announce an async event banner, e.g. `*** send-message ***`, in bold
    /// magenta so it stands apart from reply output in an interleaved REPL
    /// session.
    pub fn write_async_banner(event_name: &str) -> fmt::Result {
        let mut stdout = StandardStream::stdout(ColorChoice::Always);
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Magenta)).set_bold(true);
        stdout.set_color(&spec).map_err(|_| fmt::Error)?;
        writeln!(&mut stdout, "*** {event_name} ***").map_err(|_| fmt::Error)?;
        stdout.reset().map_err(|_| fmt::Error)
    }
}
