// This file is part of get5-bracket.
//
// get5-bracket is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// get5-bracket is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{io::Write as _, path::PathBuf};

use clap::{CommandFactory, Parser};
use get5_bracket::{COPYRIGHT, LONG_VERSION, SERVER_PORT};

/// get5 Bracket Server
///
/// An HTTP server that runs single elimination brackets and map vetoes, and
/// serves get5 match configs.
#[derive(Parser, Debug)]
#[command(long_version = LONG_VERSION, about = "get5 Bracket Server")]
pub(crate) struct Args {
    /// The address to listen on [default: [::] falling back to 0.0.0.0]
    #[arg(long)]
    pub host: Option<String>,

    /// The port to listen on
    #[arg(long, default_value_t = SERVER_PORT)]
    pub port: u16,

    /// Where to keep the data files [default: the user's data folder]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Whether to log on the debug level
    #[arg(long)]
    pub debug: bool,

    /// Whether to skip the data file
    #[arg(long)]
    pub skip_the_data_file: bool,

    /// Whether the application is being run by systemd
    #[arg(long)]
    pub systemd: bool,

    /// Build the manpage
    #[arg(long)]
    pub man: bool,
}

impl Args {
    pub(crate) fn generate_man_page() -> anyhow::Result<()> {
        let mut buffer: Vec<u8> = Vec::default();
        let cmd = Self::command()
            .name("get5-bracket-server")
            .long_version(None);
        let man = clap_mangen::Man::new(cmd).date("2026-10-16");

        man.render(&mut buffer)?;
        write!(buffer, "{COPYRIGHT}")?;

        std::fs::write("get5-bracket-server.1", buffer)?;
        Ok(())
    }
}
