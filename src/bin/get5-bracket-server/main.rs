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

#![deny(clippy::expect_used)]
#![deny(clippy::indexing_slicing)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

mod command_line;

use std::{net::TcpListener, process::exit, sync::Arc};

use clap::Parser;
use get5_bracket::{api::Api, http, utils};
use log::{error, info};

use crate::command_line::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    utils::init_logger("get5_bracket_server", args.debug, args.systemd);

    if args.man {
        return Args::generate_man_page();
    }

    let data_dir = if args.skip_the_data_file {
        None
    } else {
        Some(args.data_dir.clone().unwrap_or_else(utils::data_folder))
    };

    if let Some(data_dir) = &data_dir {
        info!("data folder: {}", data_dir.display());
    }

    let api = Arc::new(Api::new(data_dir)?);

    let systemd = args.systemd;
    ctrlc::set_handler(move || {
        if !systemd {
            println!();
        }
        info!("exiting ...");
        exit(0);
    })?;

    let listener = if let Some(host) = &args.host {
        TcpListener::bind((host.as_str(), args.port))?
    } else {
        match TcpListener::bind(("::", args.port)) {
            Ok(listener) => listener,
            Err(error) => {
                error!("TcpListener::bind: {error}");
                TcpListener::bind(("0.0.0.0", args.port))?
            }
        }
    };

    http::serve(&listener, &api);

    Ok(())
}
