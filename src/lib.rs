//! Single elimination brackets, map vetoes and get5 match configs.
//!
//! A tournament is a bracket of matches. Every match with two teams runs a
//! veto: the teams ban and pick maps and choose starting sides following a
//! veto format. When the veto completes, the match config is served to the
//! game server plugin and the reported winner advances in the bracket.
//!
//! ## Feature Flags
//!
//! By default the `server` feature flag is enabled.
//!
//! * server - enable the `get5-bracket-server` binary
//!
//! ## HTTP API
//!
//! See the [api] module for the endpoints.

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

#![deny(clippy::panic)]

pub mod api;
pub mod bracket;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod side;
pub mod team;
pub mod tournament;
pub mod utils;
pub mod veto;

/// A stable, URL safe identifier of a team, tournament or match.
pub type Slug = String;

pub const HOME: &str = "get5-bracket";
pub const SERVER_PORT: u16 = 8765;

pub const COPYRIGHT: &str = r".SH COPYRIGHT
Copyright (C) 2026 Developers of the get5-bracket project

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
";

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "
Copyright (c) 2026 Developers of the get5-bracket project
Licensed under the AGPLv3"
);
