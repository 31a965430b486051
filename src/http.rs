//! A small HTTP/1.1 server: one thread per connection, JSON bodies with a
//! `Content-Length`, keep-alive unless the client asks to close.

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

use std::{
    io::{BufRead, BufReader, ErrorKind, Read, Write},
    net::{TcpListener, TcpStream},
    sync::Arc,
    thread,
};

use log::{debug, error, info};
use serde::Serialize;

use crate::api::Api;

const MAX_LINE: u64 = 8 * 1024;
const MAX_HEADERS: usize = 64;
const MAX_BODY: usize = 1024 * 1024;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Request {
    pub method: String,
    /// Without the query string.
    pub path: String,
    pub body: Vec<u8>,
    pub close: bool,
}

impl Request {
    /// Reads one request. Returns `None` when the peer closed the connection
    /// before sending anything.
    ///
    /// # Errors
    ///
    /// If reading fails or the request is malformed or too large.
    pub fn read<R: BufRead>(reader: &mut R) -> anyhow::Result<Option<Self>> {
        let Some(request_line) = read_line(reader)? else {
            return Ok(None);
        };

        let mut words = request_line.split_whitespace();
        let (Some(method), Some(target), Some(version)) = (words.next(), words.next(), words.next())
        else {
            return Err(anyhow::Error::msg(format!(
                "invalid request line: {request_line:?}"
            )));
        };

        let path = target.split('?').next().unwrap_or_default().to_string();
        let mut close = version == "HTTP/1.0";
        let mut content_length = 0;
        let mut headers = 0;

        loop {
            let Some(line) = read_line(reader)? else {
                return Err(anyhow::Error::msg("the headers ended early"));
            };
            if line.is_empty() {
                break;
            }

            headers += 1;
            if headers > MAX_HEADERS {
                return Err(anyhow::Error::msg("too many headers"));
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(anyhow::Error::msg(format!("invalid header: {line:?}")));
            };
            let value = value.trim();

            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse()?;
            } else if name.eq_ignore_ascii_case("connection") {
                close = value.eq_ignore_ascii_case("close");
            }
        }

        if content_length > MAX_BODY {
            return Err(anyhow::Error::msg(format!(
                "a body of {content_length} bytes is over the limit of {MAX_BODY}"
            )));
        }

        let mut body = vec![0; content_length];
        reader.read_exact(&mut body)?;

        Ok(Some(Self {
            method: method.to_ascii_uppercase(),
            path,
            body,
            close,
        }))
    }
}

/// A line without its line ending, or `None` at the end of the stream.
fn read_line<R: BufRead>(reader: &mut R) -> anyhow::Result<Option<String>> {
    let mut buf = String::new();
    let read = reader.by_ref().take(MAX_LINE).read_line(&mut buf)?;

    if read == 0 {
        return Ok(None);
    }
    if !buf.ends_with('\n') {
        return Err(anyhow::Error::msg("the line is too long"));
    }

    Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    #[must_use]
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(error) => {
                error!("serde_json::to_string: {error}");
                Self {
                    status: 500,
                    body: r#"{"error":"serialization failed","kind":"Internal"}"#.to_string(),
                }
            }
        }
    }

    /// # Errors
    ///
    /// If writing to the stream fails.
    pub fn write<W: Write>(&self, writer: &mut W, close: bool) -> std::io::Result<()> {
        write!(
            writer,
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n{}",
            self.status,
            reason(self.status),
            self.body.len(),
            if close { "close" } else { "keep-alive" },
            self.body
        )?;

        writer.flush()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Internal Server Error",
    }
}

/// Accepts connections forever, each on its own thread.
pub fn serve(listener: &TcpListener, api: &Arc<Api>) {
    if let Ok(address) = listener.local_addr() {
        info!("listening on {address} ...");
    }

    for (index, stream) in (1_u64..).zip(listener.incoming()) {
        let stream = match stream {
            Ok(stream) => stream,
            Err(error) => {
                error!("stream: {error}");
                continue;
            }
        };

        let api = Arc::clone(api);
        thread::spawn(move || {
            if let Err(error) = handle_connection(index, stream, &api) {
                error!("connection {index}: {error}");
            }
        });
    }
}

/// Answers requests on one connection until the client closes it.
///
/// # Errors
///
/// If reading or writing the stream fails.
pub fn handle_connection(index: u64, stream: TcpStream, api: &Api) -> anyhow::Result<()> {
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    loop {
        let request = match Request::read(&mut reader) {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(error) => {
                if let Some(io_error) = error.downcast_ref::<std::io::Error>()
                    && io_error.kind() != ErrorKind::InvalidData
                {
                    return Err(error);
                }

                let response = Response::json(
                    400,
                    &serde_json::json!({"error": error.to_string(), "kind": "BadRequest"}),
                );
                response.write(&mut writer, true)?;
                return Ok(());
            }
        };

        debug!("{index}: {} {}", request.method, request.path);
        let response = api.handle(&request);
        debug!("{index}: {}", response.status);

        response.write(&mut writer, request.close)?;
        if request.close {
            return Ok(());
        }
    }
}
