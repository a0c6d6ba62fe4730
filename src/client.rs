//! Assuan client
//!
//! Drives a request to its terminal response: status, comment and data
//! lines are collected until `OK`, `ERR` or `INQUIRE` arrives. `ERR` lines
//! surface as [`AssuanError::Fault`] with the server's code and message.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::error::{errcode, AssuanError, Result};
use crate::protocol::{self, Request, Response, MAX_LINE};

/// A single-threaded Assuan client
pub struct AssuanClient<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl AssuanClient<BufReader<UnixStream>, UnixStream> {
    /// Connect to a server over a Unix socket
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        tracing::debug!(path = %path.as_ref().display(), "connecting to Unix socket");
        let stream = UnixStream::connect(path.as_ref())?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self::new(reader, stream))
    }
}

impl AssuanClient<BufReader<Stdin>, Stdout> {
    /// Client bound to the process's standard streams
    pub fn over_stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> AssuanClient<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read one response line, applying the same framing checks as the
    /// server: line length, newline termination.
    pub fn read_response(&mut self) -> Result<Response> {
        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            return Err(AssuanError::fault(
                errcode::ACCEPT_FAILED,
                "IPC accept call failed",
            ));
        }
        if line.len() > MAX_LINE + 2 {
            return Err(AssuanError::line_too_long());
        }
        if line.last() != Some(&b'\n') {
            return Err(AssuanError::invalid_response());
        }
        line.pop();
        let text = std::str::from_utf8(&line).map_err(|_| AssuanError::invalid_response())?;
        tracing::debug!("S: {text}");
        Response::parse(text)
    }

    /// Write one request line and flush it
    pub fn write_request(&mut self, request: &Request) -> Result<()> {
        let line = request.to_line();
        tracing::debug!("C: {line}");
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send a request and collect responses up to the terminal one.
    ///
    /// Returns all responses in arrival order, plus the assembled payload
    /// of any `D` lines (joined first, decoded once, so split escape
    /// triplets survive chunking).
    pub fn make_request(&mut self, request: &Request) -> Result<(Vec<Response>, Option<Vec<u8>>)> {
        self.write_request(request)?;
        self.collect_responses()
    }

    /// Greet: read the server's initial `OK Your orders please`
    pub fn read_greeting(&mut self) -> Result<Response> {
        let greeting = self.read_response()?;
        match greeting {
            Response::Ok(_) => Ok(greeting),
            Response::Err { code, message } => Err(AssuanError::Fault {
                code,
                message: message.unwrap_or_default(),
            }),
            _ => Err(AssuanError::invalid_response()),
        }
    }

    /// Upload a data value: as many `D` lines as needed, then `END`.
    pub fn send_data(&mut self, data: &str) -> Result<(Vec<Response>, Option<Vec<u8>>)> {
        for chunk in Response::data_chunks(data) {
            if let Response::Data(payload) = chunk {
                self.write_request(&Request::with_parameters("D", payload))?;
            }
        }
        self.write_request(&Request::new("END"))?;
        self.collect_responses()
    }

    /// Say goodbye; tolerates the server closing right after its `OK`
    pub fn bye(&mut self) -> Result<()> {
        self.write_request(&Request::new("BYE"))?;
        match self.collect_responses() {
            Ok(_) => Ok(()),
            Err(AssuanError::Fault { code, .. }) if code == errcode::ACCEPT_FAILED => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn collect_responses(&mut self) -> Result<(Vec<Response>, Option<Vec<u8>>)> {
        let mut responses = Vec::new();
        loop {
            let response = self.read_response()?;
            let terminal = response.is_terminal();
            responses.push(response);
            if terminal {
                break;
            }
        }

        if let Some(Response::Err { code, message }) = responses.last() {
            return Err(AssuanError::Fault {
                code: *code,
                message: message.clone().unwrap_or_default(),
            });
        }

        let mut encoded = String::new();
        for response in &responses {
            if let Response::Data(payload) = response {
                encoded.push_str(payload);
            }
        }
        let data = if encoded.is_empty() {
            None
        } else {
            Some(protocol::decode(encoded.as_bytes())?)
        };
        Ok((responses, data))
    }
}
