//! Transfer handles and the pluggable native layer.
//!
//! # Design
//! A `Handle` is the per-transfer resource: opened for one URL, loaded with a
//! copy of the request's `Options`, run once or more, and released on drop.
//! The actual network exchange is delegated to a `Transport`, which only has
//! to stream raw header lines and body chunks back. Routing those chunks to
//! user callbacks, to the response's header collector, or into the returned
//! body is done here so every transport gets the same callback semantics.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::{ErrorCode, TransferError};
use crate::header::HeaderSink;
use crate::options::{Callback, Options, TransferInfo};
use crate::ureq_transport::UreqTransport;

/// Receives the raw output of a transfer.
///
/// Both methods return `false` to abort the transfer.
pub trait TransferStream {
    /// One header line, terminator included. The status line comes first and
    /// an empty `\r\n` line ends the block.
    fn header_line(&mut self, line: &[u8]) -> bool;

    fn body_chunk(&mut self, chunk: &[u8]) -> bool;
}

/// The native layer that performs the network exchange.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Run `transfer` to completion, streaming its output into `stream`.
    ///
    /// Must stop and return an error as soon as `stream` refuses a chunk.
    fn perform(&self, transfer: &PreparedTransfer, stream: &mut dyn TransferStream) -> Result<(), TransferError>;
}

/// The blocking `ureq` transport used unless a request supplies its own.
pub fn default_transport() -> Arc<dyn Transport> {
    Arc::new(UreqTransport::default())
}

/// Options flattened into what a `Transport` needs to put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransfer {
    pub method: String,
    pub url: String,
    /// Raw `"Name: Value"` lines, passed through unvalidated.
    pub headers: Vec<String>,
    pub body: Option<Vec<u8>>,
    pub verify_peer: bool,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub follow_location: bool,
    pub max_redirs: Option<u32>,
    pub user_agent: Option<String>,
}

impl PreparedTransfer {
    pub fn new(url: &str, options: &Options) -> Self {
        Self {
            method: options.custom_request().unwrap_or("GET").to_string(),
            url: url.to_string(),
            headers: options.header_lines().to_vec(),
            body: options.post_fields().map(|body| body.as_bytes().to_vec()),
            verify_peer: options.ssl_verify_peer(),
            timeout: options.timeout(),
            connect_timeout: options.connect_timeout(),
            follow_location: options.follow_location(),
            max_redirs: options.max_redirs(),
            user_agent: options.user_agent().map(str::to_string),
        }
    }
}

/// One transfer handle. Closed when dropped.
#[derive(Debug)]
pub struct Handle {
    transport: Arc<dyn Transport>,
    url: String,
    options: Options,
    rejected: Option<TransferError>,
    last_error: Option<TransferError>,
}

impl Handle {
    pub fn open(transport: Arc<dyn Transport>, url: impl Into<String>) -> Self {
        let url = url.into();
        trace!(url = %url, "opening transfer handle");
        Self {
            transport,
            url,
            options: Options::new(),
            rejected: None,
            last_error: None,
        }
    }

    /// Copy every option in `options` onto the handle, replacing same-keyed
    /// values already set. A body rejection recorded in `options` comes along.
    pub fn apply(&mut self, options: &Options) {
        self.options.extend(options.iter().cloned());
        if let Some(error) = options.body_error() {
            self.options.reject_body(error.clone());
        }
    }

    /// Make every subsequent `run` fail with `error` without touching the
    /// network.
    pub fn reject(&mut self, error: TransferError) {
        self.rejected = Some(error);
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn info(&self) -> TransferInfo {
        TransferInfo {
            url: self.url.clone(),
            method: self.options.custom_request().unwrap_or("GET").to_string(),
        }
    }

    /// Error recorded by the most recent `run`, if it failed.
    pub fn last_error(&self) -> Option<&TransferError> {
        self.last_error.as_ref()
    }

    /// Perform the transfer synchronously.
    ///
    /// Header lines go to the registered header function, or else to
    /// `header_sink`. Returns the body bytes exactly as received (empty when
    /// they were handed to a write function or printed) or `None` on failure.
    pub fn run(&mut self, header_sink: Option<&mut dyn HeaderSink>) -> Option<Vec<u8>> {
        self.last_error = None;
        if let Some(error) = self.rejected.as_ref().or(self.options.body_error()) {
            warn!(url = %self.url, error = %error, "transfer rejected before start");
            self.last_error = Some(error.clone());
            return None;
        }

        let prepared = PreparedTransfer::new(&self.url, &self.options);
        debug!(method = %prepared.method, url = %prepared.url, "starting transfer");

        let info = self.info();
        let mut dispatch = Dispatch {
            info: &info,
            header_function: self.options.header_function(),
            write_function: self.options.write_function(),
            header_sink,
            return_transfer: self.options.return_transfer(),
            body: Vec::new(),
            aborted: None,
        };
        let result = self.transport.perform(&prepared, &mut dispatch);
        let Dispatch { body, aborted, .. } = dispatch;

        let outcome = match (aborted, result) {
            (Some(error), _) | (None, Err(error)) => Err(error),
            (None, Ok(())) => Ok(body),
        };
        match outcome {
            Ok(body) => {
                debug!(url = %self.url, bytes = body.len(), "transfer complete");
                Some(body)
            }
            Err(error) => {
                warn!(url = %self.url, code = error.code.as_u32(), error = %error.message, "transfer failed");
                self.last_error = Some(error);
                None
            }
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        trace!(url = %self.url, "closing transfer handle");
    }
}

/// Routes transport output to callbacks, the header sink, or the body buffer.
struct Dispatch<'a, 's> {
    info: &'a TransferInfo,
    header_function: Option<&'a Callback>,
    write_function: Option<&'a Callback>,
    header_sink: Option<&'s mut dyn HeaderSink>,
    return_transfer: bool,
    body: Vec<u8>,
    aborted: Option<TransferError>,
}

impl Dispatch<'_, '_> {
    fn check(&mut self, kind: &str, given: usize, consumed: usize) -> bool {
        if consumed == given {
            return true;
        }
        self.aborted = Some(TransferError::new(
            ErrorCode::WriteError,
            format!("{kind} callback consumed {consumed} of {given} bytes"),
        ));
        false
    }
}

impl TransferStream for Dispatch<'_, '_> {
    fn header_line(&mut self, line: &[u8]) -> bool {
        trace!(line = %String::from_utf8_lossy(line).trim_end(), "header line");
        let consumed = if let Some(f) = self.header_function {
            f.call(self.info, line)
        } else if let Some(sink) = self.header_sink.as_mut() {
            sink.header(line)
        } else {
            line.len()
        };
        self.check("header", line.len(), consumed)
    }

    fn body_chunk(&mut self, chunk: &[u8]) -> bool {
        let consumed = if let Some(f) = self.write_function {
            f.call(self.info, chunk)
        } else if self.return_transfer {
            self.body.extend_from_slice(chunk);
            chunk.len()
        } else {
            match std::io::stdout().write_all(chunk) {
                Ok(()) => chunk.len(),
                Err(_) => 0,
            }
        };
        self.check("write", chunk.len(), consumed)
    }
}
