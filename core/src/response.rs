//! The outcome of one executed transfer.
//!
//! # Design
//! `Response::perform` takes a configured `Handle`, arms a `HeaderCollector`
//! as its header sink, and runs the transfer to completion before returning.
//! Transfer failures are recorded in `error` / `error_code` with `body` set
//! to `None` (the failure sentinel); nothing is raised. The handle stays
//! owned by the response and is released with it.

use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::ErrorCode;
use crate::header::{HeaderCollector, HeaderSink, Headers};
use crate::transfer::Handle;

/// Body, headers, and error state of a completed transfer.
#[derive(Debug)]
pub struct Response {
    /// Raw payload bytes, or `None` if the transfer failed.
    pub body: Option<Vec<u8>>,
    /// Lowercased header name to trimmed value; last duplicate wins.
    pub headers: Headers,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    /// Status code of the last status line received.
    pub status: Option<u16>,
    handle: Handle,
}

impl Response {
    /// Run `handle` synchronously and capture the result.
    pub fn perform(mut handle: Handle) -> Self {
        let mut collector = HeaderCollector::new();
        let sink: &mut dyn HeaderSink = &mut collector;
        let body = handle.run(Some(sink));
        let (headers, status) = collector.into_parts();

        let (error, error_code) = match (&body, handle.last_error()) {
            (None, Some(err)) => (Some(err.message.clone()), Some(err.code)),
            _ => (None, None),
        };

        Self {
            body,
            headers,
            error,
            error_code,
            status,
            handle,
        }
    }

    /// True when the transfer completed, whatever the HTTP status.
    pub fn is_ok(&self) -> bool {
        self.error_code.is_none()
    }

    /// The body as UTF-8 text. `None` if the transfer failed or the body is
    /// not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(self.body.as_deref()?).ok()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    /// Parse the body as JSON. `None` if the transfer failed or the body is
    /// not valid JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.json_as()
    }

    /// Parse the body as JSON into `T`. `None` on any failure.
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<T> {
        let body = self.body.as_deref()?;
        match serde_json::from_slice(body) {
            Ok(value) => Some(value),
            Err(e) => {
                trace!(url = %self.handle.url(), error = %e, "body is not valid JSON");
                None
            }
        }
    }

    /// The handle this response was produced by.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde::Deserialize;

    use crate::error::TransferError;
    use crate::options::{Method, Options};
    use crate::transfer::{PreparedTransfer, TransferStream, Transport};

    #[derive(Debug)]
    struct Fixed(&'static [u8]);

    impl Transport for Fixed {
        fn perform(&self, _: &PreparedTransfer, stream: &mut dyn TransferStream) -> Result<(), TransferError> {
            stream.header_line(b"HTTP/1.1 200 OK\r\n");
            stream.header_line(b"Content-Type: application/json\r\n");
            stream.header_line(b"\r\n");
            stream.body_chunk(self.0);
            Ok(())
        }
    }

    fn respond(body: &'static [u8]) -> Response {
        let mut handle = Handle::open(Arc::new(Fixed(body)), "http://localhost/");
        handle.apply(&Options::for_method(Method::Get, []));
        Response::perform(handle)
    }

    #[test]
    fn json_parses_valid_body() {
        let response = respond(br#"{"id":1,"tags":["a"]}"#);
        let value = response.json().unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["tags"][0], "a");
    }

    #[test]
    fn json_returns_none_for_invalid_body() {
        assert!(respond(b"not json").json().is_none());
    }

    #[test]
    fn json_as_deserializes_typed_value() {
        #[derive(Deserialize)]
        struct Item {
            id: u32,
        }
        let item: Item = respond(br#"{"id":7}"#).json_as().unwrap();
        assert_eq!(item.id, 7);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = respond(b"{}");
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.status, Some(200));
        assert!(response.is_ok());
    }

    #[test]
    fn text_is_none_for_non_utf8_body() {
        let response = respond(&[0x89, b'P', b'N', b'G', 0xff, 0x00]);
        assert_eq!(response.body.as_deref(), Some(&[0x89, b'P', b'N', b'G', 0xff, 0x00][..]));
        assert!(response.text().is_none());
        assert!(response.json().is_none());
        assert!(response.is_ok());
        assert_eq!(respond(b"plain").text(), Some("plain"));
    }
}
