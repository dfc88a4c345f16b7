//! Fluent request builder.
//!
//! # Design
//! `Request` holds only configuration: method, URL, and a typed `Options`
//! set. Configuration calls consume and return the builder so they chain, and
//! never fail; a body that cannot be serialized is remembered and reported
//! by the next transfer. `exec` and `exec_raw` borrow the builder, open a
//! fresh `Handle`, and copy the current options into it, so the same request
//! can be executed repeatedly and mutated between executions.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ErrorCode, TransferError};
use crate::options::{Callback, Method, Options, TransferInfo, TransferOption};
use crate::response::Response;
use crate::transfer::{default_transport, Handle, Transport};

/// A configured HTTP transfer, ready to execute.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    options: Options,
    transport: Arc<dyn Transport>,
}

impl Request {
    /// Build a request, merging caller `options` over the defaults for
    /// `method`. Caller values win on every key they set.
    pub fn new(method: Method, url: impl Into<String>, options: impl IntoIterator<Item = TransferOption>) -> Self {
        Self {
            method,
            url: url.into(),
            options: Options::for_method(method, options),
            transport: default_transport(),
        }
    }

    pub fn get(url: impl Into<String>, options: impl IntoIterator<Item = TransferOption>) -> Self {
        Self::new(Method::Get, url, options)
    }

    pub fn post(url: impl Into<String>, options: impl IntoIterator<Item = TransferOption>) -> Self {
        Self::new(Method::Post, url, options)
    }

    pub fn head(url: impl Into<String>, options: impl IntoIterator<Item = TransferOption>) -> Self {
        Self::new(Method::Head, url, options)
    }

    pub fn delete(url: impl Into<String>, options: impl IntoIterator<Item = TransferOption>) -> Self {
        Self::new(Method::Delete, url, options)
    }

    pub fn put(url: impl Into<String>, options: impl IntoIterator<Item = TransferOption>) -> Self {
        Self::new(Method::Put, url, options)
    }

    /// Execute through `transport` instead of the default `ureq` one.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Set one option, replacing any value already stored for its key.
    pub fn option(mut self, option: TransferOption) -> Self {
        self.options.set(option);
        self
    }

    /// Replace the request header list with one `"Name: Value"` line per pair.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        let lines = headers
            .into_iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        self.options.set(TransferOption::HttpHeader(lines));
        self
    }

    /// Use `fields` as an `application/x-www-form-urlencoded` body.
    ///
    /// No `Content-Type` header is added.
    pub fn postfields<T: Serialize + ?Sized>(self, fields: &T) -> Self {
        let encoded = serde_urlencoded::to_string(fields).map_err(|e| e.to_string());
        self.set_body(encoded, "form")
    }

    /// Use `body` serialized as JSON text as the request body.
    ///
    /// No `Content-Type` header is added; pair with `headers` if the server
    /// needs one.
    pub fn postbody<T: Serialize + ?Sized>(self, body: &T) -> Self {
        let encoded = serde_json::to_string(body).map_err(|e| e.to_string());
        self.set_body(encoded, "json")
    }

    /// Register a hook for body chunks. The body is then not returned.
    pub fn writefunction<F>(self, f: F) -> Self
    where
        F: Fn(&TransferInfo, &[u8]) -> usize + Send + Sync + 'static,
    {
        self.option(TransferOption::WriteFunction(Callback::new(f)))
    }

    /// Register a hook for raw header lines. Replaces the response's own
    /// header capture, so `Response::headers` stays empty.
    pub fn headerfunction<F>(self, f: F) -> Self
    where
        F: Fn(&TransferInfo, &[u8]) -> usize + Send + Sync + 'static,
    {
        self.option(TransferOption::HeaderFunction(Callback::new(f)))
    }

    /// Run a fresh transfer and capture it in a `Response`.
    pub fn exec(&self) -> Response {
        debug!(method = %self.method, url = %self.url, "exec");
        Response::perform(self.open())
    }

    /// Run a fresh transfer and return the body bytes unchanged, or `None`
    /// on failure.
    ///
    /// Headers are not captured unless a header function is registered.
    pub fn exec_raw(&self) -> Option<Vec<u8>> {
        debug!(method = %self.method, url = %self.url, "exec_raw");
        let mut handle = self.open();
        handle.run(None)
    }

    fn open(&self) -> Handle {
        let mut handle = Handle::open(Arc::clone(&self.transport), self.url.clone());
        handle.apply(&self.options);
        handle
    }

    fn set_body(mut self, encoded: Result<String, String>, kind: &str) -> Self {
        match encoded {
            Ok(body) => {
                self.options.set(TransferOption::PostFields(body));
            }
            Err(message) => {
                warn!(url = %self.url, error = %message, "could not encode {kind} body");
                self.options.reject_body(TransferError::new(
                    ErrorCode::BadFunctionArgument,
                    format!("could not encode {kind} body: {message}"),
                ));
            }
        }
        self
    }
}
