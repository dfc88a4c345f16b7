//! Typed transfer options.
//!
//! # Design
//! Instead of an open key/value dictionary, every option the transfer layer
//! understands is a variant of `TransferOption`. `Options` stores at most one
//! value per `OptionKey`, so "replace the header list" or "replace the body"
//! is a plain overwrite. All values are owned (callbacks are `Arc`-shared) so
//! an `Options` can be cloned into a fresh handle for every transfer.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransferError;

/// HTTP method a `Request` is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Head,
    Delete,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Delete => "DELETE",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the handle passed to write and header callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    pub url: String,
    pub method: String,
}

type CallbackFn = dyn Fn(&TransferInfo, &[u8]) -> usize + Send + Sync;

/// A write or header hook invoked by the transfer layer.
///
/// The hook receives one chunk and returns how many bytes it consumed.
/// Returning less than `chunk.len()` aborts the transfer. Stateful hooks
/// keep their state behind interior mutability since the same hook may serve
/// several transfers.
#[derive(Clone)]
pub struct Callback(Arc<CallbackFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TransferInfo, &[u8]) -> usize + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, info: &TransferInfo, chunk: &[u8]) -> usize {
        (self.0)(info, chunk)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// One transfer option with its value.
#[derive(Debug, Clone)]
pub enum TransferOption {
    /// Request verb sent on the wire.
    CustomRequest(String),
    /// Return the body from the transfer instead of printing it to stdout.
    ReturnTransfer(bool),
    /// Verify the peer's TLS certificate.
    SslVerifyPeer(bool),
    /// Raw `"Name: Value"` request header lines.
    HttpHeader(Vec<String>),
    /// Request body.
    PostFields(String),
    WriteFunction(Callback),
    HeaderFunction(Callback),
    /// Whole-transfer timeout.
    Timeout(Duration),
    ConnectTimeout(Duration),
    /// Follow `Location` redirects.
    FollowLocation(bool),
    /// Redirect limit when `FollowLocation` is on.
    MaxRedirs(u32),
    UserAgent(String),
}

/// Identifies which option a `TransferOption` sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    CustomRequest,
    ReturnTransfer,
    SslVerifyPeer,
    HttpHeader,
    PostFields,
    WriteFunction,
    HeaderFunction,
    Timeout,
    ConnectTimeout,
    FollowLocation,
    MaxRedirs,
    UserAgent,
}

impl TransferOption {
    pub fn key(&self) -> OptionKey {
        match self {
            TransferOption::CustomRequest(_) => OptionKey::CustomRequest,
            TransferOption::ReturnTransfer(_) => OptionKey::ReturnTransfer,
            TransferOption::SslVerifyPeer(_) => OptionKey::SslVerifyPeer,
            TransferOption::HttpHeader(_) => OptionKey::HttpHeader,
            TransferOption::PostFields(_) => OptionKey::PostFields,
            TransferOption::WriteFunction(_) => OptionKey::WriteFunction,
            TransferOption::HeaderFunction(_) => OptionKey::HeaderFunction,
            TransferOption::Timeout(_) => OptionKey::Timeout,
            TransferOption::ConnectTimeout(_) => OptionKey::ConnectTimeout,
            TransferOption::FollowLocation(_) => OptionKey::FollowLocation,
            TransferOption::MaxRedirs(_) => OptionKey::MaxRedirs,
            TransferOption::UserAgent(_) => OptionKey::UserAgent,
        }
    }
}

/// A keyed set of transfer options, one value per key.
#[derive(Debug, Clone, Default)]
pub struct Options {
    entries: BTreeMap<OptionKey, TransferOption>,
    body_error: Option<TransferError>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caller overrides merged over the per-method defaults.
    ///
    /// Caller entries are applied first; a default only fills a key the
    /// caller left empty.
    pub fn for_method(method: Method, overrides: impl IntoIterator<Item = TransferOption>) -> Self {
        let mut options: Options = overrides.into_iter().collect();
        options.set_default(TransferOption::CustomRequest(method.as_str().to_string()));
        options.set_default(TransferOption::ReturnTransfer(true));
        options.set_default(TransferOption::SslVerifyPeer(false));
        options
    }

    /// Store `option`, returning the value it replaced.
    ///
    /// Setting `PostFields` clears a pending body rejection.
    pub fn set(&mut self, option: TransferOption) -> Option<TransferOption> {
        let key = option.key();
        if key == OptionKey::PostFields {
            self.body_error = None;
        }
        self.entries.insert(key, option)
    }

    /// Drop the body and make transfers fail with `error` until a new body
    /// is set.
    pub fn reject_body(&mut self, error: TransferError) {
        self.entries.remove(&OptionKey::PostFields);
        self.body_error = Some(error);
    }

    /// Why the last body could not be encoded, if no body replaced it since.
    pub fn body_error(&self) -> Option<&TransferError> {
        self.body_error.as_ref()
    }

    /// Store `option` only if its key is unset. Returns whether it was stored.
    pub fn set_default(&mut self, option: TransferOption) -> bool {
        if self.entries.contains_key(&option.key()) {
            return false;
        }
        self.set(option);
        true
    }

    pub fn get(&self, key: OptionKey) -> Option<&TransferOption> {
        self.entries.get(&key)
    }

    pub fn remove(&mut self, key: OptionKey) -> Option<TransferOption> {
        self.entries.remove(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransferOption> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn custom_request(&self) -> Option<&str> {
        match self.get(OptionKey::CustomRequest) {
            Some(TransferOption::CustomRequest(method)) => Some(method),
            _ => None,
        }
    }

    pub fn return_transfer(&self) -> bool {
        matches!(self.get(OptionKey::ReturnTransfer), Some(TransferOption::ReturnTransfer(true)))
    }

    /// TLS peer verification; on unless explicitly disabled.
    pub fn ssl_verify_peer(&self) -> bool {
        !matches!(self.get(OptionKey::SslVerifyPeer), Some(TransferOption::SslVerifyPeer(false)))
    }

    pub fn header_lines(&self) -> &[String] {
        match self.get(OptionKey::HttpHeader) {
            Some(TransferOption::HttpHeader(lines)) => lines,
            _ => &[],
        }
    }

    pub fn post_fields(&self) -> Option<&str> {
        match self.get(OptionKey::PostFields) {
            Some(TransferOption::PostFields(body)) => Some(body),
            _ => None,
        }
    }

    pub fn write_function(&self) -> Option<&Callback> {
        match self.get(OptionKey::WriteFunction) {
            Some(TransferOption::WriteFunction(f)) => Some(f),
            _ => None,
        }
    }

    pub fn header_function(&self) -> Option<&Callback> {
        match self.get(OptionKey::HeaderFunction) {
            Some(TransferOption::HeaderFunction(f)) => Some(f),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.get(OptionKey::Timeout) {
            Some(TransferOption::Timeout(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        match self.get(OptionKey::ConnectTimeout) {
            Some(TransferOption::ConnectTimeout(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn follow_location(&self) -> bool {
        matches!(self.get(OptionKey::FollowLocation), Some(TransferOption::FollowLocation(true)))
    }

    pub fn max_redirs(&self) -> Option<u32> {
        match self.get(OptionKey::MaxRedirs) {
            Some(TransferOption::MaxRedirs(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        match self.get(OptionKey::UserAgent) {
            Some(TransferOption::UserAgent(ua)) => Some(ua),
            _ => None,
        }
    }
}

impl FromIterator<TransferOption> for Options {
    fn from_iter<I: IntoIterator<Item = TransferOption>>(iter: I) -> Self {
        let mut options = Options::new();
        options.extend(iter);
        options
    }
}

impl Extend<TransferOption> for Options {
    fn extend<I: IntoIterator<Item = TransferOption>>(&mut self, iter: I) {
        for option in iter {
            self.set(option);
        }
    }
}
