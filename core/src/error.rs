//! Error types reported by the transfer layer.
//!
//! # Design
//! Transfer failures never surface as `Err` from the public API. They are
//! folded into `Response::error` / `Response::error_code` (or the `None`
//! sentinel of `Request::exec_raw`). The numeric codes follow libcurl's
//! `CURLcode` numbering so callers that already switch on those values keep
//! working.

use std::fmt;

/// Numeric failure class of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// The URL scheme is not supported by the transport.
    UnsupportedProtocol = 1,

    /// The URL could not be parsed.
    UrlMalformat = 3,

    /// DNS resolution failed.
    CouldntResolveHost = 6,

    /// The remote host refused or dropped the connection attempt.
    CouldntConnect = 7,

    /// A write or header callback consumed fewer bytes than it was given.
    WriteError = 23,

    /// The configured timeout elapsed.
    OperationTimedout = 28,

    /// The TLS handshake failed.
    SslConnectError = 35,

    /// An option value was rejected (bad header, unserializable body, ...).
    BadFunctionArgument = 43,

    /// The redirect limit was reached.
    TooManyRedirects = 47,

    /// Receiving data from the peer failed.
    RecvError = 56,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(code: u32) -> Option<Self> {
        let code = match code {
            1 => ErrorCode::UnsupportedProtocol,
            3 => ErrorCode::UrlMalformat,
            6 => ErrorCode::CouldntResolveHost,
            7 => ErrorCode::CouldntConnect,
            23 => ErrorCode::WriteError,
            28 => ErrorCode::OperationTimedout,
            35 => ErrorCode::SslConnectError,
            43 => ErrorCode::BadFunctionArgument,
            47 => ErrorCode::TooManyRedirects,
            56 => ErrorCode::RecvError,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// The last error recorded on a transfer handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct TransferError {
    pub code: ErrorCode,
    pub message: String,
}

impl TransferError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
