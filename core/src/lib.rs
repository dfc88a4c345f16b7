//! Fluent HTTP requests over a pluggable blocking transfer layer.
//!
//! # Overview
//! A `Request` collects transfer options (method, headers, body, hooks)
//! through chained calls; `exec` performs the transfer synchronously and
//! returns a `Response` with the body, the case-folded response headers, and
//! any transfer error. `exec_raw` skips the `Response` and hands back the
//! body alone.
//!
//! ```no_run
//! use lite_request::Request;
//!
//! let response = Request::post("https://example.com/posts", [])
//!     .headers([("Content-Type", "application/json")])
//!     .postbody(&serde_json::json!({"title": "Title", "userId": 1}))
//!     .exec();
//!
//! if let Some(code) = response.error_code {
//!     eprintln!("transfer failed ({code}): {:?}", response.error);
//! } else {
//!     println!("{:?}", response.headers.get("content-type"));
//! }
//! ```
//!
//! # Design
//! - No failure is raised: transfer errors land in `Response::error` /
//!   `Response::error_code`, an unparseable body makes `json()` return `None`.
//! - Options are a closed enum (`TransferOption`) rather than a free-form map.
//! - Every execution opens its own `Handle`; nothing is pooled or shared.
//! - The network side is the `Transport` trait; `UreqTransport` is the
//!   default and tests plug in scripted transports.

pub mod error;
pub mod header;
pub mod options;
pub mod request;
pub mod response;
pub mod transfer;
pub mod ureq_transport;

pub use error::{ErrorCode, TransferError};
pub use header::{parse_header_line, HeaderCollector, HeaderSink, Headers};
pub use options::{Callback, Method, OptionKey, Options, TransferInfo, TransferOption};
pub use request::Request;
pub use response::Response;
pub use transfer::{default_transport, Handle, PreparedTransfer, TransferStream, Transport};
pub use ureq_transport::UreqTransport;
