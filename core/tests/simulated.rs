//! Request/response behavior against a scripted transport.
//!
//! # Design
//! `Scripted` replays a fixed header block and body, or fails with a fixed
//! error, and records every `PreparedTransfer` it is asked to run. This
//! exercises the full `Request::exec` path without a network.

use std::sync::{Arc, Mutex};

use lite_request::{
    ErrorCode, PreparedTransfer, Request, TransferError, TransferOption, TransferStream, Transport,
};
use serde_json::json;

#[derive(Debug)]
enum Script {
    Succeed {
        headers: Vec<&'static str>,
        body: &'static [u8],
    },
    Fail(ErrorCode, &'static str),
}

#[derive(Debug)]
struct Scripted {
    script: Script,
    seen: Mutex<Vec<PreparedTransfer>>,
}

impl Scripted {
    fn succeed(headers: Vec<&'static str>, body: &'static [u8]) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Succeed { headers, body },
            seen: Mutex::new(Vec::new()),
        })
    }

    fn fail(code: ErrorCode, message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Fail(code, message),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<PreparedTransfer> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for Scripted {
    fn perform(&self, transfer: &PreparedTransfer, stream: &mut dyn TransferStream) -> Result<(), TransferError> {
        self.seen.lock().unwrap().push(transfer.clone());
        match &self.script {
            Script::Succeed { headers, body } => {
                for line in headers {
                    if !stream.header_line(line.as_bytes()) {
                        return Err(TransferError::new(ErrorCode::WriteError, "header aborted"));
                    }
                }
                if !body.is_empty() && !stream.body_chunk(body) {
                    return Err(TransferError::new(ErrorCode::WriteError, "write aborted"));
                }
                Ok(())
            }
            Script::Fail(code, message) => Err(TransferError::new(*code, *message)),
        }
    }
}

fn hello() -> Arc<Scripted> {
    Scripted::succeed(
        vec!["HTTP/1.1 200 OK\r\n", "Content-Type: text/plain\r\n", "\r\n"],
        b"hello",
    )
}

#[test]
fn successful_transfer_populates_body_and_headers() {
    let response = Request::get("http://example.test/", []).with_transport(hello()).exec();

    assert_eq!(response.text(), Some("hello"));
    assert_eq!(response.headers.len(), 1);
    assert_eq!(response.headers["content-type"], "text/plain");
    assert!(response.error.is_none());
    assert!(response.error_code.is_none());
    assert_eq!(response.status, Some(200));
}

#[test]
fn failed_transfer_sets_sentinel_body_and_error() {
    let transport = Scripted::fail(ErrorCode::CouldntResolveHost, "could not resolve host: nowhere.invalid");
    let response = Request::get("http://nowhere.invalid/", []).with_transport(transport).exec();

    assert!(response.body.is_none());
    assert_eq!(response.error_code, Some(ErrorCode::CouldntResolveHost));
    assert_eq!(response.error_code.map(ErrorCode::as_u32), Some(6));
    assert!(!response.error.unwrap_or_default().is_empty());
    assert!(response.headers.is_empty());
}

#[test]
fn json_on_failed_transfer_is_none() {
    let transport = Scripted::fail(ErrorCode::CouldntConnect, "connection refused");
    let response = Request::get("http://localhost:1/", []).with_transport(transport).exec();
    assert!(response.json().is_none());
}

#[test]
fn json_on_non_json_body_is_none() {
    let transport = Scripted::succeed(vec![], b"not json");
    let response = Request::get("http://example.test/", []).with_transport(transport).exec();
    assert_eq!(response.text(), Some("not json"));
    assert!(response.json().is_none());
}

#[test]
fn empty_body_is_success_not_failure() {
    let transport = Scripted::succeed(vec!["HTTP/1.1 204 No Content\r\n", "\r\n"], b"");
    let response = Request::delete("http://example.test/items/1", []).with_transport(transport).exec();
    assert_eq!(response.body, Some(Vec::new()));
    assert!(response.is_ok());
    assert_eq!(response.status, Some(204));
}

#[test]
fn exec_twice_runs_two_independent_transfers() {
    let transport = hello();
    let request = Request::get("http://example.test/", []).with_transport(transport.clone());

    let mut first = request.exec();
    let second = request.exec();

    assert_eq!(transport.seen().len(), 2);
    first.headers.insert("x-local".to_string(), "only here".to_string());
    assert!(!second.headers.contains_key("x-local"));
    assert_eq!(second.headers["content-type"], "text/plain");
}

#[test]
fn options_mutated_between_executions_apply_to_later_transfers() {
    let transport = hello();
    let mut request = Request::post("http://example.test/", []).with_transport(transport.clone());

    request.exec();
    request.options_mut().set(TransferOption::PostFields("second=1".to_string()));
    request.exec();

    let seen = transport.seen();
    assert_eq!(seen[0].body, None);
    assert_eq!(seen[1].body.as_deref(), Some(&b"second=1"[..]));
}

#[test]
fn configured_request_reaches_transport() {
    let transport = hello();
    Request::post("https://example.test/posts", [TransferOption::SslVerifyPeer(true)])
        .with_transport(transport.clone())
        .headers([("Content-Type", "application/json")])
        .postbody(&json!({"title": "Title", "userId": 1}))
        .exec();

    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].url, "https://example.test/posts");
    assert_eq!(seen[0].headers, vec!["Content-Type: application/json".to_string()]);
    assert_eq!(seen[0].body.as_deref(), Some(&br#"{"title":"Title","userId":1}"#[..]));
    assert!(seen[0].verify_peer);
}

#[test]
fn exec_raw_returns_body_without_response() {
    assert_eq!(
        Request::get("http://example.test/", []).with_transport(hello()).exec_raw().as_deref(),
        Some(&b"hello"[..])
    );

    let failing = Scripted::fail(ErrorCode::OperationTimedout, "timed out");
    assert!(Request::get("http://example.test/", []).with_transport(failing).exec_raw().is_none());
}

#[test]
fn custom_header_function_bypasses_header_capture() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let response = Request::get("http://example.test/", [])
        .with_transport(hello())
        .headerfunction(move |_, line| {
            sink.lock().unwrap().push(String::from_utf8_lossy(line).into_owned());
            line.len()
        })
        .exec();

    assert!(response.headers.is_empty());
    assert_eq!(response.text(), Some("hello"));
    assert_eq!(lines.lock().unwrap()[1], "Content-Type: text/plain\r\n");
}

#[test]
fn short_header_callback_aborts_transfer() {
    let response = Request::get("http://example.test/", [])
        .with_transport(hello())
        .headerfunction(|_, _| 0)
        .exec();

    assert!(response.body.is_none());
    assert_eq!(response.error_code, Some(ErrorCode::WriteError));
}

#[test]
fn write_function_receives_body() {
    let body = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&body);
    let response = Request::get("http://example.test/", [])
        .with_transport(hello())
        .writefunction(move |info, chunk| {
            assert_eq!(info.url, "http://example.test/");
            sink.lock().unwrap().extend_from_slice(chunk);
            chunk.len()
        })
        .exec();

    assert_eq!(body.lock().unwrap().as_slice(), b"hello");
    assert_eq!(response.body, Some(Vec::new()));
    assert_eq!(response.headers["content-type"], "text/plain");
}

#[test]
fn unencodable_form_body_fails_at_exec_without_network() {
    let transport = hello();
    let response = Request::post("http://example.test/", [])
        .with_transport(transport.clone())
        .postfields(&json!({"nested": {"not": "allowed"}}))
        .exec();

    assert!(transport.seen().is_empty());
    assert!(response.body.is_none());
    assert_eq!(response.error_code, Some(ErrorCode::BadFunctionArgument));
    assert!(response.error.is_some());
}

#[test]
fn set_body_after_rejection_lets_exec_proceed() {
    let transport = hello();
    let mut request = Request::post("http://example.test/", [])
        .with_transport(transport.clone())
        .postfields(&json!({"nested": {"not": "allowed"}}));
    request.options_mut().set(TransferOption::PostFields("a=1".to_string()));

    let response = request.exec();

    assert!(response.is_ok(), "{:?}", response.error);
    assert_eq!(response.text(), Some("hello"));
    assert_eq!(transport.seen()[0].body.as_deref(), Some(&b"a=1"[..]));

    let replaced = request
        .postfields(&json!({"nested": {"not": "allowed"}}))
        .option(TransferOption::PostFields("b=2".to_string()));
    assert!(replaced.exec().is_ok());
    assert_eq!(transport.seen()[1].body.as_deref(), Some(&b"b=2"[..]));
}

#[test]
fn non_utf8_body_is_returned_byte_for_byte() {
    const PNG_ISH: &[u8] = &[0x89, b'P', b'N', b'G', 0xff, 0x00];
    let transport = Scripted::succeed(vec!["HTTP/1.1 200 OK\r\n", "Content-Type: image/png\r\n", "\r\n"], PNG_ISH);
    let request = Request::get("http://example.test/logo.png", []).with_transport(transport);

    assert_eq!(request.exec_raw().as_deref(), Some(PNG_ISH));

    let response = request.exec();
    assert!(response.is_ok());
    assert_eq!(response.body.as_deref(), Some(PNG_ISH));
    assert!(response.text().is_none());
    assert_eq!(response.header("content-type"), Some("image/png"));
}
