//! `Transport` backed by a blocking `ureq` agent.

use std::io::{self, Read};

use tracing::{debug, trace};
use ureq::http;
use ureq::tls::TlsConfig;

use crate::error::{ErrorCode, TransferError};
use crate::transfer::{PreparedTransfer, TransferStream, Transport};

const CHUNK_SIZE: usize = 16 * 1024;
const DEFAULT_MAX_REDIRS: u32 = 10;

/// Runs each transfer on a fresh agent, so nothing is pooled between calls.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(&self, transfer: &PreparedTransfer) -> ureq::Agent {
        let max_redirects = if transfer.follow_location {
            transfer.max_redirs.unwrap_or(DEFAULT_MAX_REDIRS)
        } else {
            0
        };
        let tls = TlsConfig::builder()
            .disable_verification(!transfer.verify_peer)
            .build();
        // Status codes are data here; only transport failures are errors.
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(max_redirects)
            .timeout_global(transfer.timeout)
            .timeout_connect(transfer.connect_timeout)
            .tls_config(tls)
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn perform(&self, transfer: &PreparedTransfer, stream: &mut dyn TransferStream) -> Result<(), TransferError> {
        let agent = self.agent(transfer);

        let method = http::Method::from_bytes(transfer.method.as_bytes()).map_err(|e| {
            TransferError::new(
                ErrorCode::BadFunctionArgument,
                format!("invalid method {:?}: {e}", transfer.method),
            )
        })?;
        let mut builder = http::Request::builder().method(method).uri(transfer.url.as_str());
        for (name, value) in request_headers(transfer) {
            builder = builder.header(name, value);
        }

        let sent = match &transfer.body {
            Some(body) => builder.body(body.clone()).map(|request| agent.run(request)),
            None => builder.body(()).map(|request| agent.run(request)),
        };
        let mut response = sent.map_err(map_request_error)?.map_err(map_error)?;

        let status = response.status();
        // With a zero limit the agent hands back the redirect instead of failing.
        let unfollowed = status.is_redirection() && response.headers().contains_key(http::header::LOCATION);
        if transfer.follow_location && unfollowed {
            return Err(TransferError::new(
                ErrorCode::TooManyRedirects,
                format!("redirect limit of {} reached", transfer.max_redirs.unwrap_or(DEFAULT_MAX_REDIRS)),
            ));
        }
        let status_line = format!(
            "{:?} {} {}\r\n",
            response.version(),
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );
        if !stream.header_line(status_line.as_bytes()) {
            return Err(aborted());
        }
        for (name, value) in response.headers() {
            let line = format!("{}: {}\r\n", name.as_str(), String::from_utf8_lossy(value.as_bytes()));
            if !stream.header_line(line.as_bytes()) {
                return Err(aborted());
            }
        }
        if !stream.header_line(b"\r\n") {
            return Err(aborted());
        }

        let mut reader = response.body_mut().as_reader();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).map_err(map_io_error)?;
            if n == 0 {
                break;
            }
            trace!(bytes = n, "body chunk");
            if !stream.body_chunk(&buf[..n]) {
                return Err(aborted());
            }
        }
        Ok(())
    }
}

/// Name/value pairs to send. A `UserAgent` option is only added when no
/// header line already names `User-Agent`.
fn request_headers(transfer: &PreparedTransfer) -> Vec<(&str, &str)> {
    let mut headers = Vec::with_capacity(transfer.headers.len() + 1);
    for line in &transfer.headers {
        match line.split_once(':') {
            Some((name, value)) => headers.push((name.trim(), value.trim())),
            None => debug!(line = %line, "dropping request header line without a colon"),
        }
    }
    if let Some(user_agent) = &transfer.user_agent {
        if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("user-agent")) {
            headers.push(("user-agent", user_agent.as_str()));
        }
    }
    headers
}

fn aborted() -> TransferError {
    TransferError::new(ErrorCode::WriteError, "transfer aborted by callback")
}

fn map_request_error(err: http::Error) -> TransferError {
    let code = if err.is::<http::uri::InvalidUri>() {
        ErrorCode::UrlMalformat
    } else {
        ErrorCode::BadFunctionArgument
    };
    TransferError::new(code, err.to_string())
}

fn map_error(err: ureq::Error) -> TransferError {
    let code = match &err {
        ureq::Error::HostNotFound => ErrorCode::CouldntResolveHost,
        ureq::Error::ConnectionFailed => ErrorCode::CouldntConnect,
        ureq::Error::Timeout(_) => ErrorCode::OperationTimedout,
        ureq::Error::TooManyRedirects => ErrorCode::TooManyRedirects,
        ureq::Error::BadUri(_) => ErrorCode::UrlMalformat,
        ureq::Error::Tls(_) => ErrorCode::SslConnectError,
        ureq::Error::Http(_) => ErrorCode::BadFunctionArgument,
        ureq::Error::Io(io) => io_code(io),
        _ => ErrorCode::RecvError,
    };
    TransferError::new(code, err.to_string())
}

fn map_io_error(err: io::Error) -> TransferError {
    TransferError::new(io_code(&err), err.to_string())
}

fn io_code(err: &io::Error) -> ErrorCode {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ErrorCode::CouldntConnect,
        io::ErrorKind::TimedOut => ErrorCode::OperationTimedout,
        _ => ErrorCode::RecvError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Method, Options, TransferOption};

    fn prepared(options: impl IntoIterator<Item = TransferOption>) -> PreparedTransfer {
        PreparedTransfer::new("http://localhost/", &Options::for_method(Method::Get, options))
    }

    #[test]
    fn user_agent_option_is_sent_when_no_header_line_names_one() {
        let transfer = prepared([
            TransferOption::UserAgent("lite/1".to_string()),
            TransferOption::HttpHeader(vec!["Accept: */*".to_string(), "broken".to_string()]),
        ]);
        assert_eq!(request_headers(&transfer), vec![("Accept", "*/*"), ("user-agent", "lite/1")]);
    }

    #[test]
    fn user_agent_header_line_wins_over_option() {
        let transfer = prepared([
            TransferOption::UserAgent("lite/1".to_string()),
            TransferOption::HttpHeader(vec!["USER-AGENT: custom/2".to_string()]),
        ]);
        assert_eq!(request_headers(&transfer), vec![("USER-AGENT", "custom/2")]);
    }

    #[test]
    fn io_errors_map_to_connect_and_timeout_codes() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(io_code(&refused), ErrorCode::CouldntConnect);
        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(map_io_error(timed_out).code, ErrorCode::OperationTimedout);
        let other = io::Error::other("boom");
        assert_eq!(io_code(&other), ErrorCode::RecvError);
    }

    #[test]
    fn host_not_found_maps_to_resolve_code() {
        let err = map_error(ureq::Error::HostNotFound);
        assert_eq!(err.code, ErrorCode::CouldntResolveHost);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn unparseable_url_is_reported_as_malformed() {
        let err = http::Request::builder().uri("http://exa mple.com/").body(()).unwrap_err();
        assert_eq!(map_request_error(err).code, ErrorCode::UrlMalformat);
    }
}
