use std::error::Error;
use std::io;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("malformed {content_type} body: {reason}")]
    MalformedForm { content_type: String, reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn malformed_form<C: ToString, S: ToString>(content_type: C, reason: S) -> Self {
        Self::MalformedForm { content_type: content_type.to_string(), reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Whether the framing of the connection is still intact after this error.
    ///
    /// A malformed form body was fully read off the wire, so the next request can
    /// still be parsed. Every other variant leaves the byte stream in an unknown state.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedForm { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Returned by the write operations of a frozen container.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerError {
    #[error("container is immutable, it has already been parsed")]
    Immutable,
}

/// An HTTP error condition: the status to answer with and a plain text message.
///
/// This is what a missing mandatory field, an unmatched route or an unsupported verb
/// turn into. The dispatcher writes `message` as the response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {message}")]
pub struct StatusError {
    status: StatusCode,
    message: String,
}

impl StatusError {
    /// Creates an error whose message is the canonical text of `status`, e.g. `404 Not Found`.
    pub fn new(status: StatusCode) -> Self {
        Self { status, message: status.to_string() }
    }

    pub fn with_message<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::with_message(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Short-circuits a handler or a middleware hook.
///
/// Handlers return `Result<(), Halt>`; `Ok(())` lets the pipeline continue normally.
#[derive(Error, Debug)]
pub enum Halt {
    /// The response already carries the redirect status and `Location` header.
    #[error("redirect with status {0}")]
    Redirect(StatusCode),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("internal error: {0}")]
    Internal(Box<dyn Error + Send + Sync>),
}

impl Halt {
    pub fn internal<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Internal(e.into())
    }
}

pub type HandlerResult = Result<(), Halt>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_defaults_to_canonical_text() {
        let e = StatusError::not_found();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
        assert_eq!(e.message(), "404 Not Found");

        let e = StatusError::bad_request("Must provide parameter 'name'.");
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.message(), "Must provide parameter 'name'.");
    }

    #[test]
    fn status_error_converts_into_halt() {
        fn lookup() -> HandlerResult {
            let verb: Result<(), StatusError> = Err(StatusError::method_not_allowed());
            verb?;
            Ok(())
        }

        match lookup() {
            Err(Halt::Status(e)) => assert_eq!(e.status(), StatusCode::METHOD_NOT_ALLOWED),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_form_errors_are_recoverable() {
        assert!(ParseError::malformed_form("application/json", "eof").is_recoverable());
        assert!(!ParseError::InvalidUri.is_recoverable());
        assert!(!ParseError::invalid_body("bad chunk").is_recoverable());
    }
}
