//! The request line and header block of a request, as read off the wire.

use http::{Method, Version};

use crate::protocol::RequestParser;

/// Request line and headers in arrival order.
///
/// The decoder produces this before any payload; it is replayed into a
/// [`RequestParser`] as `on_message_begin`, `on_url` and `on_header` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method: Method,
    target: String,
    version: Version,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    pub fn new(method: Method, target: String, version: Version, headers: Vec<(String, String)>) -> Self {
        Self { method, target, version, headers }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request target, e.g. `/hello?name=mouse`.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Feeds the request line and every header line into `parser`, in order.
    pub fn replay(self, parser: &mut RequestParser) -> Result<(), crate::protocol::ParseError> {
        parser.on_message_begin(self.method, self.version);
        parser.on_url(&self.target)?;
        for (name, value) in &self.headers {
            parser.on_header(name, value);
        }
        Ok(())
    }
}
