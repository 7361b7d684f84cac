//! Connection lifecycle.
//!
//! [`HttpConnection`] runs the request cycles of one client connection in sequence:
//! read and parse a request, answer `100 Continue` when asked to, call the handler,
//! write the response and decide whether the connection can be reused.

mod http_connection;

pub use http_connection::DEFAULT_READ_CHUNK;
pub use http_connection::HttpConnection;
