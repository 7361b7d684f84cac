//! HTTP/1.x protocol core: parsing, response building and the connection cycle.
//!
//! This crate turns a byte stream into [`protocol::Request`]s, lets a
//! [`handler::Handler`] fill a [`protocol::Response`], and writes that response back,
//! one request at a time per connection. Routing and middleware live one level up, in
//! `albatross-web`.
//!
//! # Example
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use albatross_http::connection::HttpConnection;
//! use albatross_http::handler::make_handler;
//! use albatross_http::protocol::{Request, Response};
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(|req: &mut Request, res: &mut Response| {
//!         info!(path = %req.path(), "request received");
//!         res.write("Hello World!\r\n");
//!         async { Ok::<(), Infallible>(()) }
//!     }));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer).process(handler).await {
//!                 error!(cause = %e, "connection shutdown with error");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: containers, the request parser state machine, forms, cookies,
//!   the response builder and the error types
//! - [`codec`]: `tokio_util` decoder and encoder for the wire format
//! - [`connection`]: the per connection request cycle
//! - [`handler`]: the trait a connection calls for every parsed request
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No TLS support
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64
//! - Request bodies are buffered in memory before the handler runs

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
