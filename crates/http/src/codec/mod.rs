//! HTTP/1.x wire codec.
//!
//! - [`RequestDecoder`] turns bytes into a request head followed by payload items,
//!   with httparse for the head and a length or chunked decoder for the payload
//! - [`ResponseEncoder`] turns a finished response into bytes, head first
//!
//! Both implement the `tokio_util::codec` traits, so they plug into `FramedRead`
//! and `FramedWrite` or can be driven by hand over a `BytesMut`.
//!
//! # Example
//!
//! ```
//! use albatross_http::codec::{RequestDecoder, ResponseEncoder};
//! use albatross_http::protocol::{Message, Response};
//! use bytes::BytesMut;
//! use http::Version;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut decoder = RequestDecoder::new();
//! let mut request = BytesMut::from("GET /hello HTTP/1.1\r\n\r\n");
//! let message = decoder.decode(&mut request).unwrap().unwrap();
//! assert!(matches!(message, Message::Header(_)));
//!
//! let mut response = Response::new();
//! response.write("Hello World");
//! let mut wire = BytesMut::new();
//! ResponseEncoder::new().encode((Version::HTTP_11, &response), &mut wire).unwrap();
//! assert!(wire.ends_with(b"Hello World"));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use header::SERVER_NAME;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
