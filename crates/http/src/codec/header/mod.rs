//! Encoding and decoding of the message head.
//!
//! - [`HeaderDecoder`]: request line and headers, plus the payload framing they imply
//! - [`HeaderEncoder`]: status line, headers and `Set-Cookie` lines of a response

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub(crate) use header_decoder::is_chunked;
pub use header_encoder::HeaderEncoder;
pub use header_encoder::SERVER_NAME;
